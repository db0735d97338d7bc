//! Per-cycle device connection lifecycle.
//!
//! ```text
//! Disconnected -> Connecting -> WaitingForReboot -> Ready -> Executing
//!              -> Disconnecting -> Disconnected
//! ```
//! `Failed` is entered when the link cannot be established; it is absorbing
//! for the current cycle only. The link is closed on every exit path out of
//! `Executing` or `Failed`. The reconnect pause is left to the caller
//! ([`ConnectionSupervisor::reconnect_pause`]) so a finished cycle can be
//! recorded before anything else can cancel it.

use std::fmt;

use lockprobe_explore::oracle::SignatureSet;
use lockprobe_explore::{CommandSequence, ExecutionResult, Response};
use lockprobe_transport::{Transport, TransportError};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::{SupervisorConfig, WriteFailurePolicy};
use crate::protocol::{frame_command, LockState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    WaitingForReboot,
    Ready,
    Executing,
    Disconnecting,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("cycle {cycle}: connect to {device:?} failed: {source}")]
    Connect {
        cycle: u64,
        device: String,
        #[source]
        source: TransportError,
    },
}

/// Everything a completed cycle produced.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub result: ExecutionResult,
    /// Whether the boot banner showed up before execution began.
    pub rebooted: bool,
    /// Protocol state after the last response.
    pub lock_state: LockState,
    /// Index of the opcode whose failure stopped the sequence (abort policy).
    pub aborted_at: Option<usize>,
}

/// Owns the connection state machine for one device.
pub struct ConnectionSupervisor {
    config: SupervisorConfig,
    boot_banners: SignatureSet,
    crash_banners: SignatureSet,
    state: ConnectionState,
}

impl ConnectionSupervisor {
    pub fn new(
        config: SupervisorConfig,
        boot_banners: SignatureSet,
        crash_banners: SignatureSet,
    ) -> Self {
        Self {
            config,
            boot_banners,
            crash_banners,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    fn transition(&mut self, next: ConnectionState) {
        debug!(from = %self.state, to = %next, "connection state");
        self.state = next;
    }

    /// One full lifecycle: connect, wait for the boot banner, execute
    /// `sequence`, disconnect. Returns as soon as the link is closed.
    pub async fn run_cycle<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        cycle: u64,
        sequence: &CommandSequence,
    ) -> Result<CycleOutcome, CycleError> {
        self.transition(ConnectionState::Connecting);
        if let Err(source) = transport.connect(&self.config.device_name).await {
            self.transition(ConnectionState::Failed);
            self.force_disconnect(transport).await;
            return Err(CycleError::Connect {
                cycle,
                device: self.config.device_name.clone(),
                source,
            });
        }

        transport.init_logs();
        sleep(self.config.post_connect_delay()).await;

        self.transition(ConnectionState::WaitingForReboot);
        let rebooted = self.wait_for_reboot(transport).await;
        debug!(cycle, rebooted, "reboot wait finished");

        self.transition(ConnectionState::Ready);
        self.transition(ConnectionState::Executing);
        let (result, lock_state, aborted_at) = self.execute(transport, sequence).await;

        self.force_disconnect(transport).await;
        Ok(CycleOutcome {
            result,
            rebooted,
            lock_state,
            aborted_at,
        })
    }

    /// Poll the log stream at a fixed interval until a boot banner shows up
    /// or the deadline passes. A timeout is a valid outcome, not an error.
    pub async fn wait_for_reboot<T: Transport + ?Sized>(&mut self, transport: &mut T) -> bool {
        let deadline = Instant::now() + self.config.reboot_deadline();
        loop {
            let lines = transport.read_new_logs();
            if self.boot_banners.matches_any(&lines) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(self.config.reboot_poll_interval()).await;
        }
    }

    /// Send `sequence` one opcode at a time. Log lines are attributed to the
    /// opcode whose settle window produced them.
    pub async fn execute<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        sequence: &CommandSequence,
    ) -> (ExecutionResult, LockState, Option<usize>) {
        let mut result = ExecutionResult {
            responses: Vec::with_capacity(sequence.len()),
            log_lines: Vec::new(),
        };
        let mut lock_state = LockState::Unauthenticated;
        let mut aborted_at = None;

        for (index, &opcode) in sequence.as_bytes().iter().enumerate() {
            let command = frame_command(opcode, &self.config.passcode);
            // Drop anything that arrived before this opcode.
            transport.read_new_logs();

            let written = transport.write_command(&command).await;
            sleep(self.config.settle_delay()).await;
            let mut lines = transport.read_new_logs();
            let crashed = self.crash_banners.matches_any(&lines);

            let response = match written {
                Ok(bytes) => Response::Success(bytes),
                Err(err) => {
                    warn!(opcode, index, error = %err, "write failed");
                    lines.push(format!("Exception: {err}"));
                    Response::Failure(err.to_string())
                }
            };
            lock_state = lock_state.observe(opcode, &response, crashed);
            let failed = response.is_failure();

            result.responses.push(response);
            result.log_lines.extend(lines);

            if failed && self.config.write_failure_policy == WriteFailurePolicy::Abort {
                aborted_at = Some(index);
                break;
            }
        }

        (result, lock_state, aborted_at)
    }

    /// Disconnect regardless of the current state.
    pub async fn force_disconnect<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        self.transition(ConnectionState::Disconnecting);
        transport.disconnect().await;
        self.transition(ConnectionState::Disconnected);
    }

    /// Let the link settle before the next connect attempt.
    pub async fn reconnect_pause(&self) {
        sleep(self.config.reconnect_delay()).await;
    }
}
