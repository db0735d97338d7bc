//! In-memory model of the lock firmware.
//!
//! Tracks authentication and bolt state, answers with the firmware's status
//! codes and emits ESP32-style diagnostic lines. Opcodes in the crash set
//! panic the "firmware": a Guru Meditation banner is logged, the link drops
//! and the next connect observes a boot banner.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::debug;

use crate::transport::{LogBuffer, Transport, TransportError};

const STATUS_OK: u8 = 0x00;
const STATUS_UNAUTHENTICATED: u8 = 0x01;
const STATUS_BAD_PASSCODE: u8 = 0x02;
const STATUS_UNKNOWN_OPCODE: u8 = 0x03;
const STATUS_BAD_LENGTH: u8 = 0x04;

/// Configuration for [`SimulatedLock`].
#[derive(Debug, Clone)]
pub struct SimulatedLockConfig {
    pub device_name: String,
    pub passcode: [u8; 6],
    /// Opcodes that crash and reboot the firmware.
    pub crash_opcodes: BTreeSet<u8>,
    /// Opcode of the undocumented diagnostic command.
    pub debug_opcode: u8,
}

impl Default for SimulatedLockConfig {
    fn default() -> Self {
        Self {
            device_name: "Smart Lock [Group 11]".to_string(),
            passcode: [0x01, 0x02, 0x03, 0x04, 0x05, 0x06],
            crash_opcodes: [0x13, 0xEE].into_iter().collect(),
            debug_opcode: 0xAA,
        }
    }
}

/// Behavioral lock simulator implementing [`Transport`].
#[derive(Debug, Clone)]
pub struct SimulatedLock {
    config: SimulatedLockConfig,
    connected: bool,
    authenticated: bool,
    locked: bool,
    /// Set at power-on and after a crash; the boot banner is emitted once a
    /// central is connected and reads the log stream.
    booting: bool,
    boots: u64,
    logs: LogBuffer,
}

impl SimulatedLock {
    pub fn new(config: SimulatedLockConfig) -> Self {
        Self {
            config,
            connected: false,
            authenticated: false,
            locked: true,
            booting: true,
            boots: 0,
            logs: LogBuffer::new(),
        }
    }

    /// Number of times the firmware has booted (initial power-on included).
    pub fn boots(&self) -> u64 {
        self.boots
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn boot_if_pending(&mut self) {
        if self.connected && self.booting {
            self.boot();
        }
    }

    fn boot(&mut self) {
        self.boots += 1;
        debug!(boots = self.boots, "simulated firmware booting");
        self.booting = false;
        self.authenticated = false;
        self.locked = true;
        self.logs.push("ESP-ROM:esp32s3-20210327");
        self.logs
            .push("rst:0xc (RTC_SW_CPU_RST),boot:0x8 (SPI_FAST_FLASH_BOOT)");
        self.logs.push("I (312) LOCK: firmware ready, bolt engaged");
    }

    fn crash(&mut self, opcode: u8) -> TransportError {
        debug!(opcode, "simulated firmware crash");
        self.logs.push(format!(
            "Guru Meditation Error: Core  0 panic'ed (LoadProhibited) handling opcode {opcode:#04x}"
        ));
        self.logs.push("Rebooting...");
        self.connected = false;
        self.authenticated = false;
        self.booting = true;
        TransportError::Notify("link lost while awaiting notification".to_string())
    }

    fn handle(&mut self, command: &[u8]) -> Result<Vec<u8>, TransportError> {
        let Some((&opcode, payload)) = command.split_first() else {
            self.logs.push("W (0) LOCK: empty command");
            return Ok(vec![STATUS_BAD_LENGTH]);
        };

        if self.config.crash_opcodes.contains(&opcode) {
            return Err(self.crash(opcode));
        }

        let status = match opcode {
            0x00 => {
                if payload == self.config.passcode {
                    self.authenticated = true;
                    self.logs.push("I (0) LOCK: client authenticated");
                    STATUS_OK
                } else if payload.len() != self.config.passcode.len() {
                    self.logs.push("W (0) LOCK: passcode has wrong length");
                    STATUS_BAD_LENGTH
                } else {
                    self.logs.push("W (0) LOCK: passcode rejected");
                    STATUS_BAD_PASSCODE
                }
            }
            0x01 | 0x02 if !self.authenticated => {
                self.logs.push("W (0) LOCK: command refused, not authenticated");
                STATUS_UNAUTHENTICATED
            }
            0x01 => {
                self.locked = false;
                self.logs.push("I (0) LOCK: bolt retracted");
                STATUS_OK
            }
            0x02 => {
                self.locked = true;
                self.logs.push("I (0) LOCK: bolt engaged");
                STATUS_OK
            }
            op if op == self.config.debug_opcode => {
                self.logs.push("D (0) LOCK: diagnostic dump requested");
                if self.authenticated {
                    self.logs.push("D (0) LOCK: heap free 31244 bytes");
                }
                STATUS_OK
            }
            op => {
                self.logs.push(format!("W (0) LOCK: unknown opcode {op:#04x}"));
                STATUS_UNKNOWN_OPCODE
            }
        };
        Ok(vec![status])
    }
}

impl Default for SimulatedLock {
    fn default() -> Self {
        Self::new(SimulatedLockConfig::default())
    }
}

#[async_trait]
impl Transport for SimulatedLock {
    async fn connect(&mut self, device_name: &str) -> Result<(), TransportError> {
        if device_name != self.config.device_name {
            return Err(TransportError::DeviceNotFound(device_name.to_string()));
        }
        self.connected = true;
        self.authenticated = false;
        self.logs.push("I (0) BLE: central connected");
        Ok(())
    }

    async fn disconnect(&mut self) {
        if self.connected {
            self.logs.push("I (0) BLE: central disconnected");
        }
        self.connected = false;
        self.authenticated = false;
    }

    async fn write_command(&mut self, command: &[u8]) -> Result<Vec<u8>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.boot_if_pending();
        self.handle(command)
    }

    fn init_logs(&mut self) {
        self.logs.reset();
    }

    fn read_logs(&mut self) -> Vec<String> {
        self.boot_if_pending();
        self.logs.all()
    }

    fn read_new_logs(&mut self) -> Vec<String> {
        self.boot_if_pending();
        self.logs.take_new()
    }
}
