//! Lock command protocol as seen from the client side.
//!
//! Opcode 0x00 authenticates and must carry the 6-byte passcode in-band,
//! 0x01 opens, 0x02 closes. Every other byte value is unclassified, which is
//! exactly the surface the fuzzer probes. The first byte of a notification
//! is a status code.

use std::fmt;

use lockprobe_explore::Response;
use serde::{Deserialize, Serialize};

pub const AUTH_OPCODE: u8 = 0x00;
pub const OPEN_OPCODE: u8 = 0x01;
pub const CLOSE_OPCODE: u8 = 0x02;

pub const PASSCODE_LEN: usize = 6;
pub const DEFAULT_PASSCODE: [u8; PASSCODE_LEN] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
pub const DEFAULT_DEVICE_NAME: &str = "Smart Lock [Group 11]";

pub const STATUS_OK: u8 = 0x00;
pub const STATUS_UNAUTHENTICATED: u8 = 0x01;

/// Bytes written on the wire for `opcode`. Authenticate carries the passcode.
pub fn frame_command(opcode: u8, passcode: &[u8; PASSCODE_LEN]) -> Vec<u8> {
    let mut command = Vec::with_capacity(1 + PASSCODE_LEN);
    command.push(opcode);
    if opcode == AUTH_OPCODE {
        command.extend_from_slice(passcode);
    }
    command
}

/// Client-side view of the lock's protocol state, updated per response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockState {
    Unauthenticated,
    Authenticated,
    Locked,
    Unlocked,
    Error,
    Crashed,
}

impl LockState {
    /// Next state after `opcode` produced `response`; `crashed` is true when
    /// the opcode's log lines carried a crash banner.
    pub fn observe(self, opcode: u8, response: &Response, crashed: bool) -> LockState {
        if crashed {
            return LockState::Crashed;
        }
        let code = match response {
            Response::Success(bytes) => match bytes.first() {
                Some(&code) => code,
                None => return LockState::Error,
            },
            Response::Failure(_) => return LockState::Error,
        };

        match (opcode, code) {
            (AUTH_OPCODE, STATUS_OK) => LockState::Authenticated,
            (OPEN_OPCODE, STATUS_OK) => LockState::Unlocked,
            (CLOSE_OPCODE, STATUS_OK) => LockState::Locked,
            (_, STATUS_UNAUTHENTICATED) => LockState::Unauthenticated,
            (_, 0x02..=0x04) => LockState::Error,
            _ => self,
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
