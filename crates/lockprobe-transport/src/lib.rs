//! Link-layer contract between the fuzzing engine and a lock device.
//!
//! The engine never talks to a radio directly. It drives a [`Transport`],
//! which owns connect/write/notify semantics and the device's diagnostic log
//! stream. Two in-memory implementations ship here:
//! - [`mock::ScriptedTransport`] for tests (scripted replies, timed log lines,
//!   recorded calls)
//! - [`sim::SimulatedLock`] a behavioral model of the lock firmware, used by
//!   the binary when no radio is attached

pub mod mock;
pub mod sim;
pub mod transport;

pub use transport::{LogBuffer, Transport, TransportError};
