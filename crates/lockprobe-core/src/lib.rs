//! Campaign orchestration: device connection lifecycle, sessions, findings
//! and the fuzzing loop that ties the explore engine to a transport.

pub mod campaign;
pub mod config;
pub mod findings;
pub mod protocol;
pub mod session;
pub mod summary;
pub mod supervisor;
