//! Black-box fuzzing engine for the lock command protocol.
//!
//! Pure engine pieces with no device I/O: candidate generation
//! ([`mutate`]), seed scheduling ([`schedule`]), the weighted corpus and
//! duplicate filter ([`corpus`]) and the novelty oracle ([`oracle`]).

pub mod corpus;
pub mod execution;
pub mod mutate;
pub mod oracle;
pub mod rng;
pub mod schedule;
pub mod sequence;

pub use execution::{ExecutionResult, Response};
pub use sequence::{CommandSequence, SequenceError, MAX_SEQUENCE_LEN};
