use std::collections::HashSet;

use crate::corpus::queue::Queue;
use crate::sequence::CommandSequence;

/// Exact-match set of sequences already sent to the device.
///
/// Consulted before execution; a hit means the candidate is skipped without
/// touching the transport. Grows monotonically for the session.
#[derive(Debug, Clone, Default)]
pub struct DuplicateFilter {
    tested: HashSet<CommandSequence>,
}

impl DuplicateFilter {
    pub fn new() -> Self {
        Self {
            tested: HashSet::new(),
        }
    }

    pub fn from_sequences(sequences: impl IntoIterator<Item = CommandSequence>) -> Self {
        Self {
            tested: sequences.into_iter().collect(),
        }
    }

    /// Tested-set rebuilt from every sequence held in `queue`.
    pub fn from_queue(queue: &Queue) -> Self {
        Self::from_sequences(queue.entries().iter().map(|e| e.sequence.clone()))
    }

    pub fn contains(&self, sequence: &CommandSequence) -> bool {
        self.tested.contains(sequence)
    }

    /// Record `sequence` as tested. Returns false if it already was.
    pub fn insert(&mut self, sequence: CommandSequence) -> bool {
        self.tested.insert(sequence)
    }

    pub fn len(&self) -> usize {
        self.tested.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tested.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSequence> {
        self.tested.iter()
    }
}
