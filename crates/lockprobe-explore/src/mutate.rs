//! Candidate generation by randomized byte-level edits.
//!
//! A mutation copies the seed and applies 1-4 elementary edits drawn with
//! replacement from [`MutationOp::ALL`]. The result is trimmed to
//! [`MAX_SEQUENCE_LEN`] and is never empty.

use std::collections::VecDeque;

use rand::Rng;

use crate::sequence::{CommandSequence, MAX_SEQUENCE_LEN};

/// Maximum number of edits applied per mutation.
pub const MAX_EDITS: usize = 4;

/// Elementary byte edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationOp {
    /// Flip one random bit of one random byte.
    BitFlip,
    /// Insert a random byte at a random position.
    InsertByte,
    /// Remove a random byte. Skipped at length 1.
    DeleteByte,
    /// Overwrite a random byte with a random value.
    ReplaceByte,
    /// Copy an existing byte into the adjacent position.
    DuplicateByte,
    /// Push a random byte onto the end.
    AppendByte,
}

impl MutationOp {
    pub const ALL: [MutationOp; 6] = [
        MutationOp::BitFlip,
        MutationOp::InsertByte,
        MutationOp::DeleteByte,
        MutationOp::ReplaceByte,
        MutationOp::DuplicateByte,
        MutationOp::AppendByte,
    ];

    /// Apply this edit in place.
    pub fn apply<R: Rng + ?Sized>(self, bytes: &mut Vec<u8>, rng: &mut R) {
        match self {
            MutationOp::BitFlip => {
                if bytes.is_empty() {
                    return;
                }
                let idx = rng.gen_range(0..bytes.len());
                let bit = rng.gen_range(0..8u8);
                bytes[idx] ^= 1 << bit;
            }
            MutationOp::InsertByte => {
                let idx = rng.gen_range(0..=bytes.len());
                bytes.insert(idx, rng.gen());
            }
            MutationOp::DeleteByte => {
                if bytes.len() > 1 {
                    let idx = rng.gen_range(0..bytes.len());
                    bytes.remove(idx);
                }
            }
            MutationOp::ReplaceByte => {
                if bytes.is_empty() {
                    return;
                }
                let idx = rng.gen_range(0..bytes.len());
                bytes[idx] = rng.gen();
            }
            MutationOp::DuplicateByte => {
                if bytes.is_empty() {
                    return;
                }
                let idx = rng.gen_range(0..bytes.len());
                bytes.insert(idx + 1, bytes[idx]);
            }
            MutationOp::AppendByte => bytes.push(rng.gen()),
        }
    }
}

/// Produces a new candidate from a seed.
pub trait Mutator {
    fn mutate(&mut self, seed: &CommandSequence) -> CommandSequence;

    /// Name of this mutator (for tracing).
    fn name(&self) -> &str;
}

/// Default mutator: 1..=[`MAX_EDITS`] random edits per call.
pub struct HavocMutator<R: Rng> {
    rng: R,
    last_ops: Vec<MutationOp>,
}

impl<R: Rng> HavocMutator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            last_ops: Vec::with_capacity(MAX_EDITS),
        }
    }

    /// Edits applied by the most recent `mutate` call, in order.
    pub fn last_ops(&self) -> &[MutationOp] {
        &self.last_ops
    }
}

impl<R: Rng> Mutator for HavocMutator<R> {
    fn mutate(&mut self, seed: &CommandSequence) -> CommandSequence {
        let mut bytes = seed.to_vec();
        self.last_ops.clear();

        let edits = self.rng.gen_range(1..=MAX_EDITS);
        for _ in 0..edits {
            let op = MutationOp::ALL[self.rng.gen_range(0..MutationOp::ALL.len())];
            op.apply(&mut bytes, &mut self.rng);
            self.last_ops.push(op);
        }

        bytes.truncate(MAX_SEQUENCE_LEN);
        if bytes.is_empty() {
            bytes.push(self.rng.gen());
        }
        tracing::trace!(ops = ?self.last_ops, len = bytes.len(), "mutated seed");
        CommandSequence::truncated(bytes).unwrap_or_else(|| seed.clone())
    }

    fn name(&self) -> &str {
        "havoc"
    }
}

/// Scripted mutator for testing: pops predefined candidates in order, then
/// returns the seed unchanged.
pub struct ScriptedMutator {
    script: VecDeque<CommandSequence>,
}

impl ScriptedMutator {
    pub fn new(script: impl IntoIterator<Item = CommandSequence>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Mutator for ScriptedMutator {
    fn mutate(&mut self, seed: &CommandSequence) -> CommandSequence {
        self.script.pop_front().unwrap_or_else(|| seed.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
