use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::sequence::CommandSequence;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("failed to read queue file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write queue file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed resume file {path}: {reason}")]
    MalformedResumeFile { path: PathBuf, reason: String },

    #[error("queue serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A seed in the corpus together with its selection weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub sequence: CommandSequence,
    pub weight: f64,
}

/// Ordered, weighted corpus of candidate sequences.
///
/// Weights drive selection probability and decay once per scheduling round.
/// Entries are never evicted.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    entries: Vec<QueueEntry>,
}

impl Queue {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Queue holding every seed at the same weight.
    pub fn uniform(seeds: impl IntoIterator<Item = CommandSequence>, weight: f64) -> Self {
        let mut queue = Self::new();
        for seed in seeds {
            queue.append(seed, weight);
        }
        queue
    }

    /// Append an entry. Negative or NaN weights are stored as 0.0.
    pub fn append(&mut self, sequence: CommandSequence, weight: f64) {
        self.entries.push(QueueEntry {
            sequence,
            weight: sanitize_weight(weight),
        });
    }

    /// Multiply every weight by `factor`.
    pub fn decay_all(&mut self, factor: f64) {
        let factor = sanitize_weight(factor);
        for entry in &mut self.entries {
            entry.weight *= factor;
        }
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|e| e.weight).sum()
    }

    /// Up to `n` entries ranked by descending weight; ties keep insertion order.
    pub fn top(&self, n: usize) -> Vec<&QueueEntry> {
        let mut ranked: Vec<&QueueEntry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        ranked.truncate(n);
        ranked
    }

    /// Write every (sequence, weight) record as JSON.
    ///
    /// Writes a sibling temp file first and renames it into place, so an
    /// interrupted write never leaves a truncated queue behind.
    pub fn persist(&self, path: &Path) -> Result<(), QueueError> {
        let json = serde_json::to_vec_pretty(&self.entries)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| QueueError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| QueueError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a persisted queue, validating every record.
    pub fn load(path: &Path) -> Result<Self, QueueError> {
        let raw = fs::read_to_string(path).map_err(|source| QueueError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let malformed = |reason: String| QueueError::MalformedResumeFile {
            path: path.to_path_buf(),
            reason,
        };

        let entries: Vec<QueueEntry> =
            serde_json::from_str(&raw).map_err(|e| malformed(e.to_string()))?;
        if entries.is_empty() {
            return Err(malformed("queue holds no entries".to_string()));
        }
        if let Some((i, entry)) = entries
            .iter()
            .enumerate()
            .find(|(_, e)| !e.weight.is_finite() || e.weight < 0.0)
        {
            return Err(malformed(format!(
                "entry {i} has invalid weight {}",
                entry.weight
            )));
        }

        Ok(Self { entries })
    }
}

fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_nan() {
        0.0
    } else {
        weight.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(bytes: &[u8]) -> CommandSequence {
        CommandSequence::new(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_decay_is_multiplicative() {
        let mut queue = Queue::new();
        queue.append(seq(&[1]), 3.0);
        queue.decay_all(0.9);
        assert_eq!(queue.entries()[0].weight, 2.7);
    }

    #[test]
    fn test_decay_compounds() {
        let mut queue = Queue::new();
        queue.append(seq(&[1]), 3.0);
        queue.decay_all(0.9);
        queue.decay_all(0.9);
        assert!((queue.entries()[0].weight - 2.43).abs() < 1e-12);
    }

    #[test]
    fn test_weights_never_negative() {
        let mut queue = Queue::new();
        queue.append(seq(&[1]), -4.0);
        queue.append(seq(&[2]), f64::NAN);
        queue.append(seq(&[3]), 1.0);
        queue.decay_all(-0.5);
        assert!(queue.entries().iter().all(|e| e.weight >= 0.0));
    }

    #[test]
    fn test_top_ranks_by_weight_then_insertion() {
        let mut queue = Queue::new();
        queue.append(seq(&[1]), 1.0);
        queue.append(seq(&[2]), 5.0);
        queue.append(seq(&[3]), 1.0);
        queue.append(seq(&[4]), 3.0);

        let top: Vec<u8> = queue
            .top(3)
            .iter()
            .map(|e| e.sequence.as_bytes()[0])
            .collect();
        assert_eq!(top, vec![2, 4, 1]);
        assert_eq!(queue.top(10).len(), 4);
    }

    #[test]
    fn test_uniform_seeds_total_weight() {
        let queue = Queue::uniform([seq(&[0]), seq(&[0, 1])], 1.0);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.total_weight(), 2.0);
    }
}
