use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::corpus::dedup::DuplicateFilter;
use crate::corpus::queue::QueueError;
use crate::execution::Response;

/// Novelty key for a single response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResponseSignature {
    Bytes(Vec<u8>),
    /// Any transport failure; the reason text lands in the log lines instead.
    WriteFailure,
}

impl From<&Response> for ResponseSignature {
    fn from(response: &Response) -> Self {
        match response {
            Response::Success(bytes) => ResponseSignature::Bytes(bytes.clone()),
            Response::Failure(_) => ResponseSignature::WriteFailure,
        }
    }
}

/// Session-scoped record of everything observed so far.
///
/// All three sets only grow. Owned by the session and handed to the oracle
/// and the orchestrator explicitly.
#[derive(Debug, Clone, Default)]
pub struct SeenState {
    log_signatures: HashSet<String>,
    response_signatures: HashSet<ResponseSignature>,
    pub tested: DuplicateFilter,
}

/// Serializable form of the novelty sets, sorted for stable output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoveltySnapshot {
    pub log_signatures: BTreeSet<String>,
    pub response_signatures: BTreeSet<ResponseSignature>,
}

impl SeenState {
    pub fn new(tested: DuplicateFilter) -> Self {
        Self {
            log_signatures: HashSet::new(),
            response_signatures: HashSet::new(),
            tested,
        }
    }

    /// Insert a normalized log signature. Returns true if it was new.
    pub fn insert_log_signature(&mut self, signature: String) -> bool {
        self.log_signatures.insert(signature)
    }

    /// Insert a response signature. Returns true if it was new.
    pub fn insert_response_signature(&mut self, signature: ResponseSignature) -> bool {
        self.response_signatures.insert(signature)
    }

    pub fn log_signature_count(&self) -> usize {
        self.log_signatures.len()
    }

    pub fn response_signature_count(&self) -> usize {
        self.response_signatures.len()
    }

    pub fn snapshot(&self) -> NoveltySnapshot {
        NoveltySnapshot {
            log_signatures: self.log_signatures.iter().cloned().collect(),
            response_signatures: self.response_signatures.iter().cloned().collect(),
        }
    }

    pub fn restore(&mut self, snapshot: NoveltySnapshot) {
        self.log_signatures.extend(snapshot.log_signatures);
        self.response_signatures
            .extend(snapshot.response_signatures);
    }

    pub fn persist_novelty(&self, path: &Path) -> Result<(), QueueError> {
        let json = serde_json::to_vec_pretty(&self.snapshot())?;
        fs::write(path, json).map_err(|source| QueueError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_novelty(path: &Path) -> Result<NoveltySnapshot, QueueError> {
        let raw = fs::read_to_string(path).map_err(|source| QueueError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|e| QueueError::MalformedResumeFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_monotonic() {
        let mut seen = SeenState::default();
        assert!(seen.insert_log_signature("boot".into()));
        assert!(!seen.insert_log_signature("boot".into()));
        assert!(seen.insert_response_signature(ResponseSignature::Bytes(vec![0])));
        assert!(seen.insert_response_signature(ResponseSignature::WriteFailure));
        assert!(!seen.insert_response_signature(ResponseSignature::WriteFailure));
        assert_eq!(seen.log_signature_count(), 1);
        assert_eq!(seen.response_signature_count(), 2);
    }

    #[test]
    fn test_failure_signature_ignores_reason() {
        let a = ResponseSignature::from(&Response::Failure("timeout".into()));
        let b = ResponseSignature::from(&Response::Failure("gatt error".into()));
        assert_eq!(a, b);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut seen = SeenState::default();
        seen.insert_log_signature("a".into());
        seen.insert_response_signature(ResponseSignature::Bytes(vec![3]));

        let mut restored = SeenState::default();
        restored.restore(seen.snapshot());
        assert!(!restored.insert_log_signature("a".into()));
        assert!(!restored.insert_response_signature(ResponseSignature::Bytes(vec![3])));
    }
}
