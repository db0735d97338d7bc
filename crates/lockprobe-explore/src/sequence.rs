use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound on opcodes per test case.
pub const MAX_SEQUENCE_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    #[error("command sequence is empty")]
    Empty,

    #[error("command sequence has {len} opcodes, max {MAX_SEQUENCE_LEN}")]
    TooLong { len: usize },
}

/// An ordered list of opcodes forming one test case.
///
/// Always holds between 1 and [`MAX_SEQUENCE_LEN`] bytes. Serializes as a
/// plain list of integers, and deserialization enforces the same bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct CommandSequence(Vec<u8>);

impl CommandSequence {
    pub fn new(bytes: Vec<u8>) -> Result<Self, SequenceError> {
        if bytes.is_empty() {
            return Err(SequenceError::Empty);
        }
        if bytes.len() > MAX_SEQUENCE_LEN {
            return Err(SequenceError::TooLong { len: bytes.len() });
        }
        Ok(Self(bytes))
    }

    /// Build from mutator output: trims to the upper bound.
    /// Returns `None` only for empty input.
    pub fn truncated(mut bytes: Vec<u8>) -> Option<Self> {
        bytes.truncate(MAX_SEQUENCE_LEN);
        if bytes.is_empty() {
            None
        } else {
            Some(Self(bytes))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.clone()
    }
}

impl TryFrom<Vec<u8>> for CommandSequence {
    type Error = SequenceError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

impl From<CommandSequence> for Vec<u8> {
    fn from(seq: CommandSequence) -> Self {
        seq.0
    }
}

/// Human-readable hex list, e.g. `0x00 0x01 0xaa`.
impl fmt::Display for CommandSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:#04x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty() {
        assert_eq!(CommandSequence::new(vec![]), Err(SequenceError::Empty));
    }

    #[test]
    fn test_rejects_oversized() {
        let err = CommandSequence::new(vec![0; MAX_SEQUENCE_LEN + 1]).unwrap_err();
        assert_eq!(err, SequenceError::TooLong { len: 257 });
        assert!(CommandSequence::new(vec![0; MAX_SEQUENCE_LEN]).is_ok());
    }

    #[test]
    fn test_truncated_trims_to_bound() {
        let seq = CommandSequence::truncated(vec![7; 300]).unwrap();
        assert_eq!(seq.len(), MAX_SEQUENCE_LEN);
        assert!(CommandSequence::truncated(vec![]).is_none());
    }

    #[test]
    fn test_display_hex_list() {
        let seq = CommandSequence::new(vec![0x00, 0x01, 0xaa]).unwrap();
        assert_eq!(seq.to_string(), "0x00 0x01 0xaa");
    }

    #[test]
    fn test_serde_enforces_bounds() {
        let seq: CommandSequence = serde_json::from_str("[1,2]").unwrap();
        assert_eq!(seq.as_bytes(), &[1, 2]);
        assert_eq!(serde_json::to_string(&seq).unwrap(), "[1,2]");

        assert!(serde_json::from_str::<CommandSequence>("[]").is_err());
        assert!(serde_json::from_str::<CommandSequence>("[256]").is_err());
    }
}
