use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use lockprobe_explore::oracle::FindingLabel;
use lockprobe_explore::CommandSequence;

use crate::protocol::LockState;

#[derive(Debug, thiserror::Error)]
#[error("failed to write finding {path}: {source}")]
pub struct FindingError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A saved interesting or failing execution.
#[derive(Debug, Clone)]
pub struct FindingRecord<'a> {
    pub label: FindingLabel,
    pub cycle: u64,
    pub input: &'a CommandSequence,
    pub lock_state: LockState,
    pub log_lines: &'a [String],
}

/// Text body of the finding file.
impl fmt::Display for FindingRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Input: {}", self.input)?;
        writeln!(f, "Cycle: {}", self.cycle)?;
        writeln!(f, "State: {}", self.lock_state)?;
        writeln!(f, "Logs:")?;
        for line in self.log_lines {
            writeln!(f, "  {}", line.trim())?;
        }
        Ok(())
    }
}

/// Writes one file per finding into the session directory, named
/// `<label>_<timestamp>_<n>.txt`.
#[derive(Debug)]
pub struct FindingWriter {
    dir: PathBuf,
    written: u64,
}

impl FindingWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn write(&mut self, record: &FindingRecord<'_>) -> Result<PathBuf, FindingError> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
        let path = self.dir.join(format!(
            "{}_{}_{:04}.txt",
            record.label, stamp, self.written
        ));
        fs::write(&path, record.to_string()).map_err(|source| FindingError {
            path: path.clone(),
            source,
        })?;
        self.written += 1;
        Ok(path)
    }
}
