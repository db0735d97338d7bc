//! Run outcome reporting.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Reason a campaign stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Iteration budget exhausted.
    Complete,
    /// Operator interrupt.
    Interrupted,
    /// Nothing left to select from.
    EmptyQueue,
}

/// Counters for a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub stop_reason: StopReason,
    pub iterations_completed: u64,
    pub executions: u64,
    pub duplicates_skipped: u64,
    pub interesting: u64,
    pub crashes: u64,
    pub write_failures: u64,
    pub non_success_responses: u64,
    pub cycle_errors: u64,
    pub findings_written: u64,
    pub queue_len: usize,
    pub queue_path: Option<PathBuf>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            stop_reason: StopReason::Complete,
            iterations_completed: 0,
            executions: 0,
            duplicates_skipped: 0,
            interesting: 0,
            crashes: 0,
            write_failures: 0,
            non_success_responses: 0,
            cycle_errors: 0,
            findings_written: 0,
            queue_len: 0,
            queue_path: None,
        }
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Fuzz Summary]")?;
        writeln!(f, "  Stop reason:          {:?}", self.stop_reason)?;
        writeln!(f, "  Rounds completed:     {}", self.iterations_completed)?;
        writeln!(f, "  Executions:           {}", self.executions)?;
        writeln!(f, "  Duplicates skipped:   {}", self.duplicates_skipped)?;
        writeln!(f, "  Interesting:          {}", self.interesting)?;
        writeln!(f, "  Crashes:              {}", self.crashes)?;
        writeln!(f, "  Write failures:       {}", self.write_failures)?;
        writeln!(f, "  Non-success replies:  {}", self.non_success_responses)?;
        writeln!(f, "  Cycle errors:         {}", self.cycle_errors)?;
        writeln!(f, "  Findings written:     {}", self.findings_written)?;
        write!(f, "  Queue entries:        {}", self.queue_len)?;
        if let Some(path) = &self.queue_path {
            write!(f, " ({})", path.display())?;
        }
        Ok(())
    }
}
