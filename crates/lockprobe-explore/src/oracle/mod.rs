//! Black-box interestingness oracle.
//!
//! With no coverage signal available, log text and response bytes are the
//! only observable proxy for new device-internal behavior. An execution is
//! interesting iff it contributes a log-line signature or a response
//! signature never seen before in the session. Crash banners make an
//! execution interesting unconditionally.

pub mod seen;
pub mod signature;

use std::fmt;

use crate::execution::ExecutionResult;

pub use seen::{NoveltySnapshot, ResponseSignature, SeenState};
pub use signature::{normalize_log_line, SignatureSet};

/// Default crash banner patterns.
pub const DEFAULT_CRASH_SIGNATURES: [&str; 2] = ["guru meditation", "rebooting"];

/// Classification label for a saved finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingLabel {
    /// A crash or reboot banner was observed.
    Crash,
    /// At least one write failed mid-sequence.
    Exception,
    /// New observable behavior without a crash or failure.
    Interesting,
}

impl FindingLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingLabel::Crash => "crash",
            FindingLabel::Exception => "exception",
            FindingLabel::Interesting => "interesting",
        }
    }
}

impl fmt::Display for FindingLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured classification of one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub new_log_signatures: usize,
    pub new_response_signatures: usize,
    pub crash_detected: bool,
    pub write_failures: usize,
    pub non_success: usize,
}

impl Verdict {
    /// Contributed at least one unseen signature.
    pub fn is_novel(&self) -> bool {
        self.new_log_signatures > 0 || self.new_response_signatures > 0
    }

    pub fn is_interesting(&self) -> bool {
        self.is_novel() || self.crash_detected
    }

    /// Label for the finding record, if this execution deserves one.
    /// Precedence: crash > exception > interesting.
    pub fn label(&self) -> Option<FindingLabel> {
        if self.crash_detected {
            Some(FindingLabel::Crash)
        } else if self.write_failures > 0 {
            Some(FindingLabel::Exception)
        } else if self.is_novel() {
            Some(FindingLabel::Interesting)
        } else {
            None
        }
    }
}

/// Classifies executions against the session's [`SeenState`].
#[derive(Debug, Clone)]
pub struct InterestingnessOracle {
    crash_signatures: SignatureSet,
}

impl InterestingnessOracle {
    pub fn new(crash_signatures: SignatureSet) -> Self {
        Self { crash_signatures }
    }

    pub fn crash_signatures(&self) -> &SignatureSet {
        &self.crash_signatures
    }

    /// True iff `result` exposes unseen behavior. Updates `seen`.
    pub fn classify(&self, seen: &mut SeenState, result: &ExecutionResult) -> bool {
        self.assess(seen, result).is_interesting()
    }

    /// Full verdict. Every signature is checked and inserted, so a second
    /// identical result is never novel.
    pub fn assess(&self, seen: &mut SeenState, result: &ExecutionResult) -> Verdict {
        let mut verdict = Verdict::default();

        for line in &result.log_lines {
            let signature = normalize_log_line(line);
            if signature.is_empty() {
                continue;
            }
            if self.crash_signatures.matches(&signature) {
                verdict.crash_detected = true;
            }
            if seen.insert_log_signature(signature) {
                verdict.new_log_signatures += 1;
            }
        }

        for response in &result.responses {
            if seen.insert_response_signature(ResponseSignature::from(response)) {
                verdict.new_response_signatures += 1;
            }
        }

        verdict.write_failures = result.failures();
        verdict.non_success = result.non_success();
        verdict
    }
}

impl Default for InterestingnessOracle {
    fn default() -> Self {
        Self::new(SignatureSet::new(DEFAULT_CRASH_SIGNATURES))
    }
}
