/// Outcome of writing one opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Notification bytes returned by the device.
    Success(Vec<u8>),
    /// Transport failure, carried as a sentinel so the oracle still sees it.
    Failure(String),
}

impl Response {
    /// Status byte 0x00 means the firmware accepted the command.
    /// Empty notifications and failures are not success.
    pub fn is_success_status(&self) -> bool {
        matches!(self, Response::Success(bytes) if bytes.first() == Some(&0x00))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Response::Failure(_))
    }
}

/// Everything observed while executing one command sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// One entry per opcode sent, in order.
    pub responses: Vec<Response>,
    /// Diagnostic lines attributed to this execution, in arrival order.
    pub log_lines: Vec<String>,
}

impl ExecutionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> usize {
        self.responses.iter().filter(|r| r.is_failure()).count()
    }

    pub fn non_success(&self) -> usize {
        self.responses
            .iter()
            .filter(|r| !r.is_failure() && !r.is_success_status())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(Response::Success(vec![0x00]).is_success_status());
        assert!(!Response::Success(vec![0x01]).is_success_status());
        assert!(!Response::Success(vec![]).is_success_status());
        assert!(!Response::Failure("gatt".into()).is_success_status());
    }

    #[test]
    fn test_counts() {
        let result = ExecutionResult {
            responses: vec![
                Response::Success(vec![0x00]),
                Response::Success(vec![0x03]),
                Response::Failure("lost".into()),
            ],
            log_lines: vec![],
        };
        assert_eq!(result.failures(), 1);
        assert_eq!(result.non_success(), 1);
    }
}
