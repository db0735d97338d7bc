use async_trait::async_trait;

/// Failures surfaced by a transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("not connected")]
    NotConnected,

    #[error("write failed: {0}")]
    Write(String),

    #[error("notification failed: {0}")]
    Notify(String),
}

impl TransportError {
    /// True for errors raised while establishing a link.
    pub fn is_connect_error(&self) -> bool {
        matches!(
            self,
            TransportError::DeviceNotFound(_) | TransportError::Connect(_)
        )
    }
}

/// Abstract link to the lock controller.
///
/// Abstracted behind a trait so we can:
/// - Drive the engine against [`crate::mock::ScriptedTransport`] in tests
/// - Plug in a real radio stack without touching the engine
///
/// Connect and write timeouts are the implementation's responsibility.
#[async_trait]
pub trait Transport: Send {
    /// Find and link to the named device.
    async fn connect(&mut self, device_name: &str) -> Result<(), TransportError>;

    /// Drop the link. Idempotent, safe to call when not connected.
    async fn disconnect(&mut self);

    /// Write one command and wait for its notification.
    async fn write_command(&mut self, command: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Reset the log-collection buffer and cursor.
    fn init_logs(&mut self);

    /// All lines collected since the last `init_logs`.
    fn read_logs(&mut self) -> Vec<String>;

    /// Lines collected since the previous read, advancing the cursor.
    fn read_new_logs(&mut self) -> Vec<String>;
}

/// Line buffer with a read cursor, shared by the in-memory transports.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    lines: Vec<String>,
    cursor: usize,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn reset(&mut self) {
        self.lines.clear();
        self.cursor = 0;
    }

    pub fn all(&self) -> Vec<String> {
        self.lines.clone()
    }

    pub fn take_new(&mut self) -> Vec<String> {
        let fresh = self.lines[self.cursor..].to_vec();
        self.cursor = self.lines.len();
        fresh
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_new_advances_cursor() {
        let mut buf = LogBuffer::new();
        buf.push("a");
        buf.push("b");
        assert_eq!(buf.take_new(), vec!["a", "b"]);
        assert!(buf.take_new().is_empty());

        buf.push("c");
        assert_eq!(buf.take_new(), vec!["c"]);
        assert_eq!(buf.all(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_reset_clears_lines_and_cursor() {
        let mut buf = LogBuffer::new();
        buf.push("old");
        buf.take_new();
        buf.reset();
        assert!(buf.is_empty());

        buf.push("new");
        assert_eq!(buf.take_new(), vec!["new"]);
    }

    #[test]
    fn test_connect_error_classification() {
        assert!(TransportError::DeviceNotFound("lock".into()).is_connect_error());
        assert!(TransportError::Connect("timeout".into()).is_connect_error());
        assert!(!TransportError::Write("gatt".into()).is_connect_error());
        assert!(!TransportError::NotConnected.is_connect_error());
    }
}
