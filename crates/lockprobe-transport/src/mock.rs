use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::transport::{LogBuffer, Transport, TransportError};

/// One recorded interaction with a [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect(String),
    Disconnect,
    Write(Vec<u8>),
    InitLogs,
}

/// Shared handle onto the calls a [`ScriptedTransport`] has received.
///
/// Cloned before the transport is moved into the engine so tests can
/// inspect traffic afterwards.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<TransportCall>>>);

impl CallLog {
    fn record(&self, call: TransportCall) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every command written, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Write(bytes) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    pub fn connects(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Connect(_)))
    }

    pub fn disconnects(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Disconnect))
    }

    fn count(&self, pred: impl Fn(&TransportCall) -> bool) -> usize {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| pred(c))
            .count()
    }
}

type Responder = Box<dyn FnMut(&[u8]) -> Result<Vec<u8>, TransportError> + Send>;
type LogScript = Box<dyn FnMut(&[u8]) -> Vec<String> + Send>;

/// Scripted transport for tests.
///
/// - connect outcomes pop from a queue (default: succeed)
/// - write replies come from a responder closure (default: `[0x00]`)
/// - log lines can be emitted per write, or scheduled relative to connect
///   time in tokio's clock so paused-time tests see them "arrive"
pub struct ScriptedTransport {
    connect_results: VecDeque<Result<(), TransportError>>,
    responder: Responder,
    write_logs: LogScript,
    connect_logs: Vec<(Duration, String)>,
    pending: Vec<(Instant, String)>,
    logs: LogBuffer,
    connected: bool,
    calls: CallLog,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            connect_results: VecDeque::new(),
            responder: Box::new(|_| Ok(vec![0x00])),
            write_logs: Box::new(|_| Vec::new()),
            connect_logs: Vec::new(),
            pending: Vec::new(),
            logs: LogBuffer::new(),
            connected: false,
            calls: CallLog::default(),
        }
    }

    /// Queue the outcome of the next connect attempt.
    pub fn push_connect_result(&mut self, result: Result<(), TransportError>) -> &mut Self {
        self.connect_results.push_back(result);
        self
    }

    pub fn with_responder(
        mut self,
        responder: impl FnMut(&[u8]) -> Result<Vec<u8>, TransportError> + Send + 'static,
    ) -> Self {
        self.responder = Box::new(responder);
        self
    }

    pub fn with_write_logs(
        mut self,
        script: impl FnMut(&[u8]) -> Vec<String> + Send + 'static,
    ) -> Self {
        self.write_logs = Box::new(script);
        self
    }

    /// Emit `line` `after` each successful connect.
    pub fn with_connect_log(mut self, after: Duration, line: impl Into<String>) -> Self {
        self.connect_logs.push((after, line.into()));
        self
    }

    /// Append a line to the log stream right now.
    pub fn emit_log(&mut self, line: impl Into<String>) {
        self.logs.push(line);
    }

    pub fn call_log(&self) -> CallLog {
        self.calls.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn flush_due(&mut self) {
        let now = Instant::now();
        let mut still_pending = Vec::new();
        for (due, line) in self.pending.drain(..) {
            if due <= now {
                self.logs.push(line);
            } else {
                still_pending.push((due, line));
            }
        }
        self.pending = still_pending;
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&mut self, device_name: &str) -> Result<(), TransportError> {
        self.calls.record(TransportCall::Connect(device_name.to_string()));
        self.connect_results.pop_front().unwrap_or(Ok(()))?;

        self.connected = true;
        let now = Instant::now();
        self.pending.extend(
            self.connect_logs
                .iter()
                .map(|(after, line)| (now + *after, line.clone())),
        );
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.calls.record(TransportCall::Disconnect);
        self.connected = false;
        self.pending.clear();
    }

    async fn write_command(&mut self, command: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.calls.record(TransportCall::Write(command.to_vec()));
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        for line in (self.write_logs)(command) {
            self.logs.push(line);
        }
        (self.responder)(command)
    }

    fn init_logs(&mut self) {
        self.calls.record(TransportCall::InitLogs);
        self.logs.reset();
    }

    fn read_logs(&mut self) -> Vec<String> {
        self.flush_due();
        self.logs.all()
    }

    fn read_new_logs(&mut self) -> Vec<String> {
        self.flush_due();
        self.logs.take_new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let mut transport = ScriptedTransport::new();
        let log = transport.call_log();

        transport.connect("lock").await.unwrap();
        transport.init_logs();
        transport.write_command(&[0x01]).await.unwrap();
        transport.disconnect().await;

        assert_eq!(
            log.calls(),
            vec![
                TransportCall::Connect("lock".into()),
                TransportCall::InitLogs,
                TransportCall::Write(vec![0x01]),
                TransportCall::Disconnect,
            ]
        );
    }

    #[tokio::test]
    async fn test_queued_connect_failure() {
        let mut transport = ScriptedTransport::new();
        transport.push_connect_result(Err(TransportError::DeviceNotFound("lock".into())));

        assert!(transport.connect("lock").await.is_err());
        assert!(!transport.is_connected());
        assert!(transport.connect("lock").await.is_ok());
    }

    #[tokio::test]
    async fn test_write_without_connect_fails() {
        let mut transport = ScriptedTransport::new();
        let err = transport.write_command(&[0x01]).await.unwrap_err();
        assert_eq!(err, TransportError::NotConnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_logs_arrive_on_schedule() {
        let mut transport =
            ScriptedTransport::new().with_connect_log(Duration::from_secs(1), "ESP-ROM:esp32");
        transport.connect("lock").await.unwrap();

        assert!(transport.read_new_logs().is_empty());
        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(transport.read_new_logs().is_empty());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(transport.read_new_logs(), vec!["ESP-ROM:esp32"]);
    }

    #[tokio::test]
    async fn test_write_logs_are_attributed_to_write() {
        let mut transport = ScriptedTransport::new()
            .with_write_logs(|cmd| vec![format!("opcode {:#04x}", cmd[0])]);
        transport.connect("lock").await.unwrap();
        transport.init_logs();

        transport.write_command(&[0x02]).await.unwrap();
        assert_eq!(transport.read_new_logs(), vec!["opcode 0x02"]);
        assert!(transport.read_new_logs().is_empty());
        assert_eq!(transport.read_logs(), vec!["opcode 0x02"]);
    }
}
