//! Transport Layer Traits
//!
//! Core traits and types shared by every way of reaching a TEC controller.
//! A transport moves bytes; framing, checksums and correlation are done by `mecom`.

use async_trait::async_trait;
use mecom::constants::{MAX_FRAME_LEN, TERMINATOR};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Pause between polls when a transport reports no pending data
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Link-level failures, independent of frame content
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection lost
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Send operation failed
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Receive operation failed
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Timeout occurred
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Session state of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Transport is disconnected
    Disconnected,
    /// Link is being opened
    Connecting,
    /// Link is open
    Connected,
    /// Last open attempt or I/O failed
    Error,
}

/// Transport statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportStats {
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Total bytes received
    pub bytes_received: u64,
    /// Total bytes thrown away by `clear`
    pub bytes_discarded: u64,
    /// Number of connection attempts
    pub connection_attempts: u64,
    /// Number of successful connections
    pub successful_connections: u64,
    /// Number of failed connections
    pub failed_connections: u64,
    /// Number of disconnections
    pub disconnections: u64,
    /// Last successful connection time
    pub last_connection: Option<SystemTime>,
    /// Transport uptime
    pub uptime: Duration,
    /// Current connection state
    pub connection_state: ConnectionState,
}

impl TransportStats {
    pub fn new() -> Self {
        Self {
            bytes_sent: 0,
            bytes_received: 0,
            bytes_discarded: 0,
            connection_attempts: 0,
            successful_connections: 0,
            failed_connections: 0,
            disconnections: 0,
            last_connection: None,
            uptime: Duration::new(0, 0),
            connection_state: ConnectionState::Disconnected,
        }
    }

    pub fn record_connection_attempt(&mut self) {
        self.connection_attempts += 1;
        self.connection_state = ConnectionState::Connecting;
    }

    pub fn record_successful_connection(&mut self) {
        self.successful_connections += 1;
        self.last_connection = Some(SystemTime::now());
        self.connection_state = ConnectionState::Connected;
    }

    pub fn record_failed_connection(&mut self) {
        self.failed_connections += 1;
        self.connection_state = ConnectionState::Error;
    }

    pub fn record_disconnection(&mut self) {
        self.disconnections += 1;
        self.connection_state = ConnectionState::Disconnected;
    }

    pub fn record_bytes_sent(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
    }

    pub fn record_bytes_received(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
    }

    pub fn record_bytes_discarded(&mut self, bytes: usize) {
        self.bytes_discarded += bytes as u64;
    }
}

impl Default for TransportStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings of one link kind
pub trait TransportConfig: Send + Sync + fmt::Debug + Clone {
    /// Configuration name/identifier
    fn name(&self) -> &str;

    /// Reject settings that cannot open a link
    fn validate(&self) -> Result<(), TransportError>;

    /// Time allowed for one request/reply exchange
    fn timeout(&self) -> Duration;
}

/// Byte link to one controller (TCP bridge, serial port or test double)
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Transport type identifier ("tcp", "serial", "mock")
    fn transport_type(&self) -> &str;

    /// Human-readable transport name
    fn name(&self) -> &str;

    /// Time allowed for one request/reply exchange
    fn timeout(&self) -> Duration;

    /// Open the link
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Close the link; closing a closed link is not an error
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Write raw bytes
    ///
    /// # Returns
    ///
    /// `Ok(bytes_sent)` if successful, `Err` otherwise
    async fn send(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Receive whatever is available into `buffer`
    ///
    /// `Ok(0)` means nothing arrived yet; it is not an error.
    async fn receive(
        &mut self,
        buffer: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<usize, TransportError>;

    /// Discard any input that is already buffered (stale replies, line noise)
    async fn clear(&mut self) -> Result<(), TransportError>;

    async fn is_connected(&self) -> bool;

    async fn stats(&self) -> TransportStats;

    /// Send one request frame and collect the reply line
    ///
    /// Reads until the CR terminator. Gives up with `Timeout` once [`Transport::timeout`]
    /// has elapsed and with `ReceiveFailed` if no terminator shows up within the maximum
    /// frame length. Bytes after the terminator are dropped; a session that has to keep
    /// them holds its own [`ReplyReader`].
    async fn query(&mut self, request: &str) -> Result<String, TransportError> {
        self.send(request.as_bytes()).await?;

        let deadline = Instant::now() + self.timeout();
        let mut reader = ReplyReader::new();
        let reply = reader.read_reply(self, deadline).await?;
        if reader.buffered() > 0 {
            debug!(
                "[{}] Dropping {} bytes after reply terminator",
                self.name(),
                reader.buffered()
            );
        }
        Ok(reply)
    }
}

/// Reassembles CR-terminated reply lines from arbitrary receive chunks
///
/// Bytes after a terminator stay buffered and start the next line.
#[derive(Debug, Default)]
pub struct ReplyReader {
    pending: Vec<u8>,
}

impl ReplyReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received but not yet returned as a line
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Drop buffered bytes, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    /// Next complete line, waiting for more input until `deadline`
    pub async fn read_reply<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        deadline: Instant,
    ) -> Result<String, TransportError> {
        let mut chunk = [0u8; MAX_FRAME_LEN];

        loop {
            if let Some(end) = self.pending.iter().position(|&b| b == TERMINATOR as u8) {
                let line: Vec<u8> = self.pending.drain(..=end).collect();
                // non-ASCII bytes survive as replacement characters and fail frame parsing
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }

            if self.pending.len() >= MAX_FRAME_LEN {
                let n = self.clear();
                return Err(TransportError::ReceiveFailed(format!(
                    "no reply terminator within {} bytes",
                    n
                )));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(
                    "[{}] No complete reply within {:?} ({} bytes so far)",
                    transport.name(),
                    transport.timeout(),
                    self.pending.len()
                );
                return Err(TransportError::Timeout(format!(
                    "no reply terminator within {:?}",
                    transport.timeout()
                )));
            }

            let room = MAX_FRAME_LEN - self.pending.len();
            let n = match transport.receive(&mut chunk[..room], Some(remaining)).await {
                Ok(n) => n,
                // deadline check above reports it
                Err(TransportError::Timeout(_)) => continue,
                Err(e) => return Err(e),
            };
            if n == 0 {
                tokio::time::sleep(POLL_INTERVAL.min(remaining)).await;
                continue;
            }
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }
}

/// Lets the driver hold a transport chosen at runtime from configuration
#[async_trait]
impl Transport for Box<dyn Transport> {
    fn transport_type(&self) -> &str {
        self.as_ref().transport_type()
    }

    fn name(&self) -> &str {
        self.as_ref().name()
    }

    fn timeout(&self) -> Duration {
        self.as_ref().timeout()
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        self.as_mut().connect().await
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.as_mut().disconnect().await
    }

    async fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.as_mut().send(data).await
    }

    async fn receive(
        &mut self,
        buffer: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<usize, TransportError> {
        self.as_mut().receive(buffer, timeout).await
    }

    async fn clear(&mut self) -> Result<(), TransportError> {
        self.as_mut().clear().await
    }

    async fn is_connected(&self) -> bool {
        self.as_ref().is_connected().await
    }

    async fn stats(&self) -> TransportStats {
        self.as_ref().stats().await
    }

    async fn query(&mut self, request: &str) -> Result<String, TransportError> {
        self.as_mut().query(request).await
    }
}

/// Printable dump of raw line traffic: ASCII with CR/LF escaped
pub(crate) fn format_ascii(data: &[u8]) -> String {
    String::from_utf8_lossy(data).escape_debug().to_string()
}
