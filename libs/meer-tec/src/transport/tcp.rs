//! TCP Transport Implementation
//!
//! Talks to a controller behind an Ethernet-to-serial bridge (Lantronix XPort and
//! similar), which forwards the MeCom line protocol unchanged over a raw TCP socket.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use super::traits::{
    format_ascii, ConnectionState, Transport, TransportConfig, TransportError, TransportStats,
};

/// Port the XPort bridge listens on out of the box
pub const DEFAULT_TCP_PORT: u16 = 10001;

/// Idle time after which `clear` considers the socket drained
const CLEAR_IDLE: Duration = Duration::from_millis(20);

/// TCP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpTransportConfig {
    /// Remote host address
    pub host: String,
    /// Remote port number
    pub port: u16,
    /// Connect and request/reply timeout
    pub timeout: Duration,
    /// TCP no-delay (Nagle algorithm)
    pub no_delay: bool,
}

impl TcpTransportConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_TCP_PORT,
            timeout: Duration::from_millis(200),
            no_delay: true,
        }
    }
}

impl TransportConfig for TcpTransportConfig {
    fn name(&self) -> &str {
        "tcp"
    }

    fn validate(&self) -> Result<(), TransportError> {
        if self.host.is_empty() {
            return Err(TransportError::ConfigError(
                "Host cannot be empty".to_string(),
            ));
        }

        if self.port == 0 {
            return Err(TransportError::ConfigError(
                "Port cannot be zero".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(TransportError::ConfigError(
                "Timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// TCP transport implementation
#[derive(Debug)]
pub struct TcpTransport {
    config: TcpTransportConfig,
    connection: Arc<RwLock<Option<TcpStream>>>,
    stats: Arc<RwLock<TransportStats>>,
    /// Creation time for uptime calculation
    start_time: SystemTime,
}

impl TcpTransport {
    /// Create new TCP transport with configuration
    pub fn new(config: TcpTransportConfig) -> Result<Self, TransportError> {
        config.validate()?;

        Ok(Self {
            config,
            connection: Arc::new(RwLock::new(None)),
            stats: Arc::new(RwLock::new(TransportStats::new())),
            start_time: SystemTime::now(),
        })
    }

    pub fn config(&self) -> &TcpTransportConfig {
        &self.config
    }

    fn socket_addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    async fn mark_broken(&self) {
        let mut stats = self.stats.write().await;
        stats.connection_state = ConnectionState::Error;
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn transport_type(&self) -> &str {
        "tcp"
    }

    fn name(&self) -> &str {
        "TCP Transport"
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        self.stats.write().await.record_connection_attempt();

        let addr = self.socket_addr();
        debug!("Connecting to TCP endpoint: {addr}");

        match timeout(self.config.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => {
                if let Err(e) = stream.set_nodelay(self.config.no_delay) {
                    warn!("Failed to set TCP_NODELAY: {e}");
                }

                *self.connection.write().await = Some(stream);
                self.stats.write().await.record_successful_connection();

                info!("Connected to TCP endpoint: {addr}");
                Ok(())
            },
            Ok(Err(e)) => {
                let error_msg = format!("Failed to connect to {addr}: {e}");
                error!("{error_msg}");
                self.stats.write().await.record_failed_connection();
                Err(TransportError::ConnectionFailed(error_msg))
            },
            Err(_) => {
                let error_msg = format!("Connection to {addr} timed out");
                warn!("{error_msg}");
                self.stats.write().await.record_failed_connection();
                Err(TransportError::Timeout(error_msg))
            },
        }
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let mut conn = self.connection.write().await;
        if let Some(mut stream) = conn.take() {
            if let Err(e) = stream.shutdown().await {
                warn!("Error during TCP shutdown: {e}");
            }
            self.stats.write().await.record_disconnection();
            info!("Disconnected from TCP endpoint: {}", self.socket_addr());
        }
        Ok(())
    }

    async fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let mut conn = self.connection.write().await;
        let stream = conn
            .as_mut()
            .ok_or_else(|| TransportError::SendFailed("Not connected".to_string()))?;

        match timeout(self.config.timeout, stream.write_all(data)).await {
            Ok(Ok(())) => {
                drop(conn);
                self.stats.write().await.record_bytes_sent(data.len());

                debug!(
                    ascii = %format_ascii(data),
                    length = data.len(),
                    direction = "send",
                    "[TCP Transport] Raw frame"
                );
                Ok(data.len())
            },
            Ok(Err(e)) => {
                let error_msg = format!("Failed to send data: {e}");
                error!("{error_msg}");

                // Connection might be broken, remove it
                *conn = None;
                drop(conn);
                self.mark_broken().await;

                Err(TransportError::SendFailed(error_msg))
            },
            Err(_) => {
                let error_msg = format!("Send timed out after {:?}", self.config.timeout);
                warn!("{error_msg}");
                Err(TransportError::Timeout(error_msg))
            },
        }
    }

    async fn receive(
        &mut self,
        buffer: &mut [u8],
        timeout_duration: Option<Duration>,
    ) -> Result<usize, TransportError> {
        let mut conn = self.connection.write().await;
        let stream = conn
            .as_mut()
            .ok_or_else(|| TransportError::ReceiveFailed("Not connected".to_string()))?;
        let receive_timeout = timeout_duration.unwrap_or(self.config.timeout);

        match timeout(receive_timeout, stream.read(buffer)).await {
            Ok(Ok(0)) => {
                warn!("TCP connection closed by peer");
                *conn = None;
                drop(conn);
                self.stats.write().await.record_disconnection();

                Err(TransportError::ConnectionLost(
                    "Connection closed by peer".to_string(),
                ))
            },
            Ok(Ok(bytes_read)) => {
                drop(conn);
                self.stats.write().await.record_bytes_received(bytes_read);

                debug!(
                    ascii = %format_ascii(&buffer[..bytes_read]),
                    length = bytes_read,
                    direction = "recv",
                    "[TCP Transport] Raw frame"
                );
                Ok(bytes_read)
            },
            Ok(Err(e)) => {
                let error_msg = format!("Failed to receive data: {e}");
                error!("{error_msg}");

                *conn = None;
                drop(conn);
                self.mark_broken().await;

                Err(TransportError::ReceiveFailed(error_msg))
            },
            Err(_) => {
                let error_msg = format!("Receive timed out after {receive_timeout:?}");
                debug!("{error_msg}");
                Err(TransportError::Timeout(error_msg))
            },
        }
    }

    async fn clear(&mut self) -> Result<(), TransportError> {
        let mut conn = self.connection.write().await;
        let stream = conn
            .as_mut()
            .ok_or_else(|| TransportError::ReceiveFailed("Not connected".to_string()))?;

        // bounded by the request timeout, however busy the peer is
        let deadline = Instant::now() + self.config.timeout;
        let mut scratch = [0u8; 128];
        let mut discarded = 0usize;
        loop {
            if Instant::now() >= deadline {
                warn!(
                    "TCP input still busy after {:?}, {} bytes discarded",
                    self.config.timeout, discarded
                );
                break;
            }
            match timeout(CLEAR_IDLE, stream.read(&mut scratch)).await {
                // quiet line: drained
                Err(_) => break,
                Ok(Ok(0)) => {
                    *conn = None;
                    drop(conn);
                    self.stats.write().await.record_disconnection();
                    return Err(TransportError::ConnectionLost(
                        "Connection closed by peer".to_string(),
                    ));
                },
                Ok(Ok(n)) => discarded += n,
                Ok(Err(e)) => {
                    *conn = None;
                    drop(conn);
                    self.mark_broken().await;
                    return Err(TransportError::IoError(format!(
                        "Failed to drain socket: {e}"
                    )));
                },
            }
        }
        drop(conn);

        if discarded > 0 {
            debug!("Discarded {} stale bytes from TCP input", discarded);
        }
        self.stats.write().await.record_bytes_discarded(discarded);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connection.read().await.is_some()
    }

    async fn stats(&self) -> TransportStats {
        let mut stats = self.stats.read().await.clone();
        if let Ok(elapsed) = self.start_time.elapsed() {
            stats.uptime = elapsed;
        }
        stats
    }
}
