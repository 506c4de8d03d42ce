//! Serial Transport Implementation
//!
//! Direct USB/RS-232/RS-485 connection to a controller. MeCom always runs 8N1 without
//! flow control, so only the port path, baud rate and timeout are configurable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::RwLock;
use tokio::time::timeout;
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, info, warn};

use super::traits::{
    format_ascii, ConnectionState, Transport, TransportConfig, TransportError, TransportStats,
};

/// Factory default of Meerstetter controllers
pub const DEFAULT_BAUD_RATE: u32 = 57600;

/// Serial port configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialTransportConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0", "COM3")
    pub port: String,
    pub baud_rate: u32,
    /// Read/write and request/reply timeout
    pub timeout: Duration,
}

impl SerialTransportConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }
}

impl Default for SerialTransportConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_secs(1),
        }
    }
}

impl TransportConfig for SerialTransportConfig {
    fn name(&self) -> &str {
        "serial"
    }

    fn validate(&self) -> Result<(), TransportError> {
        if self.port.is_empty() {
            return Err(TransportError::ConfigError(
                "Port path cannot be empty".to_string(),
            ));
        }

        if self.baud_rate == 0 {
            return Err(TransportError::ConfigError(
                "Baud rate must be greater than zero".to_string(),
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

/// Serial transport implementation
#[derive(Debug)]
pub struct SerialTransport {
    config: SerialTransportConfig,
    connection: Arc<RwLock<Option<SerialStream>>>,
    stats: Arc<RwLock<TransportStats>>,
    /// Creation time for uptime calculation
    start_time: SystemTime,
}

impl SerialTransport {
    /// Create new serial transport with configuration
    pub fn new(config: SerialTransportConfig) -> Result<Self, TransportError> {
        config.validate()?;

        Ok(Self {
            config,
            connection: Arc::new(RwLock::new(None)),
            stats: Arc::new(RwLock::new(TransportStats::new())),
            start_time: SystemTime::now(),
        })
    }

    pub fn config(&self) -> &SerialTransportConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for SerialTransport {
    fn transport_type(&self) -> &str {
        "serial"
    }

    fn name(&self) -> &str {
        "Serial Transport"
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        self.stats.write().await.record_connection_attempt();

        debug!("Opening serial port: {}", self.config.port);

        let port_result = tokio_serial::new(&self.config.port, self.config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(self.config.timeout)
            .open_native_async();

        match port_result {
            Ok(mut port) => {
                #[cfg(unix)]
                port.set_exclusive(false).map_err(|e| {
                    TransportError::IoError(format!("Failed to set exclusive mode: {e}"))
                })?;

                *self.connection.write().await = Some(port);
                self.stats.write().await.record_successful_connection();

                info!(
                    "Opened serial port {} at {} baud",
                    self.config.port, self.config.baud_rate
                );
                Ok(())
            },
            Err(e) => {
                let error_msg = format!("Failed to open serial port {}: {e}", self.config.port);
                error!("{error_msg}");
                self.stats.write().await.record_failed_connection();
                Err(TransportError::ConnectionFailed(error_msg))
            },
        }
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let mut conn = self.connection.write().await;
        if conn.take().is_some() {
            // Serial port is closed when dropped
            self.stats.write().await.record_disconnection();
            info!("Closed serial port: {}", self.config.port);
        }
        Ok(())
    }

    async fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let mut conn = self.connection.write().await;
        let port = conn.as_mut().ok_or_else(|| {
            TransportError::SendFailed("Serial port not connected".to_string())
        })?;

        let send_operation = async {
            port.write_all(data).await?;
            port.flush().await?;
            Ok::<_, std::io::Error>(data.len())
        };

        match timeout(self.config.timeout, send_operation).await {
            Ok(Ok(bytes_sent)) => {
                drop(conn);
                self.stats.write().await.record_bytes_sent(bytes_sent);

                debug!(
                    ascii = %format_ascii(data),
                    length = bytes_sent,
                    direction = "send",
                    "[Serial Transport] Raw frame"
                );
                Ok(bytes_sent)
            },
            Ok(Err(e)) => {
                let error_msg = format!("Failed to send data: {e}");
                error!("{error_msg}");

                // Port might be gone (unplugged adapter), remove it
                *conn = None;
                drop(conn);
                self.stats.write().await.connection_state = ConnectionState::Error;

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
        let port = conn.as_mut().ok_or_else(|| {
            TransportError::ReceiveFailed("Serial port not connected".to_string())
        })?;
        let receive_timeout = timeout_duration.unwrap_or(self.config.timeout);

        match timeout(receive_timeout, port.read(buffer)).await {
            // No data available
            Ok(Ok(0)) => Ok(0),
            Ok(Ok(bytes_read)) => {
                drop(conn);
                self.stats.write().await.record_bytes_received(bytes_read);

                debug!(
                    ascii = %format_ascii(&buffer[..bytes_read]),
                    length = bytes_read,
                    direction = "recv",
                    "[Serial Transport] Raw frame"
                );
                Ok(bytes_read)
            },
            Ok(Err(e)) => {
                let error_msg = format!("Failed to receive data: {e}");
                error!("{error_msg}");

                *conn = None;
                drop(conn);
                self.stats.write().await.connection_state = ConnectionState::Error;

                Err(TransportError::ReceiveFailed(error_msg))
            },
            Err(_) => {
                let error_msg = format!("Receive timed out after {receive_timeout:?}");
                debug!("{error_msg}"); // Debug level for timeout, the caller decides
                Err(TransportError::Timeout(error_msg))
            },
        }
    }

    async fn clear(&mut self) -> Result<(), TransportError> {
        let conn = self.connection.read().await;
        let port = conn.as_ref().ok_or_else(|| {
            TransportError::ReceiveFailed("Serial port not connected".to_string())
        })?;

        let pending = port.bytes_to_read().unwrap_or(0) as usize;
        port.clear(ClearBuffer::Input)
            .map_err(|e| TransportError::IoError(format!("Failed to clear input buffer: {e}")))?;
        drop(conn);

        if pending > 0 {
            debug!("Discarded {} stale bytes from serial input", pending);
        }
        self.stats.write().await.record_bytes_discarded(pending);
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

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_validation() {
        let mut config = SerialTransportConfig::default();
        assert!(config.validate().is_ok());

        config.port = "".to_string();
        assert!(config.validate().is_err());

        config.port = "/dev/ttyUSB0".to_string();
        config.baud_rate = 0;
        assert!(config.validate().is_err());

        config.baud_rate = DEFAULT_BAUD_RATE;
        config.timeout = Duration::from_secs(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serial_transport_creation() {
        let transport = SerialTransport::new(SerialTransportConfig::new("/dev/ttyACM0")).unwrap();
        assert_eq!(transport.transport_type(), "serial");
        assert_eq!(transport.name(), "Serial Transport");
        assert_eq!(transport.config().baud_rate, 57600);
        assert_eq!(transport.timeout(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_serial_transport_not_connected_initially() {
        let mut transport = SerialTransport::new(SerialTransportConfig::default()).unwrap();

        assert!(!transport.is_connected().await);
        assert_eq!(
            transport.stats().await.connection_state,
            ConnectionState::Disconnected
        );
        assert!(transport.send(b"#").await.is_err());
        assert!(transport.clear().await.is_err());
    }

    #[tokio::test]
    async fn test_serial_open_missing_port() {
        let mut transport =
            SerialTransport::new(SerialTransportConfig::new("/dev/does-not-exist-tec")).unwrap();
        assert!(matches!(
            transport.connect().await,
            Err(TransportError::ConnectionFailed(_))
        ));
        assert_eq!(transport.stats().await.failed_connections, 1);
    }
}
