//! Mock Transport for Testing
//!
//! Scripted stand-in for a controller: replies are queued up front and every frame
//! written is recorded. Clones share state, so a test can keep a handle while the
//! driver owns the transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::debug;

use super::traits::{ConnectionState, Transport, TransportConfig, TransportError, TransportStats};

/// Mock transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockTransportConfig {
    /// Transport name for identification
    pub name: String,
    /// Request/reply timeout; keep short so "no reply" tests finish quickly
    pub timeout: Duration,
    /// Start in the connected state
    pub auto_connect: bool,
}

impl Default for MockTransportConfig {
    fn default() -> Self {
        Self {
            name: "Mock Transport".to_string(),
            timeout: Duration::from_millis(50),
            auto_connect: true,
        }
    }
}

impl TransportConfig for MockTransportConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), TransportError> {
        if self.name.is_empty() {
            return Err(TransportError::ConfigError(
                "Name cannot be empty".to_string(),
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

#[derive(Debug)]
struct MockTransportState {
    connected: bool,
    /// Queue of data to be received
    receive_queue: VecDeque<Vec<u8>>,
    /// History of sent data
    sent_data: Vec<Vec<u8>>,
    clear_calls: usize,
    should_fail_connection: bool,
    should_fail_send: bool,
    should_fail_receive: bool,
    stats: TransportStats,
}

impl MockTransportState {
    fn new() -> Self {
        Self {
            connected: false,
            receive_queue: VecDeque::new(),
            sent_data: Vec::new(),
            clear_calls: 0,
            should_fail_connection: false,
            should_fail_send: false,
            should_fail_receive: false,
            stats: TransportStats::new(),
        }
    }
}

/// Mock transport implementation
#[derive(Debug, Clone)]
pub struct MockTransport {
    config: MockTransportConfig,
    state: Arc<RwLock<MockTransportState>>,
    start_time: SystemTime,
}

impl MockTransport {
    pub fn new(config: MockTransportConfig) -> Result<Self, TransportError> {
        config.validate()?;

        let mut state = MockTransportState::new();
        if config.auto_connect {
            state.connected = true;
            state.stats.record_connection_attempt();
            state.stats.record_successful_connection();
        }

        Ok(Self {
            config,
            state: Arc::new(RwLock::new(state)),
            start_time: SystemTime::now(),
        })
    }

    /// Connected mock with default settings
    pub fn connected() -> Self {
        Self {
            config: MockTransportConfig::default(),
            state: Arc::new(RwLock::new({
                let mut state = MockTransportState::new();
                state.connected = true;
                state.stats.record_successful_connection();
                state
            })),
            start_time: SystemTime::now(),
        }
    }

    /// Queue raw bytes to be handed out by the next `receive`
    pub async fn add_receive_data(&self, data: Vec<u8>) {
        self.state.write().await.receive_queue.push_back(data);
    }

    /// Queue a reply line
    pub async fn add_response(&self, line: &str) {
        self.add_receive_data(line.as_bytes().to_vec()).await;
    }

    /// Sent data as text, one entry per `send`
    pub async fn sent_frames(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .sent_data
            .iter()
            .map(|d| String::from_utf8_lossy(d).into_owned())
            .collect()
    }

    pub async fn pending_responses(&self) -> usize {
        self.state.read().await.receive_queue.len()
    }

    pub async fn clear_calls(&self) -> usize {
        self.state.read().await.clear_calls
    }

    pub async fn set_connection_failure(&self, should_fail: bool) {
        self.state.write().await.should_fail_connection = should_fail;
    }

    pub async fn set_send_failure(&self, should_fail: bool) {
        self.state.write().await.should_fail_send = should_fail;
    }

    pub async fn set_receive_failure(&self, should_fail: bool) {
        self.state.write().await.should_fail_receive = should_fail;
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn transport_type(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.write().await;
        state.stats.record_connection_attempt();

        if state.should_fail_connection {
            state.stats.record_failed_connection();
            return Err(TransportError::ConnectionFailed(
                "Mock connection failure".to_string(),
            ));
        }

        state.connected = true;
        state.stats.record_successful_connection();
        debug!("Mock transport connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.write().await;
        if state.connected {
            state.connected = false;
            state.stats.record_disconnection();
            debug!("Mock transport disconnected");
        }
        Ok(())
    }

    async fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let mut state = self.state.write().await;

        if !state.connected {
            return Err(TransportError::SendFailed("Not connected".to_string()));
        }

        if state.should_fail_send {
            state.stats.connection_state = ConnectionState::Error;
            return Err(TransportError::SendFailed("Mock send failure".to_string()));
        }

        state.sent_data.push(data.to_vec());
        state.stats.record_bytes_sent(data.len());

        debug!("Mock transport sent {} bytes", data.len());
        Ok(data.len())
    }

    async fn receive(
        &mut self,
        buffer: &mut [u8],
        _timeout: Option<Duration>,
    ) -> Result<usize, TransportError> {
        let mut state = self.state.write().await;

        if !state.connected {
            return Err(TransportError::ReceiveFailed("Not connected".to_string()));
        }

        if state.should_fail_receive {
            state.stats.connection_state = ConnectionState::Error;
            return Err(TransportError::ReceiveFailed(
                "Mock receive failure".to_string(),
            ));
        }

        let Some(mut data) = state.receive_queue.pop_front() else {
            // No data available
            return Ok(0);
        };

        let bytes_to_copy = data.len().min(buffer.len());
        buffer[..bytes_to_copy].copy_from_slice(&data[..bytes_to_copy]);
        if bytes_to_copy < data.len() {
            // hand out the rest on the next call
            let rest = data.split_off(bytes_to_copy);
            state.receive_queue.push_front(rest);
        }
        state.stats.record_bytes_received(bytes_to_copy);

        debug!("Mock transport received {} bytes", bytes_to_copy);
        Ok(bytes_to_copy)
    }

    async fn clear(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.write().await;
        state.clear_calls += 1;
        let discarded: usize = state.receive_queue.drain(..).map(|d| d.len()).sum();
        state.stats.record_bytes_discarded(discarded);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.state.read().await.connected
    }

    async fn stats(&self) -> TransportStats {
        let mut stats = self.state.read().await.stats.clone();
        if let Ok(elapsed) = self.start_time.elapsed() {
            stats.uptime = elapsed;
        }
        stats
    }
}
