//! Transport Layer Module
//!
//! Separates the physical link from MeCom protocol logic. The driver sends frames,
//! reassembles reply lines with a [`ReplyReader`] and calls [`Transport::clear`] when
//! the link may hold stale input; everything else is session management.
//! [`Transport::query`] is the one-shot form for callers that keep no session state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        Tec driver (mecom frames)            │
//! └─────────────────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌─────────────────────────────────────────────┐
//! │         Transport Interface (Trait)         │
//! │  connect(), send(), receive(), query()      │
//! └─────────────────────────────────────────────┘
//!           │              │              │
//!           ▼              ▼              ▼
//!     ┌──────────┐   ┌──────────┐   ┌──────────┐
//!     │   TCP    │   │  Serial  │   │   Mock   │
//!     │ (XPort)  │   │  (USB)   │   │ (tests)  │
//!     └──────────┘   └──────────┘   └──────────┘
//! ```

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod serial;
pub mod tcp;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockTransport, MockTransportConfig};
pub use serial::{SerialTransport, SerialTransportConfig};
pub use tcp::{TcpTransport, TcpTransportConfig};
pub use traits::{
    ConnectionState, ReplyReader, Transport, TransportConfig, TransportError, TransportStats,
};

use crate::config::TransportSettings;

/// Build an unconnected transport from loaded settings
pub fn create_transport(
    settings: &TransportSettings,
) -> Result<Box<dyn Transport>, TransportError> {
    match settings {
        TransportSettings::Tcp {
            host,
            port,
            timeout_ms,
        } => {
            let config = TcpTransportConfig {
                host: host.clone(),
                port: *port,
                timeout: std::time::Duration::from_millis(*timeout_ms),
                ..TcpTransportConfig::default()
            };
            Ok(Box::new(TcpTransport::new(config)?))
        },
        TransportSettings::Serial {
            port,
            baud_rate,
            timeout_ms,
        } => {
            let config = SerialTransportConfig {
                port: port.clone(),
                baud_rate: *baud_rate,
                timeout: std::time::Duration::from_millis(*timeout_ms),
            };
            Ok(Box::new(SerialTransport::new(config)?))
        },
    }
}
