//! Meerstetter TEC Driver
//!
//! Async driver for Meerstetter thermoelectric cooler controllers (TEC-1091, TEC-1122,
//! ...) speaking MeCom over a TCP serial bridge or a local serial/USB port.
//!
//! ```no_run
//! use meer_tec::{create_transport, Tec, TecConfig};
//!
//! # async fn demo() -> meer_tec::Result<()> {
//! let config = TecConfig::load(None)?;
//! let transport = create_transport(&config.transport)?;
//! let mut tec = Tec::new(transport, config.device_addr);
//! tec.connect().await?;
//!
//! let temp = tec.object_temperature(1).await?;
//! tec.set_target_object_temperature(temp + 1.0, 1).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod parameters;
pub mod tec;
pub mod transport;

pub use config::{TecConfig, TransportSettings};
pub use error::{Result, TecError};
pub use parameters::{Access, ParameterSpec};
pub use tec::{DeviceInfo, PidParameters, Tec};
pub use transport::{create_transport, Transport, TransportError, TransportStats};

pub use mecom;
