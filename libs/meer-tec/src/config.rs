//! Driver configuration
//!
//! Layered with figment: serde defaults, then an optional YAML file, then environment
//! variables. Nested keys use `__` in the environment, e.g.
//! `MEERTEC_TRANSPORT__HOST=192.168.1.50`.
//!
//! ```yaml
//! device_addr: 2
//! default_instance: 1
//! transport:
//!   type: tcp
//!   host: 192.168.1.50
//!   port: 10001
//!   timeout_ms: 200
//! ```

use crate::error::{Result, TecError};
use crate::transport::serial::DEFAULT_BAUD_RATE;
use crate::transport::tcp::DEFAULT_TCP_PORT;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use mecom::DeviceAddress;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "MEERTEC_";

/// Complete driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TecConfig {
    #[serde(default = "default_device_addr")]
    pub device_addr: DeviceAddress,
    /// Instance (channel) used when a command does not name one
    #[serde(default = "default_instance")]
    pub default_instance: u8,
    #[serde(default)]
    pub transport: TransportSettings,
}

fn default_device_addr() -> DeviceAddress {
    DeviceAddress::from(1)
}

fn default_instance() -> u8 {
    1
}

/// How to reach the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportSettings {
    /// Ethernet-to-serial bridge
    Tcp {
        host: String,
        #[serde(default = "default_tcp_port")]
        port: u16,
        #[serde(default = "default_tcp_timeout_ms")]
        timeout_ms: u64,
    },
    /// Local serial/USB port
    Serial {
        port: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
        #[serde(default = "default_serial_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_tcp_port() -> u16 {
    DEFAULT_TCP_PORT
}

fn default_tcp_timeout_ms() -> u64 {
    200
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_serial_timeout_ms() -> u64 {
    1000
}

impl TransportSettings {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        TransportSettings::Tcp {
            host: host.into(),
            port,
            timeout_ms: default_tcp_timeout_ms(),
        }
    }

    pub fn serial(port: impl Into<String>) -> Self {
        TransportSettings::Serial {
            port: port.into(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_serial_timeout_ms(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TransportSettings::Tcp { .. } => "tcp",
            TransportSettings::Serial { .. } => "serial",
        }
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        TransportSettings::tcp("127.0.0.1", DEFAULT_TCP_PORT)
    }
}

impl Default for TecConfig {
    fn default() -> Self {
        Self {
            device_addr: default_device_addr(),
            default_instance: default_instance(),
            transport: TransportSettings::default(),
        }
    }
}

impl TecConfig {
    /// Load from an optional YAML file plus `MEERTEC_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, ENV_PREFIX)
    }

    /// Same as [`TecConfig::load`] with a custom environment prefix
    pub fn load_with_env(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(path) = path {
            if !path.exists() {
                return Err(TecError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            debug!("Loading TEC configuration from {}", path.display());
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment.merge(Env::prefixed(env_prefix).split("__"));

        let config: TecConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document (no environment overlay)
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: TecConfig = Figment::new().merge(Yaml::string(text)).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| TecError::config(format!("Failed to serialize config: {e}")))
    }

    /// Check values serde cannot express
    pub fn validate(&self) -> Result<()> {
        match &self.transport {
            TransportSettings::Tcp {
                host,
                port,
                timeout_ms,
            } => {
                if host.is_empty() {
                    return Err(TecError::config("transport.host cannot be empty"));
                }
                if *port == 0 {
                    return Err(TecError::config("transport.port cannot be zero"));
                }
                if *timeout_ms == 0 {
                    return Err(TecError::config("transport.timeout_ms must be greater than zero"));
                }
            },
            TransportSettings::Serial {
                port,
                baud_rate,
                timeout_ms,
            } => {
                if port.is_empty() {
                    return Err(TecError::config("transport.port cannot be empty"));
                }
                if *baud_rate == 0 {
                    return Err(TecError::config("transport.baud_rate must be greater than zero"));
                }
                if *timeout_ms == 0 {
                    return Err(TecError::config("transport.timeout_ms must be greater than zero"));
                }
            },
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TecConfig::default();
        assert_eq!(config.device_addr.value(), 1);
        assert_eq!(config.default_instance, 1);
        assert_eq!(config.transport.kind(), "tcp");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_tcp_defaults_filled() {
        let config = TecConfig::from_yaml(
            r#"
device_addr: 2
transport:
  type: tcp
  host: 192.168.1.50
"#,
        )
        .unwrap();
        assert_eq!(config.device_addr.value(), 2);
        assert_eq!(
            config.transport,
            TransportSettings::Tcp {
                host: "192.168.1.50".to_string(),
                port: 10001,
                timeout_ms: 200,
            }
        );
    }

    #[test]
    fn test_from_yaml_serial() {
        let config = TecConfig::from_yaml(
            r#"
transport:
  type: serial
  port: /dev/ttyUSB0
"#,
        )
        .unwrap();
        assert_eq!(config.transport, TransportSettings::serial("/dev/ttyUSB0"));
        if let TransportSettings::Serial {
            baud_rate,
            timeout_ms,
            ..
        } = config.transport
        {
            assert_eq!(baud_rate, 57600);
            assert_eq!(timeout_ms, 1000);
        }
    }

    #[test]
    fn test_address_out_of_range_rejected() {
        let result = TecConfig::from_yaml("device_addr: 300\n");
        assert!(matches!(result, Err(TecError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = TecConfig::default();
        config.transport = TransportSettings::Tcp {
            host: "10.0.0.2".to_string(),
            port: 0,
            timeout_ms: 200,
        };
        assert!(config.validate().is_err());

        config.transport = TransportSettings::Serial {
            port: "COM3".to_string(),
            baud_rate: 0,
            timeout_ms: 1000,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = TecConfig {
            device_addr: DeviceAddress::from(7),
            default_instance: 2,
            transport: TransportSettings::serial("/dev/ttyACM0"),
        };
        let text = config.to_yaml().unwrap();
        assert!(text.contains("type: serial"));
        assert_eq!(TecConfig::from_yaml(&text).unwrap(), config);
    }
}
