//! TEC Driver Error Types

use crate::transport::TransportError;
use mecom::{DeviceError, MeComError};
use thiserror::Error;

/// Result type for meer-tec operations
pub type Result<T> = std::result::Result<T, TecError>;

/// Driver errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TecError {
    /// Frame could not be built, parsed, decoded or verified
    #[error(transparent)]
    Protocol(#[from] MeComError),

    /// Link failure, passed through unchanged
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The device answered with an error frame
    #[error("Device error {code:02X}: {description}")]
    Device { code: u8, description: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Name or id not present in the parameter catalog
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// Write attempted on a read-only catalog entry
    #[error("Parameter is read only: {0}")]
    ReadOnly(String),
}

impl From<DeviceError> for TecError {
    fn from(err: DeviceError) -> Self {
        TecError::Device {
            code: err.code,
            description: err.description().to_string(),
        }
    }
}

impl From<figment::Error> for TecError {
    fn from(err: figment::Error) -> Self {
        TecError::Config(err.to_string())
    }
}

// Helper methods for creating errors
impl TecError {
    pub fn config(msg: impl Into<String>) -> Self {
        TecError::Config(msg.into())
    }

    pub fn unknown_parameter(msg: impl Into<String>) -> Self {
        TecError::UnknownParameter(msg.into())
    }

    /// Whether sending the request again (with a fresh sequence number) may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TecError::Protocol(e) => e.is_retryable(),
            TecError::Transport(TransportError::Timeout(_)) => true,
            TecError::Device { code, .. } => *code == 0x02, // device busy
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mecom::VerificationFailure;

    #[test]
    fn test_device_error_conversion() {
        let err: TecError = DeviceError { code: 0x06 }.into();
        assert_eq!(err.to_string(), "Device error 06: Parameter is read only");
    }

    #[test]
    fn test_transparent_display() {
        let err: TecError = MeComError::parse("frame too short").into();
        assert_eq!(err.to_string(), "Parse error: frame too short");

        let err: TecError = TransportError::Timeout("no reply".to_string()).into();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_retryable() {
        assert!(TecError::from(TransportError::Timeout("x".to_string())).is_retryable());
        assert!(TecError::from(MeComError::Verification(
            VerificationFailure::SequenceMismatch {
                expected: 1,
                received: 2
            }
        ))
        .is_retryable());
        assert!(TecError::from(DeviceError { code: 0x02 }).is_retryable());
        assert!(!TecError::from(DeviceError { code: 0x05 }).is_retryable());
        assert!(!TecError::ReadOnly("object_temperature".to_string()).is_retryable());
    }
}
