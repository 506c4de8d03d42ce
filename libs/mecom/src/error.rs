//! MeCom Error Types
//!
//! One variant per failure class of the codec. Transport failures never appear here;
//! they belong to the transport layer and are passed through by the driver.

use std::fmt;
use thiserror::Error;

/// Result type for mecom operations
pub type Result<T> = std::result::Result<T, MeComError>;

/// Codec errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeComError {
    /// A caller-supplied field is out of range; nothing was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Received text does not have the shape of a frame
    #[error("Parse error: {0}")]
    Parse(String),

    /// Payload is not valid hex of the width the value kind requires
    #[error("Decode error: {0}")]
    Decode(String),

    /// Frame parsed but is not the authentic answer to the request
    #[error("Verification failed: {0}")]
    Verification(VerificationFailure),
}

/// Why a parsed response was rejected by the verifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    /// Trailing checksum does not match the recomputed one
    ChecksumMismatch { expected: String, received: String },
    /// Response carries a different sequence number than the request
    SequenceMismatch { expected: u16, received: u16 },
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationFailure::ChecksumMismatch { expected, received } => write!(
                f,
                "checksum mismatch: expected {}, received {}",
                expected, received
            ),
            VerificationFailure::SequenceMismatch { expected, received } => write!(
                f,
                "sequence number mismatch: expected {:04X}, received {:04X}",
                expected, received
            ),
        }
    }
}

// Helper methods for creating errors
impl MeComError {
    pub fn validation(msg: impl Into<String>) -> Self {
        MeComError::Validation(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        MeComError::Parse(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        MeComError::Decode(msg.into())
    }

    /// Whether resending with a fresh sequence number may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, MeComError::Verification(_) | MeComError::Parse(_))
    }
}

impl From<VerificationFailure> for MeComError {
    fn from(failure: VerificationFailure) -> Self {
        MeComError::Verification(failure)
    }
}
