//! Frame parser
//!
//! Turns received text into an immutable [`Message`] whose fields are extracted once
//! at parse time. Decoding the payload is deferred to [`Message::value`] because only
//! the caller knows which kind of value the parameter holds.

use crate::constants::{
    ADDRESS_WIDTH, DEVICE_ERROR_PREFIX, MIN_FRAME_LEN, PAYLOAD_OFFSET, REPLY_MARKER,
    REQUEST_MARKER, SEQUENCE_WIDTH, TERMINATOR, TRAILER_LEN,
};
use crate::error::{MeComError, Result};
use crate::value::{Value, ValueKind};
use std::fmt;
use tracing::debug;

/// Error reported by a device instead of a regular reply (`+XX` payload)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceError {
    pub code: u8,
}

impl DeviceError {
    pub fn description(&self) -> &'static str {
        match self.code {
            0x01 => "Command not available",
            0x02 => "Device is busy",
            0x03 => "General communication error",
            0x04 => "Format error",
            0x05 => "Parameter not available",
            0x06 => "Parameter is read only",
            0x07 => "Value out of range",
            0x08 => "Instance not available",
            0x09 => "Parameter general failure",
            _ => "Unknown error",
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device error {:02X}: {}", self.code, self.description())
    }
}

/// A parsed MeCom frame (request or reply)
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    raw: String,
    marker: char,
    device_addr: u8,
    seq_num: u16,
    payload: String,
    checksum: String,
    value_kind: ValueKind,
}

impl Message {
    /// Parse `raw` as a frame whose payload holds a value of `value_kind`
    pub fn parse(raw: &str, value_kind: ValueKind) -> Result<Self> {
        if !raw.is_ascii() {
            return Err(MeComError::parse("frame contains non-ASCII characters"));
        }

        let len = raw.len();
        if len < MIN_FRAME_LEN {
            return Err(MeComError::parse(format!(
                "frame too short: {} characters, need at least {}",
                len, MIN_FRAME_LEN
            )));
        }

        let marker = raw.chars().next().unwrap_or_default();
        if marker != REQUEST_MARKER && marker != REPLY_MARKER {
            return Err(MeComError::parse(format!(
                "frame must start with '{}' or '{}', got {:?}",
                REQUEST_MARKER, REPLY_MARKER, marker
            )));
        }

        if !raw.ends_with(TERMINATOR) {
            return Err(MeComError::parse("frame is not terminated by CR"));
        }

        let addr_field = &raw[1..1 + ADDRESS_WIDTH];
        let seq_field = &raw[1 + ADDRESS_WIDTH..PAYLOAD_OFFSET];
        let device_addr = parse_hex_field("device address", addr_field)? as u8;
        let seq_num = parse_hex_field("sequence number", seq_field)? as u16;
        debug_assert_eq!(seq_field.len(), SEQUENCE_WIDTH);

        let payload = raw[PAYLOAD_OFFSET..len - TRAILER_LEN].to_string();
        let checksum = raw[len - TRAILER_LEN..len - 1].to_string();

        debug!(
            "Parsed MeCom frame: addr={:02X}, seq={:04X}, payload={:?}, checksum={}",
            device_addr, seq_num, payload, checksum
        );

        Ok(Self {
            raw: raw.to_string(),
            marker,
            device_addr,
            seq_num,
            payload,
            checksum,
            value_kind,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Everything the checksum covers: marker through the end of the payload
    pub fn body(&self) -> &str {
        &self.raw[..self.raw.len() - TRAILER_LEN]
    }

    pub fn device_addr(&self) -> u8 {
        self.device_addr
    }

    pub fn sequence_number(&self) -> u16 {
        self.seq_num
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    /// Whether this frame was sent by a device (`!` marker)
    pub fn is_reply(&self) -> bool {
        self.marker == REPLY_MARKER
    }

    /// Decode the payload according to the declared value kind
    pub fn value(&self) -> Result<Value> {
        Value::decode(self.value_kind, &self.payload)
    }

    pub fn value_f32(&self) -> Result<f32> {
        match self.value()? {
            Value::Float(v) => Ok(v),
            Value::Int(_) => Err(MeComError::decode("message declared as int, not float")),
        }
    }

    pub fn value_u32(&self) -> Result<u32> {
        match self.value()? {
            Value::Int(v) => Ok(v),
            Value::Float(_) => Err(MeComError::decode("message declared as float, not int")),
        }
    }

    /// Device error carried by this frame, if any
    pub fn device_error(&self) -> Option<DeviceError> {
        let code = self.payload.strip_prefix(DEVICE_ERROR_PREFIX)?;
        if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u8::from_str_radix(code, 16)
            .ok()
            .map(|code| DeviceError { code })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw.escape_debug())
    }
}

fn parse_hex_field(name: &str, field: &str) -> Result<u32> {
    if !field.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(MeComError::parse(format!(
            "{} field '{}' is not hex",
            name, field
        )));
    }
    u32::from_str_radix(field, 16)
        .map_err(|e| MeComError::parse(format!("{} field '{}': {}", name, field, e)))
}
