//! Frame builder
//!
//! Assembles complete request frames:
//!
//! ```text
//! # AA SSSS VS  PPPP II VVVVVVVV CCCC \r   parameter write
//! # AA SSSS ?VR PPPP II          CCCC \r   parameter read
//! # AA SSSS RS                   CCCC \r   device reset
//! ```

use crate::checksum::checksum;
use crate::constants::{
    CMD_READ_VALUE, CMD_RESET, CMD_SET_VALUE, MAX_DEVICE_ADDRESS, REQUEST_MARKER, TERMINATOR,
};
use crate::error::{MeComError, Result};
use crate::message::Message;
use crate::sequence::SequenceNumber;
use crate::value::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Device address on the MeCom bus (0 broadcasts to every device)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    pub const BROADCAST: DeviceAddress = DeviceAddress(0);

    /// Validate a caller-supplied address
    pub fn new(value: i64) -> Result<Self> {
        if !(0..=MAX_DEVICE_ADDRESS).contains(&value) {
            return Err(MeComError::validation(format!(
                "device_addr must be between 0 and {}, got {}",
                MAX_DEVICE_ADDRESS, value
            )));
        }
        Ok(Self(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_broadcast(self) -> bool {
        self.0 == 0
    }
}

impl From<u8> for DeviceAddress {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<DeviceAddress> for u8 {
    fn from(addr: DeviceAddress) -> Self {
        addr.0
    }
}

impl TryFrom<i64> for DeviceAddress {
    type Error = MeComError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

/// What a request asks the device to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `?VR`: read a parameter value
    ReadValue { param_id: u16, instance: u8 },
    /// `VS`: set a parameter value
    SetValue {
        param_id: u16,
        instance: u8,
        value: Value,
    },
    /// `RS`: reset the device
    Reset,
}

impl Command {
    pub fn code(&self) -> &'static str {
        match self {
            Command::ReadValue { .. } => CMD_READ_VALUE,
            Command::SetValue { .. } => CMD_SET_VALUE,
            Command::Reset => CMD_RESET,
        }
    }

    /// Kind of value the reply to this command carries
    ///
    /// A reset carries none; `Int` is used so a parsed reply is still well defined.
    pub fn value_kind(&self, read_kind: ValueKind) -> ValueKind {
        match self {
            Command::ReadValue { .. } => read_kind,
            Command::SetValue { value, .. } => value.kind(),
            Command::Reset => ValueKind::Int,
        }
    }

    fn write_payload(&self, out: &mut String) {
        out.push_str(self.code());
        match self {
            Command::ReadValue { param_id, instance } => {
                out.push_str(&format!("{:04X}{:02X}", param_id, instance));
            },
            Command::SetValue {
                param_id,
                instance,
                value,
            } => {
                out.push_str(&format!("{:04X}{:02X}", param_id, instance));
                out.push_str(&value.encode());
            },
            Command::Reset => {},
        }
    }
}

/// A complete, checksummed request frame ready to be written to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    text: String,
    device_addr: DeviceAddress,
    seq_num: SequenceNumber,
    command: Command,
}

impl Frame {
    /// Build a frame; `None` draws a random sequence number
    pub fn new(
        device_addr: DeviceAddress,
        seq_num: Option<SequenceNumber>,
        command: Command,
    ) -> Self {
        let seq_num = seq_num.unwrap_or_else(SequenceNumber::random);

        let mut body = String::with_capacity(32);
        body.push(REQUEST_MARKER);
        body.push_str(&format!("{}{}", device_addr, seq_num));
        command.write_payload(&mut body);

        let sum = checksum(&body);
        let mut text = body;
        text.push_str(&sum);
        text.push(TERMINATOR);

        debug!(
            "Building MeCom frame: addr={}, seq={}, cmd={}, frame={:?}",
            device_addr,
            seq_num,
            command.code(),
            text
        );

        Self {
            text,
            device_addr,
            seq_num,
            command,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn device_addr(&self) -> DeviceAddress {
        self.device_addr
    }

    pub fn sequence_number(&self) -> SequenceNumber {
        self.seq_num
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Parse this frame back into a [`Message`] for verification
    pub fn to_message(&self, kind: ValueKind) -> Result<Message> {
        Message::parse(&self.text, kind)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text.escape_debug())
    }
}

impl AsRef<str> for Frame {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Build a parameter read (`?VR`) frame
pub fn build_read(
    device_addr: DeviceAddress,
    param_id: u16,
    instance: u8,
    seq_num: Option<SequenceNumber>,
) -> Frame {
    Frame::new(device_addr, seq_num, Command::ReadValue { param_id, instance })
}

/// Build a parameter write (`VS`) frame; the value's kind selects its encoding
pub fn build_write(
    device_addr: DeviceAddress,
    param_id: u16,
    instance: u8,
    value: Value,
    seq_num: Option<SequenceNumber>,
) -> Frame {
    Frame::new(
        device_addr,
        seq_num,
        Command::SetValue {
            param_id,
            instance,
            value,
        },
    )
}

/// Build a device reset (`RS`) frame
pub fn build_reset(device_addr: DeviceAddress, seq_num: Option<SequenceNumber>) -> Frame {
    Frame::new(device_addr, seq_num, Command::Reset)
}
