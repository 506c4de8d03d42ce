//! MeCom Frame Codec
//!
//! Wire-level implementation of Meerstetter's MeCom ASCII protocol used by TEC
//! controllers. This crate only deals with text: it builds request frames, parses
//! received frames and decides whether a received frame is the genuine answer to the
//! request that was just sent. Sockets and serial ports live in `meer-tec`.
//!
//! # Architecture
//!
//! ```text
//! caller ──► frame::build_* ──► request String ──► (transport) ──► raw reply
//!                 │                                                   │
//!                 ├── value::encode_*                                 ▼
//!                 └── checksum::checksum              message::Message::parse
//!                                                                     │
//!                                              verify::verify ◄───────┤
//!                                                                     ▼
//!                                                      value::decode_* ──► caller
//! ```
//!
//! # Wire format
//!
//! ```text
//! #  AA  SSSS  <payload>  CCCC  \r
//! │  │   │     │          │     └─ terminator
//! │  │   │     │          └─ CRC-16/XMODEM over everything before it
//! │  │   │     └─ command code + parameter fields (VS / ?VR / RS)
//! │  │   └─ sequence number, 4 uppercase hex digits
//! │  └─ device address, 2 uppercase hex digits
//! └─ start marker ('#' request, '!' device reply)
//! ```
//!
//! # Example
//!
//! ```
//! use mecom::{build_write, DeviceAddress, SequenceNumber, Value};
//!
//! let frame = build_write(
//!     DeviceAddress::from(123),
//!     1000,
//!     230,
//!     Value::Float(25.1),
//!     Some(SequenceNumber::from(61234)),
//! );
//! assert_eq!(frame.as_str(), "#7BEF32VS03E8E641C8CCCDE2C1\r");
//! ```

pub mod checksum;
pub mod constants;
pub mod error;
pub mod frame;
pub mod message;
pub mod sequence;
pub mod value;
pub mod verify;

pub use checksum::{checksum, checksum_u16};
pub use error::{MeComError, Result, VerificationFailure};
pub use frame::{build_read, build_reset, build_write, Command, DeviceAddress, Frame};
pub use message::{DeviceError, Message};
pub use sequence::{
    CountingSequence, FixedSequence, RandomSequence, SequenceNumber, SequenceSource,
};
pub use value::{
    decode_float, decode_int, encode_float, encode_int, ParameterValue, Value, ValueKind,
};
pub use verify::{verify, verify_strict};
