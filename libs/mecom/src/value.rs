//! Value codec
//!
//! Parameter values travel as exactly 8 uppercase hex digits.
//!
//! - Float: the IEEE-754 single precision bit pattern. Firmware expects the word
//!   obtained by packing the float little-endian and reading those bytes back as a
//!   little-endian `u32`, rendered most significant digit first. That is the plain
//!   bit pattern, e.g. `25.1` -> `41C8CCCD`.
//! - Int: the unsigned 32-bit value, zero padded. Signed values use two's complement.

use crate::constants::VALUE_WIDTH;
use crate::error::{MeComError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared type of a parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Float,
    Int,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Float => write!(f, "float"),
            ValueKind::Int => write!(f, "int"),
        }
    }
}

impl FromStr for ValueKind {
    type Err = MeComError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "float" | "f32" => Ok(ValueKind::Float),
            "int" | "u32" | "i32" => Ok(ValueKind::Int),
            other => Err(MeComError::validation(format!(
                "unknown value kind '{}', expected float or int",
                other
            ))),
        }
    }
}

/// A parameter value tagged with its kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Float(f32),
    Int(u32),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Float(_) => ValueKind::Float,
            Value::Int(_) => ValueKind::Int,
        }
    }

    /// Encode as the 8 hex digit payload field
    pub fn encode(&self) -> String {
        match self {
            Value::Float(v) => encode_float(*v),
            Value::Int(v) => encode_int(*v),
        }
    }

    /// Decode a payload field according to `kind`
    pub fn decode(kind: ValueKind, hex: &str) -> Result<Self> {
        match kind {
            ValueKind::Float => decode_float(hex).map(Value::Float),
            ValueKind::Int => decode_int(hex).map(Value::Int),
        }
    }

    /// Parse user-supplied text (decimal) into a value of `kind`
    ///
    /// Integers accept negative numbers down to `i32::MIN` (sent as two's complement)
    /// and positive numbers up to `u32::MAX`.
    pub fn parse(kind: ValueKind, text: &str) -> Result<Self> {
        let text = text.trim();
        match kind {
            ValueKind::Float => text.parse::<f32>().map(Value::Float).map_err(|e| {
                MeComError::validation(format!("invalid float value '{}': {}", text, e))
            }),
            ValueKind::Int => {
                let wide = text.parse::<i64>().map_err(|e| {
                    MeComError::validation(format!("invalid int value '{}': {}", text, e))
                })?;
                if wide < i64::from(i32::MIN) || wide > i64::from(u32::MAX) {
                    return Err(MeComError::validation(format!(
                        "int value {} does not fit in 32 bits",
                        wide
                    )));
                }
                Ok(Value::Int(wide as u32))
            },
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(_) => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(_) => None,
        }
    }

    /// Integer value reinterpreted as two's complement
    pub fn as_i32(&self) -> Option<i32> {
        self.as_u32().map(|v| v as i32)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as u32)
    }
}

/// Native types that can be carried in a parameter payload
///
/// Lets callers pick the value kind at compile time:
/// `tec.get_parameter::<f32>(1000, 1)`.
pub trait ParameterValue: Copy + Send + Sync + 'static {
    const KIND: ValueKind;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

impl ParameterValue for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_f32()
    }
}

impl ParameterValue for u32 {
    const KIND: ValueKind = ValueKind::Int;

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_u32()
    }
}

impl ParameterValue for i32 {
    const KIND: ValueKind = ValueKind::Int;

    fn into_value(self) -> Value {
        Value::Int(self as u32)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_i32()
    }
}

/// Encode a float as 8 uppercase hex digits
pub fn encode_float(value: f32) -> String {
    // little-endian pack, read back as little-endian word: the raw bit pattern
    let word = u32::from_le_bytes(value.to_le_bytes());
    format!("{:08X}", word)
}

/// Encode an unsigned integer as 8 uppercase hex digits
pub fn encode_int(value: u32) -> String {
    format!("{:08X}", value)
}

/// Decode 8 hex digits as a big-endian word reinterpreted as IEEE-754
pub fn decode_float(hex: &str) -> Result<f32> {
    parse_word(hex).map(f32::from_bits)
}

/// Decode 8 hex digits as an unsigned integer
pub fn decode_int(hex: &str) -> Result<u32> {
    parse_word(hex)
}

fn parse_word(hex: &str) -> Result<u32> {
    if hex.len() != VALUE_WIDTH {
        return Err(MeComError::decode(format!(
            "expected {} hex digits, got {} ('{}')",
            VALUE_WIDTH,
            hex.len(),
            hex
        )));
    }
    // from_str_radix would also accept a leading '+'
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(MeComError::decode(format!("'{}' is not valid hex", hex)));
    }
    u32::from_str_radix(hex, 16)
        .map_err(|e| MeComError::decode(format!("'{}' is not valid hex: {}", hex, e)))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_encode_float_known_values() {
        assert_eq!(encode_float(25.1), "41C8CCCD");
        assert_eq!(encode_float(1.0), "3F800000");
        assert_eq!(encode_float(-2.5), "C0200000");
    }

    #[test]
    fn test_encode_float_zero_is_padded() {
        assert_eq!(encode_float(0.0), "00000000");
        assert_eq!(encode_float(f32::MIN_POSITIVE), "00800000");
    }

    #[test]
    fn test_encode_int() {
        assert_eq!(encode_int(25), "00000019");
        assert_eq!(encode_int(0), "00000000");
        assert_eq!(encode_int(u32::MAX), "FFFFFFFF");
    }

    #[test]
    fn test_decode_float() {
        assert_eq!(decode_float("41C8CCCD").unwrap(), 25.1);
        assert_eq!(decode_float("41c8cccd").unwrap(), 25.1);
        assert_eq!(decode_float("00000000").unwrap(), 0.0);
    }

    #[test]
    fn test_decode_int() {
        assert_eq!(decode_int("00000019").unwrap(), 25);
        assert_eq!(decode_int("FFFFFFFF").unwrap(), u32::MAX);
    }

    #[test]
    fn test_decode_rejects_bad_width() {
        assert!(matches!(decode_int("19"), Err(MeComError::Decode(_))));
        assert!(matches!(decode_float("41C8CCCD00"), Err(MeComError::Decode(_))));
        assert!(matches!(decode_float(""), Err(MeComError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_non_hex() {
        assert!(matches!(decode_int("0000001G"), Err(MeComError::Decode(_))));
        assert!(matches!(decode_int("+0000019"), Err(MeComError::Decode(_))));
        assert!(matches!(decode_float("-3F80000"), Err(MeComError::Decode(_))));
    }

    #[test]
    fn test_float_bit_exact() {
        for v in [
            0.0f32,
            -0.0,
            25.1,
            -273.15,
            f32::MAX,
            f32::MIN,
            f32::EPSILON,
            f32::INFINITY,
            f32::NEG_INFINITY,
            1.0e-40, // subnormal
        ] {
            let back = decode_float(&encode_float(v)).unwrap();
            assert_eq!(back.to_bits(), v.to_bits(), "value {v}");
        }
    }

    #[test]
    fn test_float_nan_keeps_nan() {
        let back = decode_float(&encode_float(f32::NAN)).unwrap();
        assert!(back.is_nan());
    }

    #[test]
    fn test_signed_two_complement() {
        assert_eq!(Value::from(-1i32).encode(), "FFFFFFFF");
        assert_eq!(
            Value::decode(ValueKind::Int, "FFFFFFFE").unwrap().as_i32(),
            Some(-2)
        );
        assert_eq!(i32::from_value(Value::Int(0x8000_0000)), Some(i32::MIN));
    }

    #[test]
    fn test_value_kind_parse() {
        assert_eq!("float".parse::<ValueKind>().unwrap(), ValueKind::Float);
        assert_eq!("INT".parse::<ValueKind>().unwrap(), ValueKind::Int);
        assert!("double".parse::<ValueKind>().is_err());
    }

    #[test]
    fn test_value_parse_user_input() {
        assert_eq!(
            Value::parse(ValueKind::Float, "25.1").unwrap(),
            Value::Float(25.1)
        );
        assert_eq!(Value::parse(ValueKind::Int, " 25 ").unwrap(), Value::Int(25));
        assert_eq!(
            Value::parse(ValueKind::Int, "-1").unwrap(),
            Value::Int(u32::MAX)
        );
        assert!(Value::parse(ValueKind::Int, "4294967296").is_err());
        assert!(Value::parse(ValueKind::Int, "2.5").is_err());
        assert!(Value::parse(ValueKind::Float, "warm").is_err());
    }

    #[test]
    fn test_parameter_value_kinds() {
        assert_eq!(<f32 as ParameterValue>::KIND, ValueKind::Float);
        assert_eq!(<u32 as ParameterValue>::KIND, ValueKind::Int);
        assert_eq!(<i32 as ParameterValue>::KIND, ValueKind::Int);
        assert_eq!(f32::from_value(Value::Int(1)), None);
        assert_eq!(u32::from_value(Value::Float(1.0)), None);
    }
}
