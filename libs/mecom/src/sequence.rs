//! Sequence numbers
//!
//! A sequence number only correlates one reply with the request just sent. It is not
//! an ordering or anti-replay mechanism, so any source of 16-bit values will do. The
//! source is always explicit: frame builders draw a random one only when the caller
//! passes `None`, and the driver owns an injected [`SequenceSource`].

use crate::constants::MAX_SEQUENCE_NUMBER;
use crate::error::{MeComError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request/response correlation token (0..=65535)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u16")]
pub struct SequenceNumber(u16);

impl SequenceNumber {
    /// Validate a caller-supplied number
    pub fn new(value: i64) -> Result<Self> {
        if !(0..=MAX_SEQUENCE_NUMBER).contains(&value) {
            return Err(MeComError::validation(format!(
                "seq_num must be between 0 and {}, got {}",
                MAX_SEQUENCE_NUMBER, value
            )));
        }
        Ok(Self(value as u16))
    }

    /// Uniformly random sequence number
    pub fn random() -> Self {
        Self(rand::thread_rng().gen::<u16>())
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

impl From<u16> for SequenceNumber {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<SequenceNumber> for u16 {
    fn from(seq: SequenceNumber) -> Self {
        seq.0
    }
}

impl TryFrom<i64> for SequenceNumber {
    type Error = MeComError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

/// Supplier of sequence numbers for consecutive requests
pub trait SequenceSource: Send + fmt::Debug {
    fn next_sequence(&mut self) -> SequenceNumber;
}

/// Uniform random numbers, the default for real devices
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSequence;

impl SequenceSource for RandomSequence {
    fn next_sequence(&mut self) -> SequenceNumber {
        SequenceNumber::random()
    }
}

/// Incrementing counter, wraps from 0xFFFF to 0x0000
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingSequence {
    next: u16,
}

impl CountingSequence {
    pub fn starting_at(start: u16) -> Self {
        Self { next: start }
    }
}

impl SequenceSource for CountingSequence {
    fn next_sequence(&mut self) -> SequenceNumber {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        SequenceNumber(id)
    }
}

/// Always the same number, for reproducible frames
#[derive(Debug, Clone, Copy)]
pub struct FixedSequence(pub SequenceNumber);

impl SequenceSource for FixedSequence {
    fn next_sequence(&mut self) -> SequenceNumber {
        self.0
    }
}

impl<S: SequenceSource + ?Sized> SequenceSource for Box<S> {
    fn next_sequence(&mut self) -> SequenceNumber {
        self.as_mut().next_sequence()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_sequence_bounds() {
        assert_eq!(SequenceNumber::new(0).unwrap().value(), 0);
        assert_eq!(SequenceNumber::new(65535).unwrap().value(), 65535);
        assert!(matches!(
            SequenceNumber::new(65536),
            Err(MeComError::Validation(_))
        ));
        assert!(matches!(
            SequenceNumber::new(-1),
            Err(MeComError::Validation(_))
        ));
    }

    #[test]
    fn test_sequence_display() {
        assert_eq!(SequenceNumber::from(61234).to_string(), "EF32");
        assert_eq!(SequenceNumber::from(1).to_string(), "0001");
    }

    #[test]
    fn test_counting_sequence_wraps() {
        let mut source = CountingSequence::starting_at(0xFFFF);
        assert_eq!(source.next_sequence().value(), 0xFFFF);
        assert_eq!(source.next_sequence().value(), 0x0000);
        assert_eq!(source.next_sequence().value(), 0x0001);
    }

    #[test]
    fn test_fixed_sequence() {
        let mut source = FixedSequence(SequenceNumber::from(42));
        assert_eq!(source.next_sequence(), source.next_sequence());
    }

    #[test]
    fn test_boxed_source() {
        let mut source: Box<dyn SequenceSource> = Box::new(CountingSequence::starting_at(7));
        assert_eq!(source.next_sequence().value(), 7);
        assert_eq!(source.next_sequence().value(), 8);
    }

    #[test]
    fn test_random_sequence_varies() {
        let mut source = RandomSequence;
        let draws: std::collections::HashSet<u16> =
            (0..64).map(|_| source.next_sequence().value()).collect();
        assert!(draws.len() > 1);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        assert!(SequenceNumber::try_from(70000i64).is_err());
        assert_eq!(SequenceNumber::try_from(12345i64).unwrap().value(), 12345);
    }
}
