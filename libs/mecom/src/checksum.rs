//! Frame checksum
//!
//! CRC-CCITT in its XModem flavour: polynomial 0x1021, initial value 0x0000,
//! no reflection, no final XOR. Computed over the raw ASCII bytes of the frame from
//! the start marker through the end of the payload.

use crc::{Crc, CRC_16_XMODEM};

const CRC_XMODEM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Raw 16-bit checksum of `body`
pub fn checksum_u16(body: &str) -> u16 {
    CRC_XMODEM.checksum(body.as_bytes())
}

/// Checksum of `body` as 4 uppercase hex digits
pub fn checksum(body: &str) -> String {
    format!("{:04X}", checksum_u16(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_known_frames() {
        assert_eq!(checksum("#7BEF32VS03E8E641C8CCCD"), "E2C1");
        assert_eq!(checksum("#7BEF32?VR03E8E6"), "9AAD");
        assert_eq!(checksum("#E6EA5FVS07E57B00000019"), "58B0");
        assert_eq!(checksum("#E6EA5F?VR07E57B"), "B3B5");
        assert_eq!(checksum("#7B3039RS"), "B5BB");
    }

    #[test]
    fn test_checksum_check_value() {
        // Standard CRC-16/XMODEM check value
        assert_eq!(checksum_u16("123456789"), 0x31C3);
    }

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum(""), "0000");
    }

    #[test]
    fn test_checksum_deterministic() {
        let body = "#010001?VR03E801";
        assert_eq!(checksum(body), checksum(body));
    }

    #[test]
    fn test_checksum_single_char_change() {
        let body = "#7BEF32VS03E8E641C8CCCD";
        let original = checksum(body);
        for i in 1..body.len() {
            let mut bytes = body.as_bytes().to_vec();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            let altered = String::from_utf8(bytes).unwrap_or_default();
            assert_ne!(checksum(&altered), original, "position {i}");
        }
    }

    #[test]
    fn test_checksum_is_zero_padded_uppercase() {
        for body in ["#00", "#0A", "abc", "#FF0000RS"] {
            let sum = checksum(body);
            assert_eq!(sum.len(), 4);
            assert!(sum
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }
}
