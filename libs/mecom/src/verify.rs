//! Response verification
//!
//! A reply is accepted only if its trailing checksum matches the one recomputed over
//! its body and it echoes the request's sequence number. The device address and the
//! plausibility of the payload are not checked.

use crate::checksum::checksum;
use crate::error::{Result, VerificationFailure};
use crate::message::Message;
use tracing::warn;

/// Whether `response` is the uncorrupted answer to `request`
pub fn verify(response: &Message, request: &Message) -> bool {
    check(response, request).is_none()
}

/// Like [`verify`], but reports which check failed
pub fn verify_strict(response: &Message, request: &Message) -> Result<()> {
    match check(response, request) {
        None => Ok(()),
        Some(failure) => {
            warn!(
                "Rejected MeCom reply {}: {} (request seq={:04X})",
                response,
                failure,
                request.sequence_number()
            );
            Err(failure.into())
        },
    }
}

fn check(response: &Message, request: &Message) -> Option<VerificationFailure> {
    // exact match, a lowercase checksum is a mismatch
    let expected = checksum(response.body());
    if expected != response.checksum() {
        return Some(VerificationFailure::ChecksumMismatch {
            expected,
            received: response.checksum().to_string(),
        });
    }

    if response.sequence_number() != request.sequence_number() {
        return Some(VerificationFailure::SequenceMismatch {
            expected: request.sequence_number(),
            received: response.sequence_number(),
        });
    }

    None
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::error::MeComError;
    use crate::value::ValueKind;

    const REQUEST: &str = "#7BEF32?VR03E8E69AAD\r";

    fn reply(addr_seq: &str, payload: &str) -> String {
        let body = format!("!{}{}", addr_seq, payload);
        format!("{}{}\r", body, checksum(&body))
    }

    fn request() -> Message {
        Message::parse(REQUEST, ValueKind::Float).unwrap()
    }

    #[test]
    fn test_verify_request_against_itself() {
        let req = request();
        assert!(verify(&req, &req));
    }

    #[test]
    fn test_verify_genuine_reply() {
        let raw = reply("7BEF32", "41C8CCCD");
        let resp = Message::parse(&raw, ValueKind::Float).unwrap();
        assert!(verify(&resp, &request()));
        assert!(verify_strict(&resp, &request()).is_ok());
        assert_eq!(resp.value_f32().unwrap(), 25.1);
    }

    #[test]
    fn test_sequence_mismatch() {
        let raw = reply("7BEF33", "41C8CCCD");
        let resp = Message::parse(&raw, ValueKind::Float).unwrap();
        assert!(!verify(&resp, &request()));
        assert_eq!(
            verify_strict(&resp, &request()),
            Err(MeComError::Verification(
                VerificationFailure::SequenceMismatch {
                    expected: 0xEF32,
                    received: 0xEF33,
                }
            ))
        );
    }

    #[test]
    fn test_device_address_not_checked() {
        let raw = reply("01EF32", "41C8CCCD");
        let resp = Message::parse(&raw, ValueKind::Float).unwrap();
        assert!(verify(&resp, &request()));
    }

    #[test]
    fn test_flipped_checksum_character() {
        let req = request();
        let len = REQUEST.len();
        for pos in len - 5..len - 1 {
            for replacement in "0123456789ABCDEF".chars() {
                if REQUEST.as_bytes()[pos] as char == replacement {
                    continue;
                }
                let mut corrupted = REQUEST.to_string();
                corrupted.replace_range(pos..pos + 1, &replacement.to_string());
                let msg = Message::parse(&corrupted, ValueKind::Float).unwrap();
                assert!(!verify(&msg, &req), "{:?}", corrupted);
            }
        }
    }

    #[test]
    fn test_corrupted_payload() {
        let raw = reply("7BEF32", "41C8CCCD").replace("41C8", "41C9");
        let resp = Message::parse(&raw, ValueKind::Float).unwrap();
        assert!(matches!(
            verify_strict(&resp, &request()),
            Err(MeComError::Verification(
                VerificationFailure::ChecksumMismatch { .. }
            ))
        ));
    }

    #[test]
    fn test_lowercase_checksum_rejected() {
        let raw = "#7BEF32?VR03E8E69aad\r";
        let msg = Message::parse(raw, ValueKind::Float).unwrap();
        assert!(!verify(&msg, &request()));
    }
}
