use super::DecodeError;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

/// Standard alphabet, accepting payloads with or without trailing `=`
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub(super) fn base64_decode(input: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let cleaned: Vec<u8> = input
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    LENIENT_STANDARD
        .decode(cleaned)
        .map_err(|e| DecodeError::Base64(e.to_string()))
}

pub(super) fn rot13(input: Vec<u8>) -> Vec<u8> {
    input
        .into_iter()
        .map(|b| match b {
            b'a'..=b'z' => (b - b'a' + 13) % 26 + b'a',
            b'A'..=b'Z' => (b - b'A' + 13) % 26 + b'A',
            _ => b,
        })
        .collect()
}

pub(super) fn hex_decode(input: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let cleaned: Vec<u8> = input
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    hex::decode(cleaned).map_err(|e| DecodeError::Hex(e.to_string()))
}

pub(super) fn reverse(mut input: Vec<u8>) -> Vec<u8> {
    input.reverse();
    input
}

/// Decodes a base64 string straight to text
///
/// Used outside decode chains for one-off fields such as redirect parameters.
pub fn decode_base64_text(input: &str) -> Result<String, DecodeError> {
    let bytes = base64_decode(input.as_bytes())?;
    String::from_utf8(bytes).map_err(|_| DecodeError::Utf8)
}
