//! Decode chains for obfuscated host payloads
//!
//! Hosts hide their real download URLs behind stacks of reversible transforms.
//! A chain is an ordered slice of [`DecodeOp`]s applied to a raw string; every
//! op is pure, and malformed input at any stage aborts the whole chain.
//!
//! # Example
//!
//! ```
//! use link_resolver::decode::{decode, DecodeOp};
//!
//! // "uggcf://ubfg/svyr.zxi" is ROT13 of "https://host/file.mkv", then base64'd
//! let raw = "dWdnY2Y6Ly91YmZnL3N2eXIuenhp";
//! let url = decode(raw, &[DecodeOp::Base64, DecodeOp::Rot13]).unwrap();
//! assert_eq!(url, "https://host/file.mkv");
//! ```

mod cipher;
mod ops;

pub use cipher::{AesCbcParams, PlaintextCheck};
pub use ops::decode_base64_text;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while decoding a payload
///
/// A decode error only ever drops the candidate being decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid base64: {0}")]
    Base64(String),

    #[error("Invalid hex: {0}")]
    Hex(String),

    #[error("Decoded bytes are not valid UTF-8")]
    Utf8,

    #[error("Invalid cipher key or IV: {0}")]
    InvalidKey(String),

    #[error("Ciphertext rejected: {0}")]
    Cipher(String),

    #[error("None of the {tried} candidate IVs produced a valid plaintext")]
    NoMatchingIv { tried: usize },

    #[error("Decoded payload is not valid JSON: {0}")]
    Json(String),

    #[error("Decoded payload has no field at {0}")]
    MissingField(String),
}

/// A single named transform in a decode chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum DecodeOp {
    /// Standard-alphabet base64, padding optional
    Base64,
    /// ROT13 over ASCII letters, case preserving
    Rot13,
    /// Hex string to raw bytes
    Hex,
    /// Reverse the byte order
    Reverse,
    /// AES-CBC decrypt trying each candidate IV in order
    AesCbc(AesCbcParams),
}

impl DecodeOp {
    /// Name used in log output
    pub fn name(&self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::Rot13 => "rot13",
            Self::Hex => "hex",
            Self::Reverse => "reverse",
            Self::AesCbc(_) => "aes-cbc",
        }
    }

    fn apply(&self, input: Vec<u8>) -> Result<Vec<u8>, DecodeError> {
        match self {
            Self::Base64 => ops::base64_decode(&input),
            Self::Rot13 => Ok(ops::rot13(input)),
            Self::Hex => ops::hex_decode(&input),
            Self::Reverse => Ok(ops::reverse(input)),
            Self::AesCbc(params) => params.decrypt(&input),
        }
    }
}

/// Runs `raw` through `steps` in order and returns the UTF-8 result
///
/// An empty chain returns the input unchanged.
pub fn decode(raw: &str, steps: &[DecodeOp]) -> Result<String, DecodeError> {
    let mut data = raw.trim().as_bytes().to_vec();

    for step in steps {
        data = step.apply(data)?;
        tracing::trace!(op = step.name(), len = data.len(), "decode step applied");
    }

    String::from_utf8(data).map_err(|_| DecodeError::Utf8)
}

/// Decodes `raw` and parses the result as JSON
pub fn decode_json(raw: &str, steps: &[DecodeOp]) -> Result<serde_json::Value, DecodeError> {
    let text = decode(raw, steps)?;
    serde_json::from_str(text.trim()).map_err(|e| DecodeError::Json(e.to_string()))
}

/// Reads a string at a JSON pointer
///
/// Numbers are rendered as strings so size fields declared either way work.
pub fn json_string(value: &serde_json::Value, pointer: &str) -> Result<String, DecodeError> {
    match value.pointer(pointer) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        _ => Err(DecodeError::MissingField(pointer.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    fn rot13(text: &str) -> String {
        String::from_utf8(ops::rot13(text.as_bytes().to_vec())).unwrap()
    }

    #[test]
    fn test_empty_chain_is_identity() {
        assert_eq!(decode("  plain  ", &[]).unwrap(), "plain");
    }

    #[test]
    fn test_round_trip_base64_rot13_base64() {
        let original = "https://files.example/dl/Movie.2023.1080p.mkv?token=abc";

        let encoded = STANDARD.encode(rot13(&STANDARD.encode(original)));
        let decoded = decode(
            &encoded,
            &[DecodeOp::Base64, DecodeOp::Rot13, DecodeOp::Base64],
        )
        .unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_nested_json_with_embedded_url() {
        let url = "https://cdn.example/v/file.mp4";
        let json = format!(r#"{{"title":"x","o":"{}"}}"#, STANDARD.encode(url));
        let raw = STANDARD.encode(STANDARD.encode(rot13(&STANDARD.encode(&json))));

        let payload = decode_json(
            &raw,
            &[
                DecodeOp::Base64,
                DecodeOp::Base64,
                DecodeOp::Rot13,
                DecodeOp::Base64,
            ],
        )
        .unwrap();
        let field = json_string(&payload, "/o").unwrap();

        assert_eq!(decode(&field, &[DecodeOp::Base64]).unwrap(), url);
    }

    #[test]
    fn test_malformed_stage_aborts_chain() {
        let result = decode("%%%not-base64%%%", &[DecodeOp::Base64, DecodeOp::Rot13]);
        assert!(matches!(result, Err(DecodeError::Base64(_))));
    }

    #[test]
    fn test_invalid_utf8_result() {
        // 0xff 0xfe
        let result = decode("//4=", &[DecodeOp::Base64]);
        assert_eq!(result, Err(DecodeError::Utf8));
    }

    #[test]
    fn test_json_string_missing_field() {
        let value: serde_json::Value = serde_json::json!({ "a": "" });
        assert_eq!(
            json_string(&value, "/a"),
            Err(DecodeError::MissingField("/a".to_string()))
        );
        assert!(json_string(&value, "/b").is_err());
    }

    #[test]
    fn test_json_string_accepts_numbers() {
        let value: serde_json::Value = serde_json::json!({ "size": 1024 });
        assert_eq!(json_string(&value, "/size").unwrap(), "1024");
    }

    #[test]
    fn test_ops_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            decode: Vec<DecodeOp>,
        }

        let parsed: Wrapper = toml::from_str(
            r#"decode = [{ op = "base64" }, { op = "rot13" }, { op = "reverse" }]"#,
        )
        .unwrap();

        assert_eq!(
            parsed.decode,
            vec![DecodeOp::Base64, DecodeOp::Rot13, DecodeOp::Reverse]
        );
    }
}
