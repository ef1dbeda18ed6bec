//! AES-CBC decryption with an unannounced IV.

use super::DecodeError;
use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use cbc::Decryptor;
use serde::{Deserialize, Serialize};

/// AES block size in bytes.
const AES_BLOCK_SIZE: usize = 16;

/// What a decrypted plaintext must look like to be accepted
///
/// Hosts never say which IV they used, so every candidate is tried. A wrong IV
/// only garbles the first block and often still unpads cleanly, so the
/// plaintext has to pass a structural check before it is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaintextCheck {
    /// Valid UTF-8
    Utf8,
    /// Valid UTF-8 containing the marker
    Marker(String),
    /// A JSON object or array
    #[default]
    Json,
}

impl PlaintextCheck {
    fn accepts(&self, plaintext: &[u8]) -> bool {
        let Ok(text) = std::str::from_utf8(plaintext) else {
            return false;
        };

        match self {
            Self::Utf8 => true,
            Self::Marker(marker) => text.contains(marker.as_str()),
            Self::Json => matches!(
                serde_json::from_str::<serde_json::Value>(text.trim()),
                Ok(serde_json::Value::Object(_)) | Ok(serde_json::Value::Array(_))
            ),
        }
    }
}

/// Key and candidate IVs for an AES-CBC step, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AesCbcParams {
    /// 16, 24 or 32 byte key
    pub key: String,

    /// Candidate 16 byte IVs, tried in order
    pub ivs: Vec<String>,

    #[serde(default)]
    pub expect: PlaintextCheck,
}

impl AesCbcParams {
    /// Checks that the key and every IV decode to valid lengths
    pub fn validate(&self) -> Result<(), DecodeError> {
        self.key_bytes()?;
        self.iv_bytes()?;
        Ok(())
    }

    fn key_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        let key = hex::decode(self.key.trim())
            .map_err(|e| DecodeError::InvalidKey(format!("key: {}", e)))?;

        match key.len() {
            16 | 24 | 32 => Ok(key),
            len => Err(DecodeError::InvalidKey(format!(
                "key must be 16, 24 or 32 bytes, got {}",
                len
            ))),
        }
    }

    fn iv_bytes(&self) -> Result<Vec<[u8; AES_BLOCK_SIZE]>, DecodeError> {
        if self.ivs.is_empty() {
            return Err(DecodeError::InvalidKey("no candidate IVs".to_string()));
        }

        self.ivs
            .iter()
            .map(|iv| {
                let bytes = hex::decode(iv.trim())
                    .map_err(|e| DecodeError::InvalidKey(format!("iv: {}", e)))?;
                <[u8; AES_BLOCK_SIZE]>::try_from(bytes.as_slice()).map_err(|_| {
                    DecodeError::InvalidKey(format!("iv must be 16 bytes, got {}", bytes.len()))
                })
            })
            .collect()
    }

    /// Decrypts `ciphertext`, returning the first plaintext that passes the check
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, DecodeError> {
        if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_SIZE != 0 {
            return Err(DecodeError::Cipher(format!(
                "length {} is not a positive multiple of {}",
                ciphertext.len(),
                AES_BLOCK_SIZE
            )));
        }

        let key = self.key_bytes()?;
        let ivs = self.iv_bytes()?;

        for (index, iv) in ivs.iter().enumerate() {
            match decrypt_one(&key, iv, ciphertext) {
                Some(plaintext) if self.expect.accepts(&plaintext) => {
                    tracing::debug!(iv_index = index, "aes-cbc: candidate IV accepted");
                    return Ok(plaintext);
                }
                _ => tracing::trace!(iv_index = index, "aes-cbc: candidate IV rejected"),
            }
        }

        Err(DecodeError::NoMatchingIv { tried: ivs.len() })
    }
}

fn decrypt_one(key: &[u8], iv: &[u8; AES_BLOCK_SIZE], ciphertext: &[u8]) -> Option<Vec<u8>> {
    let mut buf = ciphertext.to_vec();

    let plaintext = match key.len() {
        16 => Decryptor::<Aes128>::new_from_slices(key, iv)
            .ok()?
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .ok()?
            .to_vec(),
        24 => Decryptor::<Aes192>::new_from_slices(key, iv)
            .ok()?
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .ok()?
            .to_vec(),
        32 => Decryptor::<Aes256>::new_from_slices(key, iv)
            .ok()?
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .ok()?
            .to_vec(),
        _ => return None,
    };

    Some(plaintext)
}
