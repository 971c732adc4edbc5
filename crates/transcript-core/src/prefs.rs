//! User preferences: a peripheral collaborator, not part of the core, but
//! its at-rest encryption contract is fixed to avoid regression. Stores
//! default transcription service, default sample rate/bit depth, and
//! default storage format, encrypted with AES-256-GCM under a per-install
//! key.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

const NONCE_LEN: usize = 12;

/// Preference values persisted at rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub default_transcription_service: Option<String>,
    pub default_sample_rate: u32,
    pub default_bit_depth: u16,
    pub default_storage_format: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            default_transcription_service: None,
            default_sample_rate: 48_000,
            default_bit_depth: 16,
            default_storage_format: "tproj".to_string(),
        }
    }
}

/// A per-install symmetric key used to encrypt the preferences blob at
/// rest.
#[derive(Clone)]
pub struct PrefsKey(Key<Aes256Gcm>);

impl PrefsKey {
    /// Wraps a raw 32-byte key, typically loaded from OS-level secure
    /// storage and generated once per install.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(*Key::<Aes256Gcm>::from_slice(&bytes))
    }
}

/// Encrypts `prefs` into a nonce-prefixed ciphertext blob suitable for
/// at-rest storage.
///
/// # Example
/// ```
/// use transcript_core::prefs::{encrypt, decrypt, Preferences, PrefsKey};
///
/// let key = PrefsKey::from_bytes([7u8; 32]);
/// let prefs = Preferences::default();
/// let blob = encrypt(&prefs, &key).expect("encrypt should succeed");
/// let decrypted = decrypt(&blob, &key).expect("decrypt should succeed");
/// assert_eq!(prefs, decrypted);
/// ```
pub fn encrypt(prefs: &Preferences, key: &PrefsKey) -> Result<Vec<u8>> {
    let plaintext = serde_json::to_vec(prefs).map_err(|source| CoreError::PersistenceSerialization {
        path: std::path::PathBuf::from("preferences"),
        source,
    })?;

    let cipher = Aes256Gcm::new(&key.0);
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_ref())
        .map_err(|_| CoreError::Resource {
            detail: "failed to encrypt preferences".to_string(),
        })?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(nonce.as_slice());
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypts a blob produced by `encrypt`.
pub fn decrypt(blob: &[u8], key: &PrefsKey) -> Result<Preferences> {
    if blob.len() < NONCE_LEN {
        return Err(CoreError::Resource {
            detail: "preferences blob is too short to contain a nonce".to_string(),
        });
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new(&key.0);
    let plaintext = cipher.decrypt(nonce, ciphertext).map_err(|_| CoreError::Resource {
        detail: "failed to decrypt preferences (wrong key or corrupted blob)".to_string(),
    })?;

    serde_json::from_slice(&plaintext).map_err(|source| CoreError::PersistenceSerialization {
        path: std::path::PathBuf::from("preferences"),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let key = PrefsKey::from_bytes([3u8; 32]);
        let mut prefs = Preferences::default();
        prefs.default_transcription_service = Some("whisper".to_string());

        let blob = encrypt(&prefs, &key).expect("encrypt");
        let decrypted = decrypt(&blob, &key).expect("decrypt");
        assert_eq!(prefs, decrypted);
    }

    #[test]
    fn decrypt_fails_with_wrong_key() {
        let key_a = PrefsKey::from_bytes([1u8; 32]);
        let key_b = PrefsKey::from_bytes([2u8; 32]);
        let blob = encrypt(&Preferences::default(), &key_a).expect("encrypt");
        assert!(decrypt(&blob, &key_b).is_err());
    }
}
