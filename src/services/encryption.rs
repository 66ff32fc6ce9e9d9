// src/services/encryption.rs
//! AES-256-GCM sealing for provider credentials stored in system_settings.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use std::env;
use thiserror::Error;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("Encryption key not configured")]
    KeyNotConfigured,

    #[error("Invalid encryption key format")]
    InvalidKeyFormat,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid sealed data format")]
    InvalidDataFormat,
}

pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService").finish_non_exhaustive()
    }
}

impl EncryptionService {
    /// Initialize from the SETTINGS_MASTER_KEY environment variable
    /// (a base64-encoded 32-byte key, see `generate_settings_key`).
    pub fn from_env() -> Result<Self, EncryptionError> {
        let key_str =
            env::var("SETTINGS_MASTER_KEY").map_err(|_| EncryptionError::KeyNotConfigured)?;
        Self::from_key(&key_str)
    }

    pub fn from_key(key_str: &str) -> Result<Self, EncryptionError> {
        let key_bytes = BASE64
            .decode(key_str.as_bytes())
            .map_err(|_| EncryptionError::InvalidKeyFormat)?;

        if key_bytes.len() != 32 {
            return Err(EncryptionError::InvalidKeyFormat);
        }

        let key = aes_gcm::Key::<Aes256Gcm>::from_slice(&key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Generate a fresh random master key, base64-encoded.
    pub fn generate_key() -> String {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        BASE64.encode(key)
    }

    /// Seal a plaintext value. Output is base64(nonce || ciphertext); the
    /// nonce is random per call, so sealing the same value twice produces
    /// different outputs.
    pub fn seal(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(combined))
    }

    /// Open a value produced by `seal`.
    pub fn open(&self, sealed: &str) -> Result<String, EncryptionError> {
        let combined = BASE64
            .decode(sealed.as_bytes())
            .map_err(|_| EncryptionError::InvalidDataFormat)?;

        if combined.len() < NONCE_LEN {
            return Err(EncryptionError::InvalidDataFormat);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| EncryptionError::DecryptionFailed("invalid UTF-8".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_round_trips() {
        let service = EncryptionService::from_key(&EncryptionService::generate_key()).unwrap();
        let sealed = service.seal("sk-test-12345").unwrap();
        assert_ne!(sealed, "sk-test-12345");
        assert_eq!(service.open(&sealed).unwrap(), "sk-test-12345");
    }

    #[test]
    fn seal_is_nondeterministic() {
        let service = EncryptionService::from_key(&EncryptionService::generate_key()).unwrap();
        let a = service.seal("value").unwrap();
        let b = service.seal("value").unwrap();
        assert_ne!(a, b);
        assert_eq!(service.open(&a).unwrap(), service.open(&b).unwrap());
    }

    #[test]
    fn rejects_bad_key() {
        assert!(EncryptionService::from_key("not-base64!").is_err());
        assert!(EncryptionService::from_key(&BASE64.encode([0u8; 16])).is_err());
    }

    #[test]
    fn rejects_garbage_sealed_data() {
        let service = EncryptionService::from_key(&EncryptionService::generate_key()).unwrap();
        assert!(service.open("AAAA").is_err());
        assert!(service.open("!!!").is_err());
    }
}
