// src/services/encryption.rs
//! Authenticated encryption for OAuth tokens at rest
//!
//! Output format is base64(nonce || ciphertext). Keys come from hex secrets
//! (`APP_SECRET_CURR`, optionally `APP_SECRET_PREV` during a rotation window);
//! the first 32 decoded bytes are the AES-256 key.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use thiserror::Error;
use tracing::warn;

pub const NONCE_LEN: usize = 12;
pub const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("Invalid encryption key format")]
    InvalidKeyFormat,

    #[error("Encryption key must decode to at least 32 bytes")]
    KeyTooShort,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed with every configured key")]
    DecryptionFailed,

    #[error("Invalid encrypted data format")]
    InvalidDataFormat,
}

pub struct TokenCipher {
    current: Aes256Gcm,
    previous: Option<Aes256Gcm>,
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher")
            .field("current", &"<redacted>")
            .field("previous", &self.previous.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn cipher_from_hex(secret: &str) -> Result<Aes256Gcm, EncryptionError> {
    let bytes = hex::decode(secret.trim()).map_err(|_| EncryptionError::InvalidKeyFormat)?;
    if bytes.len() < KEY_LEN {
        return Err(EncryptionError::KeyTooShort);
    }
    Aes256Gcm::new_from_slice(&bytes[..KEY_LEN]).map_err(|_| EncryptionError::InvalidKeyFormat)
}

impl TokenCipher {
    pub fn new(current_hex: &str, previous_hex: Option<&str>) -> Result<Self, EncryptionError> {
        let current = cipher_from_hex(current_hex)?;
        let previous = previous_hex.map(cipher_from_hex).transpose()?;
        Ok(Self { current, previous })
    }

    /// Generate a new random secret (64 hex characters)
    pub fn generate_secret() -> String {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        hex::encode(key)
    }

    /// Encrypt with the current key and a fresh random nonce
    #[allow(deprecated)]
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, EncryptionError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .current
            .encrypt(nonce, plaintext)
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(combined))
    }

    /// Decrypt with the current key, then the previous key if one is configured
    #[allow(deprecated)]
    pub fn decrypt(&self, encrypted: &str) -> Result<Vec<u8>, EncryptionError> {
        let combined = BASE64
            .decode(encrypted.as_bytes())
            .map_err(|_| EncryptionError::InvalidDataFormat)?;

        if combined.len() <= NONCE_LEN {
            return Err(EncryptionError::InvalidDataFormat);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        match self.current.decrypt(nonce, ciphertext) {
            Ok(bytes) => Ok(bytes),
            Err(_) => {
                let previous = self.previous.as_ref().ok_or(EncryptionError::DecryptionFailed)?;
                let bytes = previous
                    .decrypt(nonce, ciphertext)
                    .map_err(|_| EncryptionError::DecryptionFailed)?;
                warn!("Decrypted token with APP_SECRET_PREV; it will be re-encrypted on next login");
                Ok(bytes)
            }
        }
    }
}
