//! At-rest protection for refresh tokens (AES-256-GCM).
//!
//! A sealed secret is `base64(nonce || ciphertext || tag)`. The tenant id is
//! bound as associated data, so a sealed token only opens for the tenant it
//! was sealed for.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{OAuthError, Result};

/// Key length in bytes.
pub const KEY_LEN: usize = 32;

/// An encrypted secret, safe to keep in memory or on disk.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedSecret(String);

impl SealedSecret {
    /// Wrap an already-sealed encoded value.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The encoded form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealedSecret(..)")
    }
}

/// Symmetric cipher used to seal refresh tokens.
pub struct TokenCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCipher").finish_non_exhaustive()
    }
}

impl TokenCipher {
    /// Create a cipher from raw key bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(OAuthError::Config(format!(
                "Encryption key must be {} bytes, got {}",
                KEY_LEN,
                key.len()
            )));
        }
        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| OAuthError::Crypto("Failed to create key".to_string()))?;

        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Create a cipher from a base64-encoded key (standard or URL-safe alphabet).
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let trimmed = encoded.trim();
        let bytes = STANDARD
            .decode(trimmed)
            .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(trimmed))
            .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(trimmed))
            .map_err(|e| OAuthError::Config(format!("Encryption key is not valid base64: {}", e)))?;
        Self::new(&bytes)
    }

    /// Generate a fresh random key, base64-encoded.
    pub fn generate_key() -> Result<String> {
        let mut key = [0u8; KEY_LEN];
        SystemRandom::new()
            .fill(&mut key)
            .map_err(|_| OAuthError::Crypto("Failed to generate key".to_string()))?;
        Ok(STANDARD.encode(key))
    }

    /// Encrypt `plaintext`, binding it to `tenant_id`.
    pub fn seal(&self, tenant_id: &str, plaintext: &str) -> Result<SealedSecret> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| OAuthError::Crypto("Failed to generate nonce".to_string()))?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::from(tenant_id.as_bytes()), &mut in_out)
            .map_err(|_| OAuthError::Crypto("Encryption failed".to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(SealedSecret(STANDARD.encode(sealed)))
    }

    /// Decrypt a secret sealed for `tenant_id`.
    pub fn open(&self, tenant_id: &str, sealed: &SealedSecret) -> Result<String> {
        let mut bytes = STANDARD
            .decode(sealed.as_str())
            .map_err(|e| OAuthError::Crypto(format!("Sealed secret is not valid base64: {}", e)))?;
        if bytes.len() < NONCE_LEN {
            return Err(OAuthError::Crypto("Sealed secret is truncated".to_string()));
        }

        let mut in_out = bytes.split_off(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(&bytes)
            .map_err(|_| OAuthError::Crypto("Invalid nonce".to_string()))?;

        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(tenant_id.as_bytes()), &mut in_out)
            .map_err(|_| OAuthError::Crypto("Decryption failed".to_string()))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|e| OAuthError::Crypto(format!("Decrypted secret is not UTF-8: {}", e)))
    }
}
