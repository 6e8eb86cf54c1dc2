//! Authenticated encryption for cookie payloads.
//!
//! The cookie is the only session store, so tampering or truncation must
//! degrade to "unauthenticated", never to a crash or to accepting corrupted
//! data: encryption failures are errors, decryption failures are `None`.

use crate::error::{Error, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    AeadCore, Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Used when no SESSION_SECRET is configured; fine for local development,
/// reported through /api/health so production setups notice.
const FALLBACK_SECRET: &str = "gitcdn-insecure-dev-secret";

/// Encrypts and decrypts small JSON payloads as `nonce.tag.ciphertext`
/// tokens, each segment base64url-encoded without padding.
#[derive(Clone)]
pub struct CookieCodec {
    key: [u8; 32],
}

impl CookieCodec {
    /// Derive the 256-bit key by hashing the configured secret.
    pub fn new(secret: Option<&str>) -> Self {
        let secret = secret.unwrap_or(FALLBACK_SECRET);
        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self { key }
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key))
    }

    /// Serialize and encrypt a payload with a fresh random 96-bit nonce.
    pub fn encrypt<T: Serialize>(&self, payload: &T) -> Result<String> {
        let plaintext = serde_json::to_vec(payload)
            .map_err(|e| Error::Internal(format!("Failed to serialize cookie payload: {e}")))?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher()
            .encrypt(&nonce, plaintext.as_ref())
            .map_err(|_| Error::Internal("Cookie encryption failed".to_string()))?;

        // aes-gcm appends the authentication tag to the ciphertext
        let (body, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        Ok(format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(nonce),
            URL_SAFE_NO_PAD.encode(tag),
            URL_SAFE_NO_PAD.encode(body)
        ))
    }

    /// Decrypt a token back into its payload. Fails closed: wrong segment
    /// count, bad base64, tag mismatch, and JSON errors all yield `None`.
    pub fn decrypt<T: DeserializeOwned>(&self, token: &str) -> Option<T> {
        let mut parts = token.split('.');
        let nonce_b64 = parts.next()?;
        let tag_b64 = parts.next()?;
        let body_b64 = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        let nonce = URL_SAFE_NO_PAD.decode(nonce_b64).ok()?;
        if nonce.len() != NONCE_LEN {
            return None;
        }
        let tag = URL_SAFE_NO_PAD.decode(tag_b64).ok()?;
        if tag.len() != TAG_LEN {
            return None;
        }

        let mut sealed = URL_SAFE_NO_PAD.decode(body_b64).ok()?;
        sealed.extend_from_slice(&tag);

        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(&nonce), sealed.as_ref())
            .ok()?;

        serde_json::from_slice(&plaintext).ok()
    }
}
