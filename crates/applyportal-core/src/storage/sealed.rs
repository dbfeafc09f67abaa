use anyhow::{anyhow, Context, Result};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;

use super::Storage;

/// Prefix marking a value written by `SealedStorage`
const SEALED_PREFIX: &str = "sealed1:";

const NONCE_LEN: usize = 12;

pub const KEY_LEN: usize = 32;

/// Generate a fresh random storage key
pub fn generate_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    key
}

/// Storage wrapper that encrypts every value with ChaCha20-Poly1305.
///
/// Values are stored as `sealed1:<hex nonce>:<hex ciphertext>`. The key
/// name is bound as associated data, so a value copied under another key
/// fails to open.
pub struct SealedStorage<S> {
    inner: S,
    cipher: ChaCha20Poly1305,
}

impl<S: Storage> SealedStorage<S> {
    pub fn new(inner: S, key: [u8; KEY_LEN]) -> Self {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        Self { inner, cipher }
    }

    fn seal(&self, key: &str, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let payload = chacha20poly1305::aead::Payload {
            msg: plaintext.as_bytes(),
            aad: key.as_bytes(),
        };
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), payload)
            .map_err(|_| anyhow!("Failed to encrypt stored value: {}", key))?;
        Ok(format!(
            "{}{}:{}",
            SEALED_PREFIX,
            hex::encode(nonce_bytes),
            hex::encode(ciphertext)
        ))
    }

    fn open(&self, key: &str, stored: &str) -> Result<String> {
        let body = match stored.strip_prefix(SEALED_PREFIX) {
            Some(body) => body,
            None => {
                // Written before encryption was enabled; re-sealed on next write
                warn!(key = key, "Reading unsealed stored value");
                return Ok(stored.to_string());
            }
        };

        let (nonce_hex, ciphertext_hex) = body
            .split_once(':')
            .ok_or_else(|| anyhow!("Malformed sealed value: {}", key))?;
        let nonce_bytes = hex::decode(nonce_hex).context("Malformed sealed nonce")?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(anyhow!("Malformed sealed nonce: {}", key));
        }
        let ciphertext = hex::decode(ciphertext_hex).context("Malformed sealed ciphertext")?;

        let payload = chacha20poly1305::aead::Payload {
            msg: &ciphertext,
            aad: key.as_bytes(),
        };
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), payload)
            .map_err(|_| anyhow!("Failed to decrypt stored value: {}", key))?;
        String::from_utf8(plaintext).context("Decrypted value is not UTF-8")
    }
}

impl<S: Storage> Storage for SealedStorage<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.inner.get(key)? {
            Some(stored) => self.open(key, &stored).map(Some),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let sealed = self.seal(key, value)?;
        self.inner.set(key, &sealed)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::sync::Arc;

    #[test]
    fn test_values_are_encrypted_at_rest() {
        let raw = Arc::new(MemoryStorage::new());
        let sealed = SealedStorage::new(raw.clone(), [7u8; KEY_LEN]);

        sealed.set("refresh_token", "\"rt-secret\"").expect("set");
        let at_rest = raw.get("refresh_token").expect("get").expect("present");
        assert!(at_rest.starts_with(SEALED_PREFIX));
        assert!(!at_rest.contains("rt-secret"));

        let opened = sealed.get("refresh_token").expect("get");
        assert_eq!(opened.as_deref(), Some("\"rt-secret\""));
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(generate_key(), generate_key());
    }

    #[test]
    fn test_wrong_key_fails_to_open() {
        let raw = Arc::new(MemoryStorage::new());
        SealedStorage::new(raw.clone(), [1u8; KEY_LEN])
            .set("user", "{}")
            .expect("set");

        let other = SealedStorage::new(raw, [2u8; KEY_LEN]);
        assert!(other.get("user").is_err());
    }

    #[test]
    fn test_value_moved_to_another_key_fails_to_open() {
        let raw = Arc::new(MemoryStorage::new());
        let sealed = SealedStorage::new(raw.clone(), [3u8; KEY_LEN]);
        sealed.set("access_token", "\"at\"").expect("set");

        let stolen = raw.get("access_token").expect("get").expect("present");
        raw.set("user", &stolen).expect("set");
        assert!(sealed.get("user").is_err());
    }

    #[test]
    fn test_reads_unsealed_legacy_value() {
        let raw = Arc::new(MemoryStorage::new());
        raw.set("stepper", r#"{"current_step":2}"#).expect("set");
        let sealed = SealedStorage::new(raw, [4u8; KEY_LEN]);
        assert_eq!(
            sealed.get("stepper").expect("get").as_deref(),
            Some(r#"{"current_step":2}"#)
        );
    }
}
