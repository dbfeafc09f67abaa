use anyhow::{bail, Context, Result};
use keyring::Entry;
use tracing::info;

use crate::storage::{generate_key, KEY_LEN};

const SERVICE_NAME: &str = "applyportal";

/// Keychain account holding the at-rest storage key
const STORAGE_KEY_ACCOUNT: &str = "storage-key";

/// OS keychain access for remembered passwords and the storage key
pub struct Keychain;

impl Keychain {
    /// Remember the password for an email in the OS keychain
    pub fn store_password(email: &str, password: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")?;
        entry
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    pub fn get_password(email: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    pub fn delete_password(email: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }

    pub fn has_password(email: &str) -> bool {
        match Entry::new(SERVICE_NAME, email) {
            Ok(entry) => entry.get_password().is_ok(),
            Err(_) => false,
        }
    }

    /// Load the storage encryption key, generating and saving one on first use
    pub fn storage_key() -> Result<[u8; KEY_LEN]> {
        let entry = Entry::new(SERVICE_NAME, STORAGE_KEY_ACCOUNT)
            .context("Failed to create keyring entry")?;
        match entry.get_password() {
            Ok(encoded) => decode_key(&encoded),
            Err(keyring::Error::NoEntry) => {
                let key = generate_key();
                entry
                    .set_password(&hex::encode(key))
                    .context("Failed to store storage key in keychain")?;
                info!("Generated new storage key");
                Ok(key)
            }
            Err(e) => Err(e).context("Failed to read storage key from keychain"),
        }
    }
}

fn decode_key(encoded: &str) -> Result<[u8; KEY_LEN]> {
    let bytes = hex::decode(encoded.trim()).context("Storage key is not hex")?;
    if bytes.len() != KEY_LEN {
        bail!("Storage key has {} bytes, expected {}", bytes.len(), KEY_LEN);
    }
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&bytes);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_key() {
        let encoded = hex::encode([9u8; KEY_LEN]);
        assert_eq!(decode_key(&encoded).expect("decode"), [9u8; KEY_LEN]);
        assert!(decode_key("abcd").is_err());
        assert!(decode_key("not hex").is_err());
    }
}
