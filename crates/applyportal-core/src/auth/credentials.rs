use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::models::UserProfile;
use crate::storage::{load_json, save_json, Storage};

use super::session::CredentialRecord;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const EXPIRES_AT_KEY: &str = "expires_at";
pub const USER_KEY: &str = "user";

/// Passive persisted cache of the credential record.
///
/// Plain key-value accessors with no logic of their own; the session store
/// owns the record and writes through here on every change.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn Storage>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn access_token(&self) -> Result<Option<String>> {
        load_json(self.storage.as_ref(), ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Result<Option<String>> {
        load_json(self.storage.as_ref(), REFRESH_TOKEN_KEY)
    }

    pub fn expires_at(&self) -> Result<Option<DateTime<Utc>>> {
        load_json(self.storage.as_ref(), EXPIRES_AT_KEY)
    }

    pub fn user(&self) -> Result<Option<UserProfile>> {
        load_json(self.storage.as_ref(), USER_KEY)
    }

    pub fn set_access_token(&self, token: Option<&str>) -> Result<()> {
        self.put(ACCESS_TOKEN_KEY, token)
    }

    pub fn set_refresh_token(&self, token: Option<&str>) -> Result<()> {
        self.put(REFRESH_TOKEN_KEY, token)
    }

    pub fn set_expires_at(&self, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        self.put(EXPIRES_AT_KEY, expires_at.as_ref())
    }

    pub fn set_user(&self, user: Option<&UserProfile>) -> Result<()> {
        self.put(USER_KEY, user)
    }

    /// Read every key into a record
    pub fn load(&self) -> Result<CredentialRecord> {
        Ok(CredentialRecord {
            access_token: self.access_token()?,
            refresh_token: self.refresh_token()?,
            expires_at: self.expires_at()?,
            user: self.user()?,
        })
    }

    /// Write every key from a record; `None` fields are removed
    pub fn save(&self, record: &CredentialRecord) -> Result<()> {
        self.set_access_token(record.access_token.as_deref())?;
        self.set_refresh_token(record.refresh_token.as_deref())?;
        self.set_expires_at(record.expires_at)?;
        self.set_user(record.user.as_ref())?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, EXPIRES_AT_KEY, USER_KEY] {
            self.storage.remove(key)?;
        }
        Ok(())
    }

    fn put<T: serde::Serialize + ?Sized>(&self, key: &str, value: Option<&T>) -> Result<()> {
        match value {
            Some(value) => save_json(self.storage.as_ref(), key, value),
            None => self.storage.remove(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserId;
    use crate::storage::MemoryStorage;
    use chrono::TimeZone;

    fn user() -> UserProfile {
        UserProfile {
            id: UserId::Number(1),
            email: "ada@example.org".into(),
            role: Some("applicant".into()),
            extra: Default::default(),
        }
    }

    #[test]
    fn test_save_and_load_record() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CredentialStore::new(storage.clone());
        let expires_at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).single();

        let record = CredentialRecord {
            access_token: Some("at".into()),
            refresh_token: Some("rt".into()),
            expires_at,
            user: Some(user()),
        };
        store.save(&record).expect("save");
        assert_eq!(storage.len(), 4);
        assert_eq!(store.load().expect("load"), record);
    }

    #[test]
    fn test_none_fields_remove_keys() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CredentialStore::new(storage.clone());
        store.set_access_token(Some("at")).expect("set");
        store.set_access_token(None).expect("unset");
        assert!(storage.is_empty());
        assert_eq!(store.access_token().expect("get"), None);
    }

    #[test]
    fn test_clear() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CredentialStore::new(storage.clone());
        store.set_refresh_token(Some("rt")).expect("set");
        store.set_user(Some(&user())).expect("set");
        store.clear().expect("clear");
        assert!(storage.is_empty());
    }
}
