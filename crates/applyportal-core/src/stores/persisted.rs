use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::storage::{load_json, save_json, Storage};

use super::ResetRegistry;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Expected a JSON object for {section}, got {found}")]
    NotAnObject { section: &'static str, found: &'static str },

    #[error("Invalid {section} data: {source}")]
    Schema {
        section: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A persisted, resettable snapshot type
pub trait Section:
    Default + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Storage key and registry name
    const KEY: &'static str;

    /// Section-specific clean-up applied after every change
    fn normalize(&mut self) {}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Persisted<T> {
    snapshot: T,
    /// True once the snapshot has been populated from the server
    initialized: bool,
}

struct Inner<T> {
    storage: Arc<dyn Storage>,
    state: RwLock<Persisted<T>>,
}

/// Keyed persisted record for one section.
///
/// Loaded once when opened, written through on every mutation, and reset
/// to its default when the registry it was opened with resets.
pub struct SectionStore<T: Section> {
    inner: Arc<Inner<T>>,
}

impl<T: Section> Clone for SectionStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Section> SectionStore<T> {
    /// Open the store and register its reset with `registry`
    pub fn open(storage: Arc<dyn Storage>, registry: &ResetRegistry) -> Self {
        let persisted = match load_json::<Persisted<T>>(storage.as_ref(), T::KEY) {
            Ok(Some(persisted)) => persisted,
            Ok(None) => Persisted::default(),
            Err(e) => {
                warn!(section = T::KEY, error = %e, "Discarding unreadable section snapshot");
                Persisted::default()
            }
        };

        let store = Self {
            inner: Arc::new(Inner {
                storage,
                state: RwLock::new(persisted),
            }),
        };

        let handle = store.clone();
        registry.register(T::KEY, move || handle.reset());
        store
    }

    pub fn key(&self) -> &'static str {
        T::KEY
    }

    pub fn snapshot(&self) -> T {
        self.read().snapshot.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.read().initialized
    }

    /// Replace the snapshot wholesale with local edits
    pub fn set(&self, snapshot: T) {
        self.update(|current| *current = snapshot);
    }

    /// Mutate the snapshot in place, then normalize and persist
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let (result, persisted) = {
            let mut state = self.write();
            let result = f(&mut state.snapshot);
            state.snapshot.normalize();
            (result, state.clone())
        };
        self.persist(&persisted);
        result
    }

    /// Shallow-merge a partial JSON object into the snapshot.
    ///
    /// Top-level keys in `partial` replace the current values; keys not
    /// mentioned are kept. The merged result must still fit the section's
    /// schema, otherwise nothing changes.
    pub fn merge(&self, partial: Value) -> Result<T, StoreError> {
        let partial = match partial {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::NotAnObject {
                    section: T::KEY,
                    found: json_kind(&other),
                })
            }
        };

        let merged = {
            let state = self.read();
            let mut current = match serde_json::to_value(&state.snapshot) {
                Ok(Value::Object(map)) => map,
                _ => serde_json::Map::new(),
            };
            for (key, value) in partial {
                current.insert(key, value);
            }
            serde_json::from_value::<T>(Value::Object(current)).map_err(|source| {
                warn!(section = T::KEY, error = %source, "Rejected section update");
                StoreError::Schema {
                    section: T::KEY,
                    source,
                }
            })?
        };

        self.set(merged);
        Ok(self.snapshot())
    }

    /// Replace the snapshot with server-confirmed data
    pub fn hydrate(&self, snapshot: T) {
        let persisted = {
            let mut state = self.write();
            state.snapshot = snapshot;
            state.snapshot.normalize();
            state.initialized = true;
            state.clone()
        };
        self.persist(&persisted);
        debug!(section = T::KEY, "Hydrated from server");
    }

    pub fn reset(&self) {
        *self.write() = Persisted::default();
        if let Err(e) = self.inner.storage.remove(T::KEY) {
            warn!(section = T::KEY, error = %e, "Failed to remove section snapshot");
        }
    }

    fn persist(&self, persisted: &Persisted<T>) {
        if let Err(e) = save_json(self.inner.storage.as_ref(), T::KEY, persisted) {
            warn!(section = T::KEY, error = %e, "Failed to persist section snapshot");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Persisted<T>> {
        self.inner.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Persisted<T>> {
        self.inner.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Section + PartialEq> SectionStore<T> {
    pub fn is_default(&self) -> bool {
        self.read().snapshot == T::default()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
