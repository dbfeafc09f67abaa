use std::sync::Mutex;

use tracing::{debug, warn};

type ResetFn = Box<dyn Fn() + Send + Sync>;

/// Reset callbacks for everything that must be wiped when a session ends.
///
/// Section stores and the request cache register here when they are
/// created; ending the session calls `reset_all`.
#[derive(Default)]
pub struct ResetRegistry {
    entries: Mutex<Vec<(String, ResetFn)>>,
}

impl ResetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reset callback under `name`. A second registration with
    /// the same name replaces the first.
    pub fn register<F>(&self, name: &str, reset: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.retain(|(existing, _)| existing != name);
        entries.push((name.to_string(), Box::new(reset)));
        debug!(store = name, "Registered reset callback");
    }

    pub fn names(&self) -> Vec<String> {
        match self.entries.lock() {
            Ok(entries) => entries.iter().map(|(name, _)| name.clone()).collect(),
            Err(poisoned) => poisoned.into_inner().iter().map(|(name, _)| name.clone()).collect(),
        }
    }

    /// Run every registered reset callback in registration order
    pub fn reset_all(&self) {
        let entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => {
                warn!("Reset registry lock poisoned, resetting anyway");
                poisoned.into_inner()
            }
        };
        for (name, reset) in entries.iter() {
            debug!(store = %name, "Resetting");
            reset();
        }
    }
}
