//! Persistent key-value storage.
//!
//! This module provides:
//! - `Storage`: one JSON document per key, the local stand-in for browser storage
//! - `FileStorage`: a directory with one file per key
//! - `MemoryStorage`: in-process storage for tests
//! - `SealedStorage`: ChaCha20-Poly1305 encryption at rest over any backend

pub mod backend;
pub mod sealed;

pub use backend::{load_json, save_json, FileStorage, MemoryStorage, Storage};
pub use sealed::{generate_key, SealedStorage, KEY_LEN};
