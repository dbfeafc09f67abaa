//! Shared request cache.
//!
//! GET responses are cached in memory by request path and considered stale
//! after a per-query window. The cache registers itself with the reset
//! registry so ending a session clears it.

pub mod manager;

pub use manager::{CachedData, RequestCache, DEFAULT_STALE_AFTER_SECS, REQUEST_CACHE_NAME};
