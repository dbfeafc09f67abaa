//! Core library for the application portal client.
//!
//! Session and token lifecycle, the HTTP client with transparent token
//! refresh, persisted section stores for the multi-step application, and
//! the storage they all share. Front ends (the CLI, a web view) drive it
//! through `Portal`.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod portal;
pub mod storage;
pub mod stores;
pub mod summary;
pub mod utils;

pub use api::{ApiClient, ApiError, Disposition};
pub use config::Config;
pub use portal::{Portal, SyncReport};
pub use stores::SectionKind;
