//! Authentication state and token lifecycle.
//!
//! This module provides:
//! - `SessionStore`: the in-memory credential record, synchronously readable
//! - `CredentialStore`: the persisted backing cache for that record
//! - `RefreshCoordinator`: single-flight gate around the refresh endpoint
//! - `TokenGrant`: canonical form of every token response shape
//! - `Keychain`: OS keychain for remembered passwords and the storage key

pub mod credentials;
pub mod grant;
pub mod keychain;
pub mod refresh;
pub mod session;

pub use credentials::CredentialStore;
pub use grant::{parse_token_response, TokenGrant, TokenLifetime};
pub use keychain::Keychain;
pub use refresh::{RefreshCoordinator, RefreshError, RefreshOutcome};
pub use session::{CredentialRecord, LogoutReason, SessionEvent, SessionStore};
