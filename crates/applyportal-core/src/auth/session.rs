use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::models::UserProfile;
use crate::stores::ResetRegistry;

use super::credentials::CredentialStore;
use super::grant::TokenGrant;
use super::refresh::RefreshError;

/// Buffer of session events kept for slow subscribers
const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: Option<UserProfile>,
}

impl CredentialRecord {
    pub fn is_authenticated(&self) -> bool {
        self.access_token
            .as_deref()
            .map(|t| !t.is_empty())
            .unwrap_or(false)
    }

    /// A token without a recorded expiry is treated as live
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at.map(|at| at - Utc::now())
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        self.time_until_expiry().map(|d| d.num_minutes().max(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    UserInitiated,
    /// Token expired and no refresh token was available
    SessionExpired,
    RefreshFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoggedIn { email: String },
    TokensRefreshed { expires_at: Option<DateTime<Utc>> },
    LoggedOut { reason: LogoutReason },
    /// The session could not be recovered; front ends should send the user
    /// to `login_path`, coming back to `return_to` afterwards.
    LoginRequired {
        login_path: String,
        return_to: Option<String>,
    },
}

/// Single source of truth for the authentication state.
///
/// Readable synchronously from anywhere (the HTTP client reads it on every
/// request). Every mutation writes through to the credential store.
pub struct SessionStore {
    record: RwLock<CredentialRecord>,
    /// Bumped every time a session ends; only changed under the write lock
    epoch: AtomicU64,
    credentials: CredentialStore,
    registry: Arc<ResetRegistry>,
    events: broadcast::Sender<SessionEvent>,
    login_path: String,
}

impl SessionStore {
    /// Open the session, hydrating it from the credential store
    pub fn open(credentials: CredentialStore, registry: Arc<ResetRegistry>, login_path: &str) -> Self {
        let record = match credentials.load() {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Failed to load stored credentials, starting signed out");
                CredentialRecord::default()
            }
        };
        debug!(authenticated = record.is_authenticated(), "Session loaded");

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            record: RwLock::new(record),
            epoch: AtomicU64::new(0),
            credentials,
            registry,
            events,
            login_path: login_path.to_string(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // ===== Reads =====

    pub fn snapshot(&self) -> CredentialRecord {
        self.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone().filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone().filter(|t| !t.is_empty())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.read().expires_at
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn is_expired(&self) -> bool {
        self.read().is_expired()
    }

    /// Identifies the current session; changes when it ends
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    // ===== Mutations =====

    /// Install a new session after login or registration.
    /// `expires_in` is a lifetime in seconds from now.
    pub fn set_auth_data(
        &self,
        access_token: String,
        user: UserProfile,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
    ) {
        let expires_at = expires_in.map(|secs| Utc::now() + Duration::seconds(secs));
        let email = user.email.clone();
        let record = CredentialRecord {
            access_token: Some(access_token),
            refresh_token,
            expires_at,
            user: Some(user),
        };
        self.replace(record);
        info!(email = %email, ?expires_at, "Session established");
        self.publish(SessionEvent::LoggedIn { email });
    }

    /// Replace the token triple after a refresh, keeping the user profile
    pub fn set_tokens(
        &self,
        access_token: String,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) {
        {
            let mut record = self.write();
            record.access_token = Some(access_token);
            record.refresh_token = refresh_token;
            record.expires_at = expires_at;
            self.persist(&record);
        }
        debug!(?expires_at, "Tokens refreshed");
        self.publish(SessionEvent::TokensRefreshed { expires_at });
    }

    /// Apply a grant returned by the refresh endpoint, unless the session
    /// it was requested for (`epoch`) has ended since. A missing refresh
    /// token keeps the current one; an embedded user replaces the profile.
    pub fn apply_refresh(&self, epoch: u64, grant: TokenGrant) -> Result<(), RefreshError> {
        let expires_at = grant.expires_at(Utc::now());
        {
            let mut record = self.write();
            if self.epoch() != epoch {
                debug!("Session ended during refresh, dropping the grant");
                return Err(RefreshError::SessionEnded);
            }
            record.access_token = Some(grant.access_token);
            if grant.refresh_token.is_some() {
                record.refresh_token = grant.refresh_token;
            }
            record.expires_at = expires_at;
            if grant.user.is_some() {
                record.user = grant.user;
            }
            self.persist(&record);
        }
        debug!(?expires_at, "Tokens refreshed");
        self.publish(SessionEvent::TokensRefreshed { expires_at });
        Ok(())
    }

    /// Clear only the access token, forcing re-authentication on the next
    /// request while keeping the refresh token and profile.
    pub fn reset_access_token(&self) {
        {
            let mut record = self.write();
            record.access_token = None;
            if let Err(e) = self.credentials.set_access_token(None) {
                warn!(error = %e, "Failed to clear stored access token");
            }
        }
        debug!("Access token cleared");
    }

    /// User-initiated logout
    pub fn logout(&self) {
        self.end_session(LogoutReason::UserInitiated);
    }

    /// Forced logout after an unrecoverable auth failure
    pub fn expire(&self, reason: LogoutReason) {
        self.end_session(reason);
    }

    /// Ask front ends to send the user to the login route
    pub fn require_login(&self, return_to: Option<String>) {
        self.publish(SessionEvent::LoginRequired {
            login_path: self.login_path.clone(),
            return_to,
        });
    }

    /// The one session-ending transition: clears the in-memory and persisted
    /// credentials, then resets every registered store and the request cache.
    /// Credential writes happen under the record lock, so a refresh landing
    /// concurrently either completes first or sees the new epoch.
    fn end_session(&self, reason: LogoutReason) {
        {
            let mut record = self.write();
            *record = CredentialRecord::default();
            self.epoch.fetch_add(1, Ordering::SeqCst);
            if let Err(e) = self.credentials.clear() {
                warn!(error = %e, "Failed to clear stored credentials");
            }
        }
        self.registry.reset_all();
        info!(?reason, "Session ended");
        self.publish(SessionEvent::LoggedOut { reason });
    }

    fn replace(&self, record: CredentialRecord) {
        let mut current = self.write();
        *current = record;
        self.persist(&current);
    }

    fn persist(&self, record: &CredentialRecord) {
        if let Err(e) = self.credentials.save(record) {
            warn!(error = %e, "Failed to persist credentials");
        }
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    fn read(&self) -> RwLockReadGuard<'_, CredentialRecord> {
        self.record.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CredentialRecord> {
        self.record.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
