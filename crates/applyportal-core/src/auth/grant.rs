//! Translation of token responses into one canonical `TokenGrant`.
//!
//! The auth endpoints answer in one of two shapes:
//! - `{access_token, refresh_token, expires_in, user?}` (relative lifetime in seconds)
//! - `{accessToken, refreshToken, expiresAt}` (legacy, absolute expiry)
//!
//! Both are accepted here and nowhere else.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::models::UserProfile;

/// Epoch values above this are milliseconds, below it seconds
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenLifetime {
    /// Seconds from the moment the grant is applied
    Relative(i64),
    Absolute(DateTime<Utc>),
    Unknown,
}

/// Canonical result of login, registration and refresh
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub lifetime: TokenLifetime,
    pub user: Option<UserProfile>,
}

impl TokenGrant {
    /// Absolute expiry if the grant were applied at `now`
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.lifetime {
            TokenLifetime::Relative(secs) => Some(now + chrono::Duration::seconds(secs)),
            TokenLifetime::Absolute(at) => Some(at),
            TokenLifetime::Unknown => None,
        }
    }

    /// Seconds of lifetime left at `now`, for callers that take a relative value
    pub fn expires_in(&self, now: DateTime<Utc>) -> Option<i64> {
        match self.lifetime {
            TokenLifetime::Relative(secs) => Some(secs),
            TokenLifetime::Absolute(at) => Some((at - now).num_seconds()),
            TokenLifetime::Unknown => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SnakeCaseTokens {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyTokens {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<Timestamp>,
    #[serde(default)]
    user: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Epoch(i64),
    Text(String),
}

impl Timestamp {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Epoch(n) if *n >= EPOCH_MILLIS_THRESHOLD => Utc.timestamp_millis_opt(*n).single(),
            Timestamp::Epoch(n) => Utc.timestamp_opt(*n, 0).single(),
            Timestamp::Text(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenResponse {
    SnakeCase(SnakeCaseTokens),
    Legacy(LegacyTokens),
}

/// Parse a token response body in either accepted shape
pub fn parse_token_response(body: &str) -> Result<TokenGrant, String> {
    let response: TokenResponse = serde_json::from_str(body)
        .map_err(|_| "response matches neither token shape".to_string())?;

    let grant = match response {
        TokenResponse::SnakeCase(t) => TokenGrant {
            access_token: t.access_token,
            refresh_token: t.refresh_token,
            lifetime: t.expires_in.map_or(TokenLifetime::Unknown, TokenLifetime::Relative),
            user: t.user,
        },
        TokenResponse::Legacy(t) => {
            let lifetime = match t.expires_at {
                Some(ts) => TokenLifetime::Absolute(
                    ts.to_datetime().ok_or_else(|| "unreadable expiresAt".to_string())?,
                ),
                None => TokenLifetime::Unknown,
            };
            TokenGrant {
                access_token: t.access_token,
                refresh_token: t.refresh_token,
                lifetime,
                user: t.user,
            }
        }
    };

    if grant.access_token.trim().is_empty() {
        return Err("empty access token".to_string());
    }
    Ok(grant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case_shape_with_user() {
        let body = r#"{"access_token": "at", "refresh_token": "rt", "expires_in": 900,
                       "user": {"id": 3, "email": "ada@example.org", "role": "applicant"}}"#;
        let grant = parse_token_response(body).expect("parse");
        assert_eq!(grant.access_token, "at");
        assert_eq!(grant.refresh_token.as_deref(), Some("rt"));
        assert_eq!(grant.lifetime, TokenLifetime::Relative(900));
        assert_eq!(grant.user.map(|u| u.email).as_deref(), Some("ada@example.org"));
    }

    #[test]
    fn test_legacy_shape_epoch_millis() {
        let body = r#"{"accessToken": "at2", "refreshToken": "rt2", "expiresAt": 1893456000000}"#;
        let grant = parse_token_response(body).expect("parse");
        let expected = Utc.timestamp_millis_opt(1_893_456_000_000).single();
        assert_eq!(grant.access_token, "at2");
        assert_eq!(grant.refresh_token.as_deref(), Some("rt2"));
        assert_eq!(grant.expires_at(Utc::now()), expected);
        assert!(grant.user.is_none());
    }

    #[test]
    fn test_legacy_shape_epoch_seconds_and_rfc3339() {
        let seconds = parse_token_response(r#"{"accessToken": "a", "expiresAt": 1893456000}"#)
            .expect("parse");
        let text = parse_token_response(r#"{"accessToken": "a", "expiresAt": "2030-01-01T00:00:00Z"}"#)
            .expect("parse");
        assert_eq!(seconds.expires_at(Utc::now()), text.expires_at(Utc::now()));
    }

    #[test]
    fn test_relative_lifetime_is_anchored_at_apply_time() {
        let grant = parse_token_response(r#"{"access_token": "a", "expires_in": 60}"#).expect("parse");
        let now = Utc::now();
        assert_eq!(grant.expires_at(now), Some(now + chrono::Duration::seconds(60)));
        assert_eq!(grant.expires_in(now), Some(60));
    }

    #[test]
    fn test_rejects_unknown_and_empty() {
        assert!(parse_token_response(r#"{"token": "x"}"#).is_err());
        assert!(parse_token_response(r#"{"access_token": "  "}"#).is_err());
        assert!(parse_token_response(r#"{"accessToken": "a", "expiresAt": "tomorrow"}"#).is_err());
        assert!(parse_token_response("not json").is_err());
    }
}
