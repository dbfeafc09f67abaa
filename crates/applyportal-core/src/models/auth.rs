use std::fmt;

use serde::{Deserialize, Serialize};

/// User identifier as sent by the backend (numeric or string ids)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(id) => write!(f, "{}", id),
            UserId::Text(id) => write!(f, "{}", id),
        }
    }
}

/// Authenticated user. Opaque beyond identity and role; every other field
/// the backend sends is kept in `extra` and written back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    pub fn role_or_default(&self) -> &str {
        self.role.as_deref().unwrap_or("applicant")
    }

    /// Whether this user may open other applicants' applications
    pub fn is_reviewer(&self) -> bool {
        matches!(self.role_or_default(), "admin" | "member" | "reviewer")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_profile_keeps_extra_fields() {
        let json = r#"{"id": 42, "email": "ada@example.org", "role": "applicant", "firstName": "Ada"}"#;
        let user: UserProfile = serde_json::from_str(json).expect("parse user");
        assert_eq!(user.id, UserId::Number(42));
        assert_eq!(user.extra.get("firstName").and_then(|v| v.as_str()), Some("Ada"));

        let back = serde_json::to_value(&user).expect("serialize user");
        assert_eq!(back["firstName"], "Ada");
    }

    #[test]
    fn test_user_profile_string_id_and_missing_role() {
        let json = r#"{"id": "u-17", "email": "grace@example.org"}"#;
        let user: UserProfile = serde_json::from_str(json).expect("parse user");
        assert_eq!(user.id.to_string(), "u-17");
        assert_eq!(user.role_or_default(), "applicant");
        assert!(!user.is_reviewer());
    }
}
