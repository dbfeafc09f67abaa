use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The token could not be refreshed and the session has been ended
    #[error("Session expired - please sign in again")]
    SessionExpired,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Rejected: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// How a front end should react to a failed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Show a transient message and stay on the current view
    Notify(String),
    /// Replace the view with an error page
    ErrorPage { status: u16 },
    /// Send the user to the login route
    Login { return_to: Option<String> },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 | 422 => ApiError::BadRequest(server_message(&truncated)),
            401 => ApiError::Unauthorized(truncated),
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// HTTP status behind this error, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::AccessDenied(_) => Some(403),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited => Some(429),
            ApiError::ServerError(_) => Some(500),
            ApiError::NetworkError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn disposition(&self, return_to: Option<&str>) -> Disposition {
        match self {
            ApiError::SessionExpired | ApiError::Unauthorized(_) => Disposition::Login {
                return_to: return_to.map(str::to_string),
            },
            ApiError::AccessDenied(_) | ApiError::ServerError(_) => Disposition::ErrorPage {
                status: self.status().unwrap_or(500),
            },
            other => Disposition::Notify(other.to_string()),
        }
    }
}

/// Pull the human-readable `message` out of a JSON error body, if present
fn server_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match v.get("message") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Array(items)) => Some(
                items
                    .iter()
                    .filter_map(|i| i.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            _ => None,
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(ApiError::from_status(StatusCode::UNAUTHORIZED, "no"), ApiError::Unauthorized(b) if b == "no"));
        assert!(matches!(ApiError::from_status(StatusCode::FORBIDDEN, ""), ApiError::AccessDenied(_)));
        assert!(matches!(ApiError::from_status(StatusCode::NOT_FOUND, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""), ApiError::RateLimited));
        assert!(matches!(ApiError::from_status(StatusCode::BAD_GATEWAY, ""), ApiError::ServerError(_)));
        assert!(matches!(ApiError::from_status(StatusCode::IM_A_TEAPOT, ""), ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_bad_request_uses_server_message() {
        let err = ApiError::from_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"statusCode": 422, "message": ["email must be an email", "password too short"]}"#,
        );
        assert_eq!(err.to_string(), "Rejected: email must be an email; password too short");

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, "plain text");
        assert_eq!(err.to_string(), "Rejected: plain text");
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "é".repeat(400);
        match ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body) {
            ApiError::ServerError(msg) => {
                assert!(msg.contains("truncated, 800 total bytes"));
                assert!(msg.len() < body.len());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_status() {
        assert_eq!(ApiError::Unauthorized(String::new()).status(), Some(401));
        assert_eq!(ApiError::RateLimited.status(), Some(429));
        assert_eq!(ApiError::SessionExpired.status(), None);
        assert_eq!(ApiError::InvalidRequest("x".into()).status(), None);
    }

    #[test]
    fn test_disposition() {
        assert_eq!(
            ApiError::SessionExpired.disposition(Some("/bio-data")),
            Disposition::Login { return_to: Some("/bio-data".into()) }
        );
        assert_eq!(
            ApiError::AccessDenied(String::new()).disposition(None),
            Disposition::ErrorPage { status: 403 }
        );
        assert_eq!(
            ApiError::ServerError(String::new()).disposition(None),
            Disposition::ErrorPage { status: 500 }
        );
        assert!(matches!(
            ApiError::NotFound("x".into()).disposition(None),
            Disposition::Notify(_)
        ));
    }
}
