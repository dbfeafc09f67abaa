//! Paths of every backend endpoint, relative to the configured base URL.

pub const LOGIN: &str = "/auth/login";
pub const REGISTER: &str = "/auth/register";
pub const REFRESH_TOKEN: &str = "/auth/refresh-token";

pub const BIO_DATA: &str = "/bio-data";
pub const ACADEMIC_HISTORY: &str = "/academic-history";
pub const EMPLOYMENT_HISTORY: &str = "/employment-history";
pub const RECOMMENDATIONS: &str = "/recommendations";
pub const UPLOADS: &str = "/uploads";
pub const ATTESTATION: &str = "/attestation";

pub const PAYMENT_INITIALIZE: &str = "/payments/initialize";
pub const PAYMENT_VERIFY: &str = "/payments/verify";

pub const MY_APPLICATION: &str = "/applications/me";
pub const SUBMIT_APPLICATION: &str = "/applications/submit";
pub const APPLICATIONS: &str = "/applications";

pub fn payment_verify(reference: &str) -> String {
    format!("{}/{}", PAYMENT_VERIFY, urlencoding::encode(reference))
}

pub fn application(id: &str) -> String {
    format!("{}/{}", APPLICATIONS, urlencoding::encode(id))
}

/// Whether a bearer token is attached to requests for `path`. A 401 from
/// a path that sends no credentials is never recovered.
pub fn sends_credentials(path: &str) -> bool {
    !matches!(path, LOGIN | REGISTER | REFRESH_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_endpoints_skip_credentials() {
        assert!(!sends_credentials(LOGIN));
        assert!(!sends_credentials(REGISTER));
        assert!(!sends_credentials(REFRESH_TOKEN));
        assert!(sends_credentials(BIO_DATA));
    }

    #[test]
    fn test_path_segments_are_encoded() {
        assert_eq!(payment_verify("PAY-1"), "/payments/verify/PAY-1");
        assert_eq!(payment_verify("a/b c"), "/payments/verify/a%2Fb%20c");
        assert_eq!(application("42"), "/applications/42");
        assert_eq!(application("ü"), "/applications/%C3%BC");
    }
}
