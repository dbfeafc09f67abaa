//! API client for the application portal backend.
//!
//! Every call goes through one pipeline: a request stage that attaches the
//! bearer token (refreshing it first when it has expired) and a response
//! stage that gets one chance to recover from a 401 by refreshing and
//! re-issuing the request. Both stages share a single-flight refresh.

use std::sync::Arc;

use chrono::Utc;
use reqwest::{multipart, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::auth::{
    parse_token_response, LogoutReason, RefreshCoordinator, RefreshError, RefreshOutcome,
    SessionStore, TokenGrant,
};
use crate::cache::{RequestCache, DEFAULT_STALE_AFTER_SECS};
use crate::config::Config;
use crate::models::{
    AcademicHistory, Application, Attestation, BioData, EmploymentHistory, LoginRequest,
    PaymentInit, PaymentInitRequest, PaymentVerification, Recommendations, RegisterRequest,
    SubmissionReceipt, SubmitRequest, UploadedDocument, UserProfile,
};

use super::endpoints;
use super::ApiError;

/// A file to send as multipart form data
#[derive(Debug, Clone)]
pub struct UploadPart {
    /// Document kind, sent as the `kind` text field
    pub kind: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl UploadPart {
    /// Build a fresh form; a multipart body cannot be re-sent, so every
    /// dispatch gets its own.
    fn to_form(&self) -> Result<multipart::Form, ApiError> {
        let mut part = multipart::Part::bytes(self.bytes.clone()).file_name(self.file_name.clone());
        if let Some(mime) = &self.mime {
            part = part
                .mime_str(mime)
                .map_err(|e| ApiError::InvalidRequest(format!("bad content type {}: {}", mime, e)))?;
        }
        Ok(multipart::Form::new()
            .text("kind", self.kind.clone())
            .part("file", part))
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(UploadPart),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn json<B: Serialize>(method: Method, path: impl Into<String>, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("unserializable body: {}", e)))?;
        Ok(Self {
            method,
            path: path.into(),
            body: RequestBody::Json(value),
        })
    }

    pub fn multipart(path: impl Into<String>, upload: UploadPart) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: RequestBody::Multipart(upload),
        }
    }
}

/// Result of a registration call
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterOutcome {
    /// The backend returned tokens and the session is now established
    SignedIn(UserProfile),
    /// The account exists but the user still has to sign in
    Created,
}

/// API client for the portal backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
    refresher: Arc<RefreshCoordinator>,
    cache: Arc<RequestCache>,
}

impl ApiClient {
    pub fn new(config: &Config, session: Arc<SessionStore>, cache: Arc<RequestCache>) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            session,
            refresher: Arc::new(RefreshCoordinator::new()),
            cache,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn cache(&self) -> &Arc<RequestCache> {
        &self.cache
    }

    /// Number of refresh flights this client has started
    pub fn refresh_count(&self) -> u64 {
        self.refresher.started()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ===== Pipeline =====

    /// Run a request through both stages and return the decoded JSON body
    /// (`Value::Null` for an empty body).
    pub async fn execute(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let bearer = self.bearer_for_request(&request.path).await?;

        match self.dispatch(request, bearer.as_deref()).await {
            Err(ApiError::Unauthorized(body)) if endpoints::sends_credentials(&request.path) => {
                self.recover_unauthorized(request, bearer, body).await
            }
            other => other,
        }
    }

    /// Request stage: the token to attach, refreshing it first if expired
    async fn bearer_for_request(&self, path: &str) -> Result<Option<String>, ApiError> {
        if !endpoints::sends_credentials(path) {
            return Ok(None);
        }
        let Some(token) = self.session.access_token() else {
            return Ok(None);
        };
        if !self.session.is_expired() {
            return Ok(Some(token));
        }

        debug!(path = path, "Access token expired, refreshing before request");
        match self.refresh().await {
            Ok(token) => Ok(Some(token)),
            Err(RefreshError::SessionEnded) => Err(ApiError::SessionExpired),
            Err(e) => {
                warn!(path = path, error = %e, "Could not refresh expired token");
                self.session.expire(logout_reason(&e));
                Err(ApiError::SessionExpired)
            }
        }
    }

    /// Response stage for a 401, applied at most once per request
    async fn recover_unauthorized(
        &self,
        request: &ApiRequest,
        sent: Option<String>,
        body: String,
    ) -> Result<Value, ApiError> {
        let record = self.session.snapshot();

        if !record.is_expired() {
            // Another caller may have refreshed while this request was out
            let current = record.access_token.filter(|t| !t.is_empty());
            if let Some(current) = current.filter(|c| Some(c) != sent.as_ref()) {
                debug!(path = %request.path, "Retrying with the token refreshed meanwhile");
                return self.dispatch(request, Some(&current)).await;
            }
            debug!(path = %request.path, "401 with a live token, passing it through");
            return Err(ApiError::Unauthorized(body));
        }

        if record.refresh_token.as_deref().map_or(true, str::is_empty) {
            info!(path = %request.path, "401 with an expired token and nothing to refresh with");
            self.session.expire(LogoutReason::SessionExpired);
            return Err(ApiError::Unauthorized(body));
        }

        match self.refresh().await {
            Ok(token) => {
                debug!(path = %request.path, "Re-issuing request after refresh");
                self.dispatch(request, Some(&token)).await
            }
            // Signed out while the refresh ran; nothing left to recover
            Err(RefreshError::SessionEnded) => Err(ApiError::Unauthorized(body)),
            Err(e) => {
                warn!(path = %request.path, error = %e, "Refresh after 401 failed");
                self.session.expire(logout_reason(&e));
                self.session.require_login(Some(request.path.clone()));
                Err(ApiError::Unauthorized(body))
            }
        }
    }

    /// Send once with the given bearer and check the status
    async fn dispatch(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<Value, ApiError> {
        let mut builder = self.client.request(request.method.clone(), self.url(&request.path));
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(upload) => builder.multipart(upload.to_form()?),
        };

        debug!(method = %request.method, path = %request.path, authenticated = bearer.is_some(), "Sending request");
        let response = Self::check_response(builder.send().await?).await?;
        let text = response.text().await?;

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            warn!(path = %request.path, error = %e, "Response body is not JSON");
            ApiError::InvalidResponse(format!("{}: {}", request.path, e))
        })
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    // ===== Token refresh =====

    /// Refresh through the single-flight gate and return the new access token.
    /// The grant is dropped if the session ends before it arrives.
    async fn refresh(&self) -> RefreshOutcome {
        let client = self.client.clone();
        let url = self.url(endpoints::REFRESH_TOKEN);
        let session = Arc::clone(&self.session);

        self.refresher
            .run(move || {
                let epoch = session.epoch();
                async move {
                    // A flight that finished just before this one started
                    // may already have renewed the token
                    if let Some(token) = session.access_token().filter(|_| !session.is_expired()) {
                        debug!("Token already renewed, skipping refresh");
                        return Ok(token);
                    }
                    let refresh_token = session.refresh_token().ok_or(RefreshError::MissingRefreshToken)?;
                    let grant = request_refresh(&client, &url, &refresh_token).await?;
                    let access_token = grant.access_token.clone();
                    session.apply_refresh(epoch, grant)?;
                    Ok(access_token)
                }
            })
            .await
    }

    // ===== Typed helpers =====

    /// GET with the shared request cache
    async fn query<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let stale_after = chrono::Duration::seconds(DEFAULT_STALE_AFTER_SECS);
        if let Some(cached) = self.cache.fresh(path, stale_after) {
            debug!(path = path, "Serving cached response");
            return decode(path, cached);
        }

        let epoch = self.session.epoch();
        let value = self.execute(&ApiRequest::get(path)).await?;
        let decoded = decode(path, value.clone())?;
        if self.session.epoch() == epoch {
            self.cache.insert(path, value);
        } else {
            debug!(path = path, "Session ended during the request, not caching");
        }
        Ok(decoded)
    }

    /// GET a section, treating 404 as "not created yet"
    async fn query_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        match self.query(path).await {
            Ok(value) => Ok(Some(value)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Send a JSON body and invalidate the cached reads it affects
    async fn mutate<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        invalidates: &[&str],
    ) -> Result<T, ApiError> {
        let value = self.execute(&ApiRequest::json(method, path, body)?).await?;
        for stale in invalidates {
            self.cache.invalidate(stale);
        }
        decode(path, value)
    }

    /// Save a section snapshot. An empty response means the backend
    /// accepted the body as sent.
    async fn save_section<T>(&self, method: Method, path: &str, data: &T) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let value = self.execute(&ApiRequest::json(method, path, data)?).await?;
        self.cache.invalidate(path);
        self.cache.invalidate(endpoints::MY_APPLICATION);
        if value.is_null() {
            return Ok(data.clone());
        }
        decode(path, value)
    }

    // ===== Authentication =====

    /// Sign in and establish the session
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let value = self
            .execute(&ApiRequest::json(Method::POST, endpoints::LOGIN, &request)?)
            .await?;
        let grant = token_grant(endpoints::LOGIN, &value)?;
        let user = grant
            .user
            .clone()
            .ok_or_else(|| ApiError::InvalidResponse("login response carries no user".to_string()))?;

        self.install_grant(grant, user.clone());
        Ok(user)
    }

    /// Create an account; signs in directly when the backend returns tokens
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterOutcome, ApiError> {
        let value = self
            .execute(&ApiRequest::json(Method::POST, endpoints::REGISTER, request)?)
            .await?;

        match parse_token_response(&value.to_string()) {
            Ok(grant) => match grant.user.clone() {
                Some(user) => {
                    self.install_grant(grant, user.clone());
                    Ok(RegisterOutcome::SignedIn(user))
                }
                None => Ok(RegisterOutcome::Created),
            },
            Err(_) => Ok(RegisterOutcome::Created),
        }
    }

    fn install_grant(&self, grant: TokenGrant, user: UserProfile) {
        let expires_in = grant.expires_in(Utc::now());
        self.cache.clear();
        self.session
            .set_auth_data(grant.access_token, user, grant.refresh_token, expires_in);
    }

    // ===== Sections =====

    pub async fn fetch_bio_data(&self) -> Result<Option<BioData>, ApiError> {
        self.query_optional(endpoints::BIO_DATA).await
    }

    pub async fn create_bio_data(&self, data: &BioData) -> Result<BioData, ApiError> {
        self.save_section(Method::POST, endpoints::BIO_DATA, data).await
    }

    pub async fn update_bio_data(&self, data: &BioData) -> Result<BioData, ApiError> {
        self.save_section(Method::PUT, endpoints::BIO_DATA, data).await
    }

    pub async fn fetch_academic_history(&self) -> Result<Option<AcademicHistory>, ApiError> {
        self.query_optional(endpoints::ACADEMIC_HISTORY).await
    }

    pub async fn save_academic_history(&self, data: &AcademicHistory) -> Result<AcademicHistory, ApiError> {
        self.save_section(Method::POST, endpoints::ACADEMIC_HISTORY, data).await
    }

    pub async fn fetch_employment_history(&self) -> Result<Option<EmploymentHistory>, ApiError> {
        self.query_optional(endpoints::EMPLOYMENT_HISTORY).await
    }

    pub async fn save_employment_history(&self, data: &EmploymentHistory) -> Result<EmploymentHistory, ApiError> {
        self.save_section(Method::POST, endpoints::EMPLOYMENT_HISTORY, data).await
    }

    pub async fn fetch_recommendations(&self) -> Result<Option<Recommendations>, ApiError> {
        self.query_optional(endpoints::RECOMMENDATIONS).await
    }

    pub async fn save_recommendations(&self, data: &Recommendations) -> Result<Recommendations, ApiError> {
        self.save_section(Method::POST, endpoints::RECOMMENDATIONS, data).await
    }

    pub async fn upload_document(&self, upload: UploadPart) -> Result<UploadedDocument, ApiError> {
        let kind = upload.kind.clone();
        let file_name = upload.file_name.clone();
        let value = self
            .execute(&ApiRequest::multipart(endpoints::UPLOADS, upload))
            .await?;
        self.cache.invalidate(endpoints::MY_APPLICATION);

        let mut document: UploadedDocument = decode(endpoints::UPLOADS, value)?;
        if document.kind.is_empty() {
            document.kind = kind;
        }
        if document.file_name.is_none() {
            document.file_name = Some(file_name);
        }
        Ok(document)
    }

    pub async fn save_attestation(&self, data: &Attestation) -> Result<Attestation, ApiError> {
        self.save_section(Method::POST, endpoints::ATTESTATION, data).await
    }

    // ===== Payment =====

    pub async fn initialize_payment(&self, request: &PaymentInitRequest) -> Result<PaymentInit, ApiError> {
        self.mutate(Method::POST, endpoints::PAYMENT_INITIALIZE, request, &[endpoints::MY_APPLICATION])
            .await
    }

    /// Always goes to the backend; payment state changes outside this client
    pub async fn verify_payment(&self, reference: &str) -> Result<PaymentVerification, ApiError> {
        let path = endpoints::payment_verify(reference);
        let value = self.execute(&ApiRequest::get(&path)).await?;
        self.cache.invalidate(endpoints::MY_APPLICATION);
        decode(&path, value)
    }

    // ===== Application =====

    pub async fn fetch_my_application(&self) -> Result<Application, ApiError> {
        self.query(endpoints::MY_APPLICATION).await
    }

    pub async fn submit_application(&self, attestation: &Attestation) -> Result<SubmissionReceipt, ApiError> {
        let request = SubmitRequest {
            attestation: attestation.clone(),
        };
        self.mutate(Method::POST, endpoints::SUBMIT_APPLICATION, &request, &[endpoints::MY_APPLICATION])
            .await
    }

    /// Another applicant's application, for member and admin views
    pub async fn fetch_application(&self, id: &str) -> Result<Application, ApiError> {
        self.query(&endpoints::application(id)).await
    }
}

/// POST the refresh token and translate the answer into a `TokenGrant`
async fn request_refresh(client: &Client, url: &str, refresh_token: &str) -> Result<TokenGrant, RefreshError> {
    let response = client
        .post(url)
        .json(&json!({ "refresh_token": refresh_token }))
        .send()
        .await
        .map_err(|e| RefreshError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RefreshError::Rejected { status: status.as_u16() });
    }

    let body = response
        .text()
        .await
        .map_err(|e| RefreshError::Transport(e.to_string()))?;
    parse_token_response(&body).map_err(|e| {
        warn!(error = %e, "Unreadable refresh response");
        RefreshError::InvalidResponse(e)
    })
}

fn logout_reason(error: &RefreshError) -> LogoutReason {
    match error {
        RefreshError::MissingRefreshToken => LogoutReason::SessionExpired,
        _ => LogoutReason::RefreshFailed,
    }
}

fn token_grant(path: &str, value: &Value) -> Result<TokenGrant, ApiError> {
    parse_token_response(&value.to_string()).map_err(|e| {
        warn!(path = path, error = %e, "Unreadable token response");
        ApiError::InvalidResponse(format!("{}: {}", path, e))
    })
}

/// Decode a response body, unwrapping a `{"data": ...}` envelope first
fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, ApiError> {
    let value = match value {
        Value::Object(mut map) if map.len() == 1 => match map.remove("data") {
            Some(data) => data,
            None => Value::Object(map),
        },
        other => other,
    };
    serde_json::from_value(value).map_err(|e| {
        warn!(path = path, error = %e, "Response does not match the expected schema");
        ApiError::InvalidResponse(format!("{}: {}", path, e))
    })
}
