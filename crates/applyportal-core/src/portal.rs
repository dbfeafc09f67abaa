//! The applicant-facing portal: session, section stores and API client
//! wired together over one storage backend.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, RegisterOutcome, UploadPart};
use crate::auth::{CredentialStore, Keychain, SessionStore};
use crate::cache::RequestCache;
use crate::config::Config;
use crate::models::{
    Application, PaymentInit, PaymentInitRequest, PaymentVerification, RegisterRequest,
    SubmissionReceipt, UploadedDocument, UserProfile,
};
use crate::storage::{FileStorage, SealedStorage, Storage};
use crate::stores::{ApplicationStores, ResetRegistry, SectionKind, SUBMISSION_STEP};
use crate::utils::strip_time;

/// What a sync pulled from the backend
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub status: Option<String>,
    pub submitted: bool,
    pub hydrated: Vec<SectionKind>,
}

pub struct Portal {
    config: Config,
    session: Arc<SessionStore>,
    stores: ApplicationStores,
    api: ApiClient,
}

impl Portal {
    /// Open the portal over the on-disk data directory, sealed with the
    /// keychain storage key when encryption is enabled
    pub fn open(config: Config) -> Result<Self> {
        let dir = config.data_dir()?;
        let files = FileStorage::new(dir).context("Failed to open data directory")?;

        let storage: Arc<dyn Storage> = if config.encrypt_storage {
            match Keychain::storage_key() {
                Ok(key) => Arc::new(SealedStorage::new(files, key)),
                Err(e) => {
                    warn!(error = %e, "Keychain unavailable, storing data unencrypted");
                    Arc::new(files)
                }
            }
        } else {
            Arc::new(files)
        };

        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Arc<dyn Storage>) -> Result<Self> {
        let registry = Arc::new(ResetRegistry::new());
        let stores = ApplicationStores::open(Arc::clone(&storage), &registry);
        let cache = RequestCache::new(&registry);
        let session = Arc::new(SessionStore::open(
            CredentialStore::new(storage),
            Arc::clone(&registry),
            &config.login_path,
        ));
        let api = ApiClient::new(&config, Arc::clone(&session), cache)
            .context("Failed to create HTTP client")?;

        debug!(registered = ?registry.names(), "Portal opened");
        Ok(Self {
            config,
            session,
            stores,
            api,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn stores(&self) -> &ApplicationStores {
        &self.stores
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // ===== Session =====

    /// Sign in. Local data left by a different user is wiped first.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        self.end_foreign_session(email);
        let user = self.api.login(email, password).await?;
        info!(email = %user.email, "Signed in");
        Ok(user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterOutcome, ApiError> {
        self.end_foreign_session(&request.email);
        self.api.register(request).await
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    fn end_foreign_session(&self, email: &str) {
        if let Some(current) = self.session.user() {
            if !current.email.eq_ignore_ascii_case(email.trim()) {
                info!("Different account signing in, clearing local data");
                self.session.logout();
            }
        }
    }

    // ===== Sections =====

    /// Pull the application from the backend and hydrate every section
    /// it carries. Falls back to per-section reads when the aggregate
    /// does not exist yet.
    pub async fn sync(&self) -> Result<SyncReport, ApiError> {
        self.api.cache().invalidate(crate::api::endpoints::MY_APPLICATION);

        let application = match self.api.fetch_my_application().await {
            Ok(application) => application,
            Err(ApiError::NotFound(_)) => {
                debug!("No application aggregate yet, reading sections one by one");
                self.fetch_sections().await?
            }
            Err(e) => return Err(e),
        };

        let hydrated = self.stores.apply_application(&application);
        info!(sections = hydrated.len(), status = ?application.status, "Synced application");
        Ok(SyncReport {
            status: application.status.clone(),
            submitted: application.is_submitted(),
            hydrated,
        })
    }

    async fn fetch_sections(&self) -> Result<Application, ApiError> {
        let (bio_data, academic_history, employment_history, recommendations) = futures::join!(
            self.api.fetch_bio_data(),
            self.api.fetch_academic_history(),
            self.api.fetch_employment_history(),
            self.api.fetch_recommendations(),
        );

        Ok(Application {
            bio_data: bio_data?,
            academic_history: academic_history?,
            employment_history: employment_history?,
            recommendations: recommendations?,
            ..Default::default()
        })
    }

    /// Send one section's local snapshot to its endpoint and hydrate the
    /// store with what the backend saved
    pub async fn push(&self, kind: SectionKind) -> Result<(), ApiError> {
        match kind {
            SectionKind::BioData => {
                let data = self.stores.bio_data.snapshot();
                let saved = if self.stores.bio_data.is_initialized() {
                    self.api.update_bio_data(&data).await?
                } else {
                    self.api.create_bio_data(&data).await?
                };
                self.stores.bio_data.hydrate(saved);
            }
            SectionKind::AcademicHistory => {
                let saved = self
                    .api
                    .save_academic_history(&self.stores.academic_history.snapshot())
                    .await?;
                self.stores.academic_history.hydrate(saved);
            }
            SectionKind::EmploymentHistory => {
                let saved = self
                    .api
                    .save_employment_history(&self.stores.employment_history.snapshot())
                    .await?;
                self.stores.employment_history.hydrate(saved);
            }
            SectionKind::Recommendations => {
                let saved = self
                    .api
                    .save_recommendations(&self.stores.recommendations.snapshot())
                    .await?;
                self.stores.recommendations.hydrate(saved);
            }
            SectionKind::Attestation => {
                let mut attestation = self.stores.attestation.snapshot();
                if !attestation.agreed {
                    return Err(ApiError::InvalidRequest(
                        "the attestation has not been agreed to".to_string(),
                    ));
                }
                if attestation.signed_on.is_none() {
                    attestation.signed_on = Some(strip_time(&chrono::Utc::now().to_rfc3339()));
                }
                let saved = self.api.save_attestation(&attestation).await?;
                self.stores.attestation.hydrate(saved);
            }
            SectionKind::Uploads => {
                return Err(ApiError::InvalidRequest(
                    "documents are sent one at a time with upload".to_string(),
                ))
            }
            SectionKind::Payment => {
                return Err(ApiError::InvalidRequest(
                    "payments are started with pay and confirmed with verify".to_string(),
                ))
            }
        }

        self.stores.stepper.mark_complete(kind.step());
        info!(section = kind.key(), "Section saved");
        Ok(())
    }

    pub async fn upload(&self, upload: UploadPart) -> Result<UploadedDocument, ApiError> {
        let document = self.api.upload_document(upload).await?;
        self.stores.uploads.update(|uploads| uploads.upsert(document.clone()));
        self.stores.stepper.mark_complete(SectionKind::Uploads.step());
        Ok(document)
    }

    // ===== Payment and submission =====

    pub async fn pay(&self, callback_url: Option<String>) -> Result<PaymentInit, ApiError> {
        let init = self
            .api
            .initialize_payment(&PaymentInitRequest { callback_url })
            .await?;

        self.stores.payment.update(|payment| {
            payment.reference = Some(init.reference.clone());
            payment.authorization_url = Some(init.authorization_url.clone());
            payment.amount = init.amount.or(payment.amount);
            payment.currency = init.currency.clone().or(payment.currency.take());
            payment.status = Some("pending".to_string());
        });
        Ok(init)
    }

    /// Verify a payment, by default the one started last
    pub async fn verify_payment(&self, reference: Option<&str>) -> Result<PaymentVerification, ApiError> {
        let reference = match reference {
            Some(r) => r.to_string(),
            None => self.stores.payment.snapshot().reference.ok_or_else(|| {
                ApiError::InvalidRequest("no payment has been started".to_string())
            })?,
        };

        let verification = self.api.verify_payment(&reference).await?;
        let paid = self.stores.payment.update(|payment| {
            payment.reference = Some(verification.reference.clone());
            payment.status = Some(verification.status.clone());
            payment.paid_on = verification.paid_at.clone();
            if verification.amount.is_some() {
                payment.amount = verification.amount;
            }
            payment.is_paid()
        });
        if paid {
            self.stores.stepper.mark_complete(SectionKind::Payment.step());
        }
        Ok(verification)
    }

    pub async fn submit(&self) -> Result<SubmissionReceipt, ApiError> {
        let attestation = self.stores.attestation.snapshot();
        if !attestation.agreed {
            return Err(ApiError::InvalidRequest(
                "agree to the attestation before submitting".to_string(),
            ));
        }

        let receipt = self.api.submit_application(&attestation).await?;
        self.stores.stepper.mark_complete(SUBMISSION_STEP);
        info!(status = %receipt.status, "Application submitted");
        Ok(receipt)
    }

    /// Another applicant's application, for members and admins
    pub async fn review(&self, id: &str) -> Result<Application, ApiError> {
        if let Some(user) = self.session.user() {
            if !user.is_reviewer() {
                return Err(ApiError::AccessDenied(format!(
                    "role {} cannot review applications",
                    user.role_or_default()
                )));
            }
        }
        self.api.fetch_application(id).await
    }
}
