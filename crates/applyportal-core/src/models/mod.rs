//! Data models for the application portal.
//!
//! - `UserProfile` and the login/registration payloads
//! - Section snapshots: `BioData`, `AcademicHistory`, `EmploymentHistory`,
//!   `Recommendations`, `Uploads`, `Attestation`, `Payment`
//! - `Application`: the "my application" aggregate, plus submission and
//!   payment payloads

pub mod application;
pub mod auth;
pub mod sections;

pub use application::{
    Application, PaymentInit, PaymentInitRequest, PaymentVerification, SubmissionReceipt,
    SubmitRequest,
};
pub use auth::{LoginRequest, RegisterRequest, UserId, UserProfile};
pub use sections::{
    AcademicHistory, AcademicQualification, Attestation, BioData, Employment, EmploymentHistory,
    Payment, Recommendations, Referee, UploadedDocument, Uploads,
};
