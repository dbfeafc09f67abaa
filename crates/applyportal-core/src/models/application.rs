use serde::{Deserialize, Serialize};

use super::sections::{
    AcademicHistory, Attestation, BioData, EmploymentHistory, Payment, Recommendations, Uploads,
};

/// The unified "my application" aggregate.
/// Sections the applicant has not saved yet are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Application {
    pub id: Option<serde_json::Value>,
    pub status: Option<String>,
    pub submitted_at: Option<String>,
    pub bio_data: Option<BioData>,
    pub academic_history: Option<AcademicHistory>,
    pub employment_history: Option<EmploymentHistory>,
    pub recommendations: Option<Recommendations>,
    pub uploads: Option<Uploads>,
    pub attestation: Option<Attestation>,
    pub payment: Option<Payment>,
}

impl Application {
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some() || matches!(self.status.as_deref(), Some("submitted"))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub attestation: Attestation,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub status: String,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInit {
    pub reference: String,
    pub authorization_url: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub reference: String,
    pub status: String,
    #[serde(default)]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
}
