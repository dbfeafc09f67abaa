//! Snapshot types for each step of the application.
//!
//! Field names follow the backend's camelCase contract. Every field is
//! optional so a partially filled section round-trips unchanged.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default, rename_all = "camelCase")]
pub struct BioData {
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub alternate_phone_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub nationality: Option<String>,
    pub state_of_origin: Option<String>,
    pub residential_address: Option<String>,
    pub next_of_kin_name: Option<String>,
    pub next_of_kin_phone: Option<String>,
}

impl BioData {
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.first_name, &self.middle_name, &self.last_name]
            .iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.trim().is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default, rename_all = "camelCase")]
pub struct AcademicQualification {
    pub institution: Option<String>,
    pub qualification: Option<String>,
    pub course_of_study: Option<String>,
    pub grade: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default, rename_all = "camelCase")]
pub struct AcademicHistory {
    pub qualifications: Vec<AcademicQualification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default, rename_all = "camelCase")]
pub struct Employment {
    pub employer: Option<String>,
    pub position: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub currently_employed: bool,
    pub responsibilities: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default, rename_all = "camelCase")]
pub struct EmploymentHistory {
    pub employments: Vec<Employment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default, rename_all = "camelCase")]
pub struct Referee {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub organization: Option<String>,
    pub relationship: Option<String>,
    /// Set by the backend once the referee has responded
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default, rename_all = "camelCase")]
pub struct Recommendations {
    pub referees: Vec<Referee>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default, rename_all = "camelCase")]
pub struct UploadedDocument {
    pub kind: String,
    pub file_name: Option<String>,
    pub url: Option<String>,
    pub uploaded_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default, rename_all = "camelCase")]
pub struct Uploads {
    pub documents: Vec<UploadedDocument>,
}

impl Uploads {
    /// Insert or replace the document of the same kind
    pub fn upsert(&mut self, document: UploadedDocument) {
        self.documents.retain(|d| d.kind != document.kind);
        self.documents.push(document);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default, rename_all = "camelCase")]
pub struct Attestation {
    pub agreed: bool,
    pub full_name: Option<String>,
    pub signed_on: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default, rename_all = "camelCase")]
pub struct Payment {
    pub reference: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub status: Option<String>,
    pub authorization_url: Option<String>,
    pub paid_on: Option<String>,
}

impl Payment {
    pub fn is_paid(&self) -> bool {
        matches!(self.status.as_deref(), Some("success") | Some("paid"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bio_data_camel_case_contract() {
        let json = r#"{"firstName": "Ada", "lastName": "Lovelace", "dateOfBirth": "1815-12-10"}"#;
        let bio: BioData = serde_json::from_str(json).expect("parse bio-data");
        assert_eq!(bio.full_name().as_deref(), Some("Ada Lovelace"));
        assert_eq!(bio.date_of_birth.as_deref(), Some("1815-12-10"));
        assert_eq!(BioData::default().full_name(), None);
    }

    #[test]
    fn test_uploads_upsert_replaces_same_kind() {
        let mut uploads = Uploads::default();
        uploads.upsert(UploadedDocument { kind: "cv".into(), file_name: Some("a.pdf".into()), ..Default::default() });
        uploads.upsert(UploadedDocument { kind: "transcript".into(), ..Default::default() });
        uploads.upsert(UploadedDocument { kind: "cv".into(), file_name: Some("b.pdf".into()), ..Default::default() });
        assert_eq!(uploads.documents.len(), 2);
        assert_eq!(uploads.documents[1].file_name.as_deref(), Some("b.pdf"));
    }

    #[test]
    fn test_payment_is_paid() {
        let mut payment = Payment::default();
        assert!(!payment.is_paid());
        payment.status = Some("success".into());
        assert!(payment.is_paid());
    }
}
