use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::models::{
    AcademicHistory, Application, Attestation, BioData, EmploymentHistory, Payment,
    Recommendations, Uploads,
};
use crate::storage::Storage;
use crate::utils::{normalize_phone, strip_time};

use super::persisted::{Section, SectionStore, StoreError};
use super::stepper::StepperStore;
use super::ResetRegistry;

/// Wizard steps: the seven sections followed by the final submission step
pub const TOTAL_STEPS: u32 = 8;

pub const SUBMISSION_STEP: u32 = 8;

fn normalize_date(date: &mut Option<String>) {
    if let Some(d) = date.as_mut() {
        *d = strip_time(d);
    }
}

fn normalize_phone_field(phone: &mut Option<String>) {
    if let Some(p) = phone.as_mut() {
        *p = normalize_phone(p);
    }
}

impl Section for BioData {
    const KEY: &'static str = "bio_data";

    fn normalize(&mut self) {
        normalize_date(&mut self.date_of_birth);
        normalize_phone_field(&mut self.phone_number);
        normalize_phone_field(&mut self.alternate_phone_number);
        normalize_phone_field(&mut self.next_of_kin_phone);
        if let Some(email) = self.email.as_mut() {
            *email = email.trim().to_lowercase();
        }
    }
}

impl Section for AcademicHistory {
    const KEY: &'static str = "academic_history";

    fn normalize(&mut self) {
        for q in &mut self.qualifications {
            normalize_date(&mut q.start_date);
            normalize_date(&mut q.end_date);
        }
    }
}

impl Section for EmploymentHistory {
    const KEY: &'static str = "employment_history";

    fn normalize(&mut self) {
        for e in &mut self.employments {
            normalize_date(&mut e.start_date);
            normalize_date(&mut e.end_date);
            if e.currently_employed {
                e.end_date = None;
            }
        }
    }
}

impl Section for Recommendations {
    const KEY: &'static str = "recommendations";

    fn normalize(&mut self) {
        for r in &mut self.referees {
            normalize_phone_field(&mut r.phone_number);
            if let Some(email) = r.email.as_mut() {
                *email = email.trim().to_lowercase();
            }
        }
    }
}

impl Section for Uploads {
    const KEY: &'static str = "uploads";
}

impl Section for Attestation {
    const KEY: &'static str = "attestation";

    fn normalize(&mut self) {
        normalize_date(&mut self.signed_on);
    }
}

impl Section for Payment {
    const KEY: &'static str = "payment";

    fn normalize(&mut self) {
        normalize_date(&mut self.paid_on);
    }
}

/// The seven application sections, in wizard order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    BioData,
    AcademicHistory,
    EmploymentHistory,
    Recommendations,
    Uploads,
    Attestation,
    Payment,
}

impl SectionKind {
    pub const ALL: [SectionKind; 7] = [
        SectionKind::BioData,
        SectionKind::AcademicHistory,
        SectionKind::EmploymentHistory,
        SectionKind::Recommendations,
        SectionKind::Uploads,
        SectionKind::Attestation,
        SectionKind::Payment,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SectionKind::BioData => BioData::KEY,
            SectionKind::AcademicHistory => AcademicHistory::KEY,
            SectionKind::EmploymentHistory => EmploymentHistory::KEY,
            SectionKind::Recommendations => Recommendations::KEY,
            SectionKind::Uploads => Uploads::KEY,
            SectionKind::Attestation => Attestation::KEY,
            SectionKind::Payment => Payment::KEY,
        }
    }

    /// 1-based wizard step
    pub fn step(&self) -> u32 {
        match self {
            SectionKind::BioData => 1,
            SectionKind::AcademicHistory => 2,
            SectionKind::EmploymentHistory => 3,
            SectionKind::Recommendations => 4,
            SectionKind::Uploads => 5,
            SectionKind::Attestation => 6,
            SectionKind::Payment => 7,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::BioData => "Bio-data",
            SectionKind::AcademicHistory => "Academic History",
            SectionKind::EmploymentHistory => "Employment History",
            SectionKind::Recommendations => "Recommendations",
            SectionKind::Uploads => "Documents",
            SectionKind::Attestation => "Attestation",
            SectionKind::Payment => "Payment",
        }
    }

    pub fn from_step(step: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.step() == step)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

impl FromStr for SectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.key() == wanted)
            .or(match wanted.as_str() {
                "bio" | "biodata" => Some(SectionKind::BioData),
                "academic" | "education" => Some(SectionKind::AcademicHistory),
                "employment" | "work" => Some(SectionKind::EmploymentHistory),
                "referees" => Some(SectionKind::Recommendations),
                "documents" => Some(SectionKind::Uploads),
                _ => None,
            })
            .ok_or_else(|| format!("unknown section: {}", s))
    }
}

/// Every section store plus the stepper, opened against one storage and
/// registered with one reset registry.
#[derive(Clone)]
pub struct ApplicationStores {
    pub bio_data: SectionStore<BioData>,
    pub academic_history: SectionStore<AcademicHistory>,
    pub employment_history: SectionStore<EmploymentHistory>,
    pub recommendations: SectionStore<Recommendations>,
    pub uploads: SectionStore<Uploads>,
    pub attestation: SectionStore<Attestation>,
    pub payment: SectionStore<Payment>,
    pub stepper: StepperStore,
}

impl ApplicationStores {
    pub fn open(storage: Arc<dyn Storage>, registry: &ResetRegistry) -> Self {
        Self {
            bio_data: SectionStore::open(storage.clone(), registry),
            academic_history: SectionStore::open(storage.clone(), registry),
            employment_history: SectionStore::open(storage.clone(), registry),
            recommendations: SectionStore::open(storage.clone(), registry),
            uploads: SectionStore::open(storage.clone(), registry),
            attestation: SectionStore::open(storage.clone(), registry),
            payment: SectionStore::open(storage.clone(), registry),
            stepper: StepperStore::open(storage, registry),
        }
    }

    /// Merge a partial JSON object into one section
    pub fn merge(&self, kind: SectionKind, partial: Value) -> Result<Value, StoreError> {
        match kind {
            SectionKind::BioData => self.bio_data.merge(partial).map(to_json),
            SectionKind::AcademicHistory => self.academic_history.merge(partial).map(to_json),
            SectionKind::EmploymentHistory => self.employment_history.merge(partial).map(to_json),
            SectionKind::Recommendations => self.recommendations.merge(partial).map(to_json),
            SectionKind::Uploads => self.uploads.merge(partial).map(to_json),
            SectionKind::Attestation => self.attestation.merge(partial).map(to_json),
            SectionKind::Payment => self.payment.merge(partial).map(to_json),
        }
    }

    /// Current snapshot of one section as JSON
    pub fn snapshot_json(&self, kind: SectionKind) -> Value {
        match kind {
            SectionKind::BioData => to_json(self.bio_data.snapshot()),
            SectionKind::AcademicHistory => to_json(self.academic_history.snapshot()),
            SectionKind::EmploymentHistory => to_json(self.employment_history.snapshot()),
            SectionKind::Recommendations => to_json(self.recommendations.snapshot()),
            SectionKind::Uploads => to_json(self.uploads.snapshot()),
            SectionKind::Attestation => to_json(self.attestation.snapshot()),
            SectionKind::Payment => to_json(self.payment.snapshot()),
        }
    }

    pub fn is_initialized(&self, kind: SectionKind) -> bool {
        match kind {
            SectionKind::BioData => self.bio_data.is_initialized(),
            SectionKind::AcademicHistory => self.academic_history.is_initialized(),
            SectionKind::EmploymentHistory => self.employment_history.is_initialized(),
            SectionKind::Recommendations => self.recommendations.is_initialized(),
            SectionKind::Uploads => self.uploads.is_initialized(),
            SectionKind::Attestation => self.attestation.is_initialized(),
            SectionKind::Payment => self.payment.is_initialized(),
        }
    }

    /// True when every section and the stepper hold their defaults
    pub fn is_empty(&self) -> bool {
        self.bio_data.is_default()
            && self.academic_history.is_default()
            && self.employment_history.is_default()
            && self.recommendations.is_default()
            && self.uploads.is_default()
            && self.attestation.is_default()
            && self.payment.is_default()
            && self.stepper.is_default()
    }

    /// Hydrate every section the server returned and mark its step complete.
    /// Returns the sections that were hydrated.
    pub fn apply_application(&self, application: &Application) -> Vec<SectionKind> {
        let mut hydrated = Vec::new();

        if let Some(s) = &application.bio_data {
            self.bio_data.hydrate(s.clone());
            hydrated.push(SectionKind::BioData);
        }
        if let Some(s) = &application.academic_history {
            self.academic_history.hydrate(s.clone());
            hydrated.push(SectionKind::AcademicHistory);
        }
        if let Some(s) = &application.employment_history {
            self.employment_history.hydrate(s.clone());
            hydrated.push(SectionKind::EmploymentHistory);
        }
        if let Some(s) = &application.recommendations {
            self.recommendations.hydrate(s.clone());
            hydrated.push(SectionKind::Recommendations);
        }
        if let Some(s) = &application.uploads {
            self.uploads.hydrate(s.clone());
            hydrated.push(SectionKind::Uploads);
        }
        if let Some(s) = &application.attestation {
            self.attestation.hydrate(s.clone());
            hydrated.push(SectionKind::Attestation);
        }
        if let Some(s) = &application.payment {
            self.payment.hydrate(s.clone());
            hydrated.push(SectionKind::Payment);
        }

        for kind in &hydrated {
            self.stepper.mark_complete(kind.step());
        }
        if application.is_submitted() {
            self.stepper.mark_complete(SUBMISSION_STEP);
        }
        debug!(count = hydrated.len(), "Applied server application");
        hydrated
    }

    /// Assemble the local snapshots into an application, leaving out
    /// sections still at their defaults
    pub fn to_application(&self) -> Application {
        fn present<T: Section + PartialEq>(store: &SectionStore<T>) -> Option<T> {
            if store.is_default() {
                None
            } else {
                Some(store.snapshot())
            }
        }

        Application {
            bio_data: present(&self.bio_data),
            academic_history: present(&self.academic_history),
            employment_history: present(&self.employment_history),
            recommendations: present(&self.recommendations),
            uploads: present(&self.uploads),
            attestation: present(&self.attestation),
            payment: present(&self.payment),
            ..Default::default()
        }
    }
}

fn to_json<T: serde::Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AcademicQualification, Referee};
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn open() -> (ApplicationStores, ResetRegistry) {
        let registry = ResetRegistry::new();
        let stores = ApplicationStores::open(Arc::new(MemoryStorage::new()), &registry);
        (stores, registry)
    }

    #[test]
    fn test_every_store_registers_for_reset() {
        let (_, registry) = open();
        let names = registry.names();
        for kind in SectionKind::ALL {
            assert!(names.iter().any(|n| n == kind.key()), "{} not registered", kind.key());
        }
        assert!(names.iter().any(|n| n == "stepper"));
    }

    #[test]
    fn test_bio_data_normalization() {
        let (stores, _) = open();
        stores
            .merge(
                SectionKind::BioData,
                json!({
                    "dateOfBirth": "1990-05-17T00:00:00.000Z",
                    "phoneNumber": "+234 (803) 123-4567",
                    "email": " Ada@Example.ORG "
                }),
            )
            .expect("merge");

        let bio = stores.bio_data.snapshot();
        assert_eq!(bio.date_of_birth.as_deref(), Some("1990-05-17"));
        assert_eq!(bio.phone_number.as_deref(), Some("+2348031234567"));
        assert_eq!(bio.email.as_deref(), Some("ada@example.org"));
    }

    #[test]
    fn test_list_sections_normalize_entries() {
        let (stores, _) = open();
        stores.academic_history.set(AcademicHistory {
            qualifications: vec![AcademicQualification {
                start_date: Some("2010-09-01T00:00:00Z".into()),
                end_date: Some("2014-07-01 12:00".into()),
                ..Default::default()
            }],
        });
        let q = &stores.academic_history.snapshot().qualifications[0];
        assert_eq!(q.start_date.as_deref(), Some("2010-09-01"));
        assert_eq!(q.end_date.as_deref(), Some("2014-07-01"));

        stores.recommendations.set(Recommendations {
            referees: vec![Referee { phone_number: Some("0803 123 4567".into()), ..Default::default() }],
        });
        assert_eq!(
            stores.recommendations.snapshot().referees[0].phone_number.as_deref(),
            Some("08031234567")
        );
    }

    #[test]
    fn test_current_employment_has_no_end_date() {
        let (stores, _) = open();
        stores
            .merge(
                SectionKind::EmploymentHistory,
                json!({"employments": [{"employer": "Acme", "currentlyEmployed": true, "endDate": "2020-01-01"}]}),
            )
            .expect("merge");
        assert_eq!(stores.employment_history.snapshot().employments[0].end_date, None);
    }

    #[test]
    fn test_apply_application_hydrates_and_marks_steps() {
        let (stores, _) = open();
        let application: Application = serde_json::from_value(json!({
            "status": "draft",
            "bioData": {"firstName": "Ada"},
            "academicHistory": {"qualifications": []},
            "recommendations": {"referees": []}
        }))
        .expect("parse");

        let hydrated = stores.apply_application(&application);
        assert_eq!(
            hydrated,
            vec![SectionKind::BioData, SectionKind::AcademicHistory, SectionKind::Recommendations]
        );
        assert!(stores.is_initialized(SectionKind::BioData));
        assert!(!stores.is_initialized(SectionKind::EmploymentHistory));
        assert_eq!(stores.stepper.position().max_completed_step, 4);
    }

    #[test]
    fn test_reset_returns_every_store_to_default() {
        let (stores, registry) = open();
        stores.merge(SectionKind::BioData, json!({"firstName": "Ada"})).expect("merge");
        stores.merge(SectionKind::Attestation, json!({"agreed": true})).expect("merge");
        stores.stepper.mark_complete(2);
        assert!(!stores.is_empty());

        registry.reset_all();
        assert!(stores.is_empty());
    }

    #[test]
    fn test_to_application_skips_defaults() {
        let (stores, _) = open();
        stores.merge(SectionKind::Payment, json!({"reference": "PAY-1"})).expect("merge");
        let app = stores.to_application();
        assert!(app.bio_data.is_none());
        assert_eq!(app.payment.and_then(|p| p.reference).as_deref(), Some("PAY-1"));
    }

    #[test]
    fn test_section_kind_parsing() {
        assert_eq!("bio-data".parse::<SectionKind>(), Ok(SectionKind::BioData));
        assert_eq!("Academic History".parse::<SectionKind>(), Ok(SectionKind::AcademicHistory));
        assert_eq!("referees".parse::<SectionKind>(), Ok(SectionKind::Recommendations));
        assert!("hobbies".parse::<SectionKind>().is_err());
        assert_eq!(SectionKind::from_step(5), Some(SectionKind::Uploads));
        assert_eq!(SectionKind::from_step(8), None);
    }
}
