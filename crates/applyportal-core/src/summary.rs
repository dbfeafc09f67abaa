//! Read-only text rendering of an application, used by the summary and
//! review views.

use std::fmt::Write;

use crate::models::{
    AcademicHistory, Application, Attestation, BioData, EmploymentHistory, Payment,
    Recommendations, Uploads,
};
use crate::utils::{format_date, format_optional, truncate_string};

const MISSING: &str = "-";

/// Longest free-text value shown before truncation
const MAX_TEXT_WIDTH: usize = 60;

pub fn render_application(application: &Application) -> String {
    let mut out = String::new();

    let status = format_optional(&application.status, "draft");
    let _ = writeln!(out, "Status: {}", status);
    if let Some(at) = &application.submitted_at {
        let _ = writeln!(out, "Submitted: {}", format_date(at));
    }

    section(&mut out, "Bio-data", application.bio_data.as_ref(), render_bio_data);
    section(&mut out, "Academic History", application.academic_history.as_ref(), render_academic);
    section(&mut out, "Employment History", application.employment_history.as_ref(), render_employment);
    section(&mut out, "Recommendations", application.recommendations.as_ref(), render_recommendations);
    section(&mut out, "Documents", application.uploads.as_ref(), render_uploads);
    section(&mut out, "Attestation", application.attestation.as_ref(), render_attestation);
    section(&mut out, "Payment", application.payment.as_ref(), render_payment);
    out
}

fn section<T>(out: &mut String, title: &str, data: Option<&T>, render: fn(&mut String, &T)) {
    let _ = writeln!(out);
    let _ = writeln!(out, "== {} ==", title);
    match data {
        Some(data) => render(out, data),
        None => {
            let _ = writeln!(out, "  (not provided)");
        }
    }
}

fn field(out: &mut String, label: &str, value: &Option<String>) {
    let _ = writeln!(
        out,
        "  {:<18} {}",
        label,
        truncate_string(&format_optional(value, MISSING), MAX_TEXT_WIDTH)
    );
}

fn date_field(out: &mut String, label: &str, value: &Option<String>) {
    let shown = value.as_deref().map(format_date);
    field(out, label, &shown);
}

fn render_bio_data(out: &mut String, bio: &BioData) {
    field(out, "Name", &bio.full_name());
    field(out, "Email", &bio.email);
    field(out, "Phone", &bio.phone_number);
    date_field(out, "Date of birth", &bio.date_of_birth);
    field(out, "Gender", &bio.gender);
    field(out, "Nationality", &bio.nationality);
    field(out, "State of origin", &bio.state_of_origin);
    field(out, "Address", &bio.residential_address);
    field(out, "Next of kin", &bio.next_of_kin_name);
}

fn render_academic(out: &mut String, history: &AcademicHistory) {
    if history.qualifications.is_empty() {
        let _ = writeln!(out, "  No qualifications listed");
    }
    for q in &history.qualifications {
        let _ = writeln!(
            out,
            "  {} - {} ({})",
            format_optional(&q.qualification, MISSING),
            format_optional(&q.institution, MISSING),
            span(&q.start_date, &q.end_date)
        );
        if q.course_of_study.is_some() || q.grade.is_some() {
            let _ = writeln!(
                out,
                "    {} {}",
                format_optional(&q.course_of_study, ""),
                format_optional(&q.grade, "")
            );
        }
    }
}

fn render_employment(out: &mut String, history: &EmploymentHistory) {
    if history.employments.is_empty() {
        let _ = writeln!(out, "  No employment listed");
    }
    for e in &history.employments {
        let until = if e.currently_employed {
            Some("present".to_string())
        } else {
            e.end_date.clone()
        };
        let _ = writeln!(
            out,
            "  {} at {} ({})",
            format_optional(&e.position, MISSING),
            format_optional(&e.employer, MISSING),
            span(&e.start_date, &until)
        );
    }
}

fn render_recommendations(out: &mut String, recommendations: &Recommendations) {
    if recommendations.referees.is_empty() {
        let _ = writeln!(out, "  No referees listed");
    }
    for r in &recommendations.referees {
        let _ = writeln!(
            out,
            "  {} <{}> [{}]",
            format_optional(&r.full_name, MISSING),
            format_optional(&r.email, MISSING),
            format_optional(&r.status, "pending")
        );
    }
}

fn render_uploads(out: &mut String, uploads: &Uploads) {
    if uploads.documents.is_empty() {
        let _ = writeln!(out, "  No documents uploaded");
    }
    for d in &uploads.documents {
        let _ = writeln!(out, "  {:<18} {}", d.kind, format_optional(&d.file_name, MISSING));
    }
}

fn render_attestation(out: &mut String, attestation: &Attestation) {
    let agreed = if attestation.agreed { "yes" } else { "no" };
    let _ = writeln!(out, "  {:<18} {}", "Agreed", agreed);
    field(out, "Signed by", &attestation.full_name);
    date_field(out, "Signed on", &attestation.signed_on);
}

fn render_payment(out: &mut String, payment: &Payment) {
    field(out, "Reference", &payment.reference);
    let amount = payment.amount.map(|a| {
        format!("{:.2} {}", a, payment.currency.as_deref().unwrap_or_default())
            .trim_end()
            .to_string()
    });
    field(out, "Amount", &amount);
    field(out, "Status", &payment.status);
    date_field(out, "Paid on", &payment.paid_on);
}

fn span(start: &Option<String>, end: &Option<String>) -> String {
    let show = |d: &Option<String>| match d.as_deref() {
        Some("present") => "present".to_string(),
        Some(d) => format_date(d),
        None => "?".to_string(),
    };
    format!("{} to {}", show(start), show(end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Employment, Referee};

    #[test]
    fn test_render_marks_missing_sections() {
        let application = Application {
            status: Some("draft".into()),
            bio_data: Some(BioData {
                first_name: Some("Ada".into()),
                last_name: Some("Lovelace".into()),
                date_of_birth: Some("1990-05-17".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let text = render_application(&application);

        assert!(text.starts_with("Status: draft"));
        assert!(text.contains("Ada Lovelace"));
        assert!(text.contains("May 17, 1990"));
        assert!(text.contains("== Payment ==\n  (not provided)"));
    }

    #[test]
    fn test_render_lists() {
        let application = Application {
            employment_history: Some(EmploymentHistory {
                employments: vec![Employment {
                    employer: Some("Acme".into()),
                    position: Some("Engineer".into()),
                    start_date: Some("2019-02-01".into()),
                    currently_employed: true,
                    ..Default::default()
                }],
            }),
            recommendations: Some(Recommendations {
                referees: vec![Referee {
                    full_name: Some("Grace Hopper".into()),
                    email: Some("grace@example.org".into()),
                    ..Default::default()
                }],
            }),
            payment: Some(Payment {
                amount: Some(25000.0),
                currency: Some("NGN".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let text = render_application(&application);

        assert!(text.contains("Engineer at Acme (Feb 01, 2019 to present)"));
        assert!(text.contains("Grace Hopper <grace@example.org> [pending]"));
        assert!(text.contains("25000.00 NGN"));
        assert!(text.contains("Status: draft"));
    }
}
