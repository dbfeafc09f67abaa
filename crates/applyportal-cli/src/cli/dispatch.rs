use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use applyportal_core::SectionKind;
use clap::ArgMatches;

use crate::cli::actions::{Action, StepTarget};

fn string(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.get_one::<String>(id).cloned()
}

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    string(matches, id).ok_or_else(|| anyhow!("missing required argument: {}", id))
}

fn section(matches: &ArgMatches) -> Result<SectionKind> {
    matches
        .get_one::<SectionKind>("section")
        .copied()
        .ok_or_else(|| anyhow!("missing required argument: section"))
}

fn step_target(raw: &str) -> Result<StepTarget> {
    match raw.trim().to_lowercase().as_str() {
        "show" | "" => Ok(StepTarget::Show),
        "next" => Ok(StepTarget::Next),
        "prev" | "previous" | "back" => Ok(StepTarget::Previous),
        other => other
            .parse::<u32>()
            .map(StepTarget::GoTo)
            .with_context(|| format!("unknown step target: {}", raw)),
    }
}

pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let (name, sub_m) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("no command given"))?;

    let action = match name {
        "login" => Action::Login {
            email: string(sub_m, "email"),
            password: string(sub_m, "password"),
            remember: sub_m.get_flag("remember"),
        },
        "register" => Action::Register {
            email: required(sub_m, "email")?,
            first_name: required(sub_m, "first-name")?,
            last_name: required(sub_m, "last-name")?,
            phone: string(sub_m, "phone"),
            password: string(sub_m, "password"),
        },
        "logout" => Action::Logout {
            forget: sub_m.get_flag("forget"),
        },
        "status" => Action::Status,
        "sync" => Action::Sync,
        "show" => Action::Show {
            section: section(sub_m)?,
        },
        "edit" => Action::Edit {
            section: section(sub_m)?,
            patch: string(sub_m, "patch"),
            file: string(sub_m, "file").map(PathBuf::from),
        },
        "push" => Action::Push {
            section: section(sub_m)?,
        },
        "upload" => Action::Upload {
            kind: required(sub_m, "kind")?,
            path: PathBuf::from(required(sub_m, "path")?),
            mime: string(sub_m, "mime"),
        },
        "pay" => Action::Pay {
            callback_url: string(sub_m, "callback-url"),
        },
        "verify-payment" => Action::VerifyPayment {
            reference: string(sub_m, "reference"),
        },
        "submit" => Action::Submit,
        "step" => Action::Step {
            target: step_target(&string(sub_m, "target").unwrap_or_default())?,
        },
        "summary" => Action::Summary,
        "review" => Action::Review {
            id: required(sub_m, "id")?,
        },
        other => return Err(anyhow!("unknown command: {}", other)),
    };

    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    fn parse(args: &[&str]) -> Result<Action> {
        let matches = commands::new().try_get_matches_from(args)?;
        handler(&matches)
    }

    #[test]
    fn test_login_flags() {
        let action = parse(&["applyportal", "login", "-e", "ada@example.org", "--remember"]).expect("login");
        assert_eq!(
            action,
            Action::Login {
                email: Some("ada@example.org".into()),
                password: None,
                remember: true,
            }
        );
    }

    #[test]
    fn test_edit_with_inline_patch() {
        let action = parse(&["applyportal", "edit", "bio-data", r#"{"firstName": "Ada"}"#]).expect("edit");
        assert_eq!(
            action,
            Action::Edit {
                section: SectionKind::BioData,
                patch: Some(r#"{"firstName": "Ada"}"#.into()),
                file: None,
            }
        );
    }

    #[test]
    fn test_step_targets() {
        assert_eq!(
            parse(&["applyportal", "step"]).expect("step"),
            Action::Step { target: StepTarget::Show }
        );
        assert_eq!(
            parse(&["applyportal", "step", "3"]).expect("step"),
            Action::Step { target: StepTarget::GoTo(3) }
        );
        assert_eq!(
            parse(&["applyportal", "step", "prev"]).expect("step"),
            Action::Step { target: StepTarget::Previous }
        );
        assert!(parse(&["applyportal", "step", "sideways"]).is_err());
    }

    #[test]
    fn test_review_needs_id() {
        assert!(parse(&["applyportal", "review"]).is_err());
        assert_eq!(
            parse(&["applyportal", "review", "42"]).expect("review"),
            Action::Review { id: "42".into() }
        );
    }
}
