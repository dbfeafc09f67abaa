use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use applyportal_core::api::UploadPart;
use applyportal_core::stores::{NextGate, TOTAL_STEPS};
use applyportal_core::summary::render_application;
use applyportal_core::{Portal, SectionKind};
use serde_json::Value;

use super::StepTarget;

pub async fn sync(portal: &Portal) -> Result<()> {
    let report = portal.sync().await?;
    println!(
        "Synced {} section(s), status: {}",
        report.hydrated.len(),
        report.status.as_deref().unwrap_or("draft")
    );
    for kind in &report.hydrated {
        println!("  {}", kind.title());
    }
    if report.submitted {
        println!("This application has been submitted.");
    }
    Ok(())
}

pub fn show(portal: &Portal, section: SectionKind) -> Result<()> {
    let snapshot = portal.stores().snapshot_json(section);
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

pub fn edit(portal: &Portal, section: SectionKind, patch: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let text = match (patch, file) {
        (Some(patch), _) => patch,
        (None, Some(file)) => std::fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {}", file.display()))?,
        (None, None) => bail!("Nothing to apply"),
    };
    let patch: Value = serde_json::from_str(&text).context("Patch is not valid JSON")?;

    let merged = portal.stores().merge(section, patch)?;
    println!("{}", serde_json::to_string_pretty(&merged)?);
    println!("Saved locally. Send it with: applyportal push {}", section.key());
    Ok(())
}

pub async fn push(portal: &Portal, section: SectionKind) -> Result<()> {
    portal.push(section).await?;
    println!("{} saved", section.title());
    Ok(())
}

pub async fn upload(portal: &Portal, kind: String, path: PathBuf, mime: Option<String>) -> Result<()> {
    let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("{} has no file name", path.display()))?;

    let upload = UploadPart {
        kind,
        file_name,
        bytes,
        mime: mime.or_else(|| guess_mime(&path).map(str::to_string)),
    };
    let document = portal.upload(upload).await?;
    println!(
        "Uploaded {} as {}",
        document.file_name.as_deref().unwrap_or("document"),
        document.kind
    );
    Ok(())
}

pub fn step(portal: &Portal, target: StepTarget) -> Result<()> {
    let stepper = &portal.stores().stepper;
    match target {
        StepTarget::Show => {}
        StepTarget::Next => {
            let position = stepper.position();
            if position.next_gate() == NextGate::RequireValid {
                println!("Step {} has not been saved to the server yet", position.current_step);
            }
            stepper.next(TOTAL_STEPS);
        }
        StepTarget::Previous => {
            stepper.previous();
        }
        StepTarget::GoTo(step) => {
            if !stepper.go_to(step, TOTAL_STEPS) {
                bail!(
                    "Step {} is not reachable yet; complete step {} first",
                    step,
                    stepper.position().max_completed_step + 1
                );
            }
        }
    }

    let position = stepper.position();
    let title = SectionKind::from_step(position.current_step)
        .map(|k| k.title())
        .unwrap_or("Review and submit");
    println!("Step {} of {}: {}", position.current_step, TOTAL_STEPS, title);
    Ok(())
}

pub fn summary(portal: &Portal) -> Result<()> {
    print!("{}", render_application(&portal.stores().to_application()));
    Ok(())
}

pub async fn review(portal: &Portal, id: &str) -> Result<()> {
    let application = portal.review(id).await?;
    print!("{}", render_application(&application));
    Ok(())
}

fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "doc" => Some("application/msword"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime(Path::new("cv.PDF")), Some("application/pdf"));
        assert_eq!(guess_mime(Path::new("photo.jpeg")), Some("image/jpeg"));
        assert_eq!(guess_mime(Path::new("notes.txt")), None);
        assert_eq!(guess_mime(Path::new("README")), None);
    }
}
