use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use applyportal_core::api::RegisterOutcome;
use applyportal_core::auth::Keychain;
use applyportal_core::models::RegisterRequest;
use applyportal_core::stores::TOTAL_STEPS;
use applyportal_core::{Config, Portal, SectionKind};
use tracing::warn;

pub async fn login(
    portal: &Portal,
    config: &mut Config,
    email: Option<String>,
    password: Option<String>,
    remember: bool,
) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    if email.is_empty() {
        bail!("An email is required");
    }

    let password = match password {
        Some(p) => p,
        None if Keychain::has_password(&email) => Keychain::get_password(&email)?,
        None => rpassword::prompt_password("Password: ")?,
    };

    println!("Signing in...");
    let user = portal.login(&email, &password).await?;

    if remember {
        if let Err(e) = Keychain::store_password(&email, &password) {
            warn!(error = %e, "Failed to remember password");
        }
    }

    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Signed in as {} ({})", user.email, user.role_or_default());
    Ok(())
}

pub async fn register(
    portal: &Portal,
    config: &mut Config,
    email: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => {
            let first = rpassword::prompt_password("Password: ")?;
            let again = rpassword::prompt_password("Repeat password: ")?;
            if first != again {
                bail!("Passwords do not match");
            }
            first
        }
    };

    let request = RegisterRequest {
        email: email.trim().to_string(),
        password,
        first_name,
        last_name,
        phone_number: phone,
    };

    match portal.register(&request).await? {
        RegisterOutcome::SignedIn(user) => println!("Account created, signed in as {}", user.email),
        RegisterOutcome::Created => println!("Account created. Sign in with: applyportal login"),
    }

    config.last_email = Some(request.email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
    Ok(())
}

pub fn logout(portal: &Portal, config: &Config, forget: bool) -> Result<()> {
    let email = portal.session().user().map(|u| u.email).or_else(|| config.last_email.clone());
    portal.logout();

    if forget {
        if let Some(email) = email {
            Keychain::delete_password(&email).context("Failed to remove remembered password")?;
        }
    }
    println!("Signed out. Local application data cleared.");
    Ok(())
}

pub fn status(portal: &Portal) -> Result<()> {
    let record = portal.session().snapshot();
    match &record.user {
        Some(user) if record.is_authenticated() => {
            println!("Signed in as {} ({})", user.email, user.role_or_default());
            match record.minutes_until_expiry() {
                Some(0) => println!("Access token expired, it will be refreshed on the next request"),
                Some(m) => println!("Access token valid for {} more minute(s)", m),
                None => println!("Access token has no recorded expiry"),
            }
        }
        _ => println!("Not signed in"),
    }

    let position = portal.stores().stepper.position();
    println!();
    println!("Step {} of {}", position.current_step, TOTAL_STEPS);
    for kind in SectionKind::ALL {
        let mark = if position.is_complete(kind.step()) { "x" } else { " " };
        let synced = if portal.stores().is_initialized(kind) { "" } else { " (local only)" };
        println!("  [{}] {}. {}{}", mark, kind.step(), kind.title(), synced);
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
