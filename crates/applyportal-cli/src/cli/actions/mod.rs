pub mod account;
pub mod application;
pub mod payment;

use std::path::PathBuf;

use anyhow::Result;
use applyportal_core::auth::{LogoutReason, SessionEvent};
use applyportal_core::{ApiError, Config, Disposition, Portal, SectionKind};
use tokio::sync::broadcast::Receiver;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum StepTarget {
    Show,
    Next,
    Previous,
    GoTo(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Login {
        email: Option<String>,
        password: Option<String>,
        remember: bool,
    },
    Register {
        email: String,
        first_name: String,
        last_name: String,
        phone: Option<String>,
        password: Option<String>,
    },
    Logout {
        forget: bool,
    },
    Status,
    Sync,
    Show {
        section: SectionKind,
    },
    Edit {
        section: SectionKind,
        patch: Option<String>,
        file: Option<PathBuf>,
    },
    Push {
        section: SectionKind,
    },
    Upload {
        kind: String,
        path: PathBuf,
        mime: Option<String>,
    },
    Pay {
        callback_url: Option<String>,
    },
    VerifyPayment {
        reference: Option<String>,
    },
    Submit,
    Step {
        target: StepTarget,
    },
    Summary,
    Review {
        id: String,
    },
}

/// Open the portal, run the action, then report session changes and
/// failures the way a front end would
pub async fn handle(action: Action) -> Result<()> {
    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };

    let portal = Portal::open(config.clone())?;
    let mut events = portal.session().subscribe();
    debug!(?action, "Running action");
    let signing_in = matches!(action, Action::Login { .. } | Action::Register { .. });

    let result = match action {
        Action::Login {
            email,
            password,
            remember,
        } => account::login(&portal, &mut config, email, password, remember).await,
        Action::Register {
            email,
            first_name,
            last_name,
            phone,
            password,
        } => account::register(&portal, &mut config, email, first_name, last_name, phone, password).await,
        Action::Logout { forget } => account::logout(&portal, &config, forget),
        Action::Status => account::status(&portal),
        Action::Sync => application::sync(&portal).await,
        Action::Show { section } => application::show(&portal, section),
        Action::Edit {
            section,
            patch,
            file,
        } => application::edit(&portal, section, patch, file),
        Action::Push { section } => application::push(&portal, section).await,
        Action::Upload { kind, path, mime } => application::upload(&portal, kind, path, mime).await,
        Action::Step { target } => application::step(&portal, target),
        Action::Summary => application::summary(&portal),
        Action::Review { id } => application::review(&portal, &id).await,
        Action::Pay { callback_url } => payment::pay(&portal, callback_url).await,
        Action::VerifyPayment { reference } => payment::verify(&portal, reference).await,
        Action::Submit => payment::submit(&portal).await,
    };

    let prompted = report_session_events(&mut events) || signing_in;

    if let Err(e) = &result {
        if let Some(api_error) = e.downcast_ref::<ApiError>() {
            match api_error.disposition(None) {
                Disposition::Login { .. } if !prompted => eprintln!("Please sign in again: applyportal login"),
                Disposition::Login { .. } => {}
                Disposition::ErrorPage { status } => eprintln!("The server refused the request ({})", status),
                Disposition::Notify(_) => {}
            }
        }
    }
    result
}

/// Print what front ends would react to. Returns whether the user was
/// already told to sign in again.
fn report_session_events(events: &mut Receiver<SessionEvent>) -> bool {
    let mut prompted = false;
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::LoggedOut { reason } if reason != LogoutReason::UserInitiated => {
                eprintln!("Your session has ended ({:?}); local application data was cleared.", reason);
            }
            SessionEvent::LoginRequired { return_to, .. } => {
                let hint = return_to.map(|p| format!(" to continue with {}", p)).unwrap_or_default();
                eprintln!("Sign in again{}: applyportal login", hint);
                prompted = true;
            }
            other => debug!(?other, "Session event"),
        }
    }
    prompted
}
