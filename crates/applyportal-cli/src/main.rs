//! applyportal - fill in, save and submit an application from the terminal.
//!
//! Section data is kept locally between commands and pushed to the portal
//! backend on demand. The session refreshes its token transparently.

mod cli;

use anyhow::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let (action, _log_guard) = cli::start()?;
    info!("applyportal starting");

    cli::actions::handle(action).await
}
