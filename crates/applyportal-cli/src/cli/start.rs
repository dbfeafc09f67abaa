use std::io;

use anyhow::Result;
use applyportal_core::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::{actions::Action, commands, dispatch::handler};

/// Log file name prefix inside the data directory's `logs/`
const LOG_FILE_PREFIX: &str = "applyportal.log";

/// Initialize the tracing subscriber: stderr plus a daily log file.
/// The returned guard flushes the file writer when dropped.
fn init_tracing(verbosity: u8) -> Option<WorkerGuard> {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match Config::default().data_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir.join("logs"), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// Start the CLI
pub fn start() -> Result<(Action, Option<WorkerGuard>)> {
    let matches = commands::new().get_matches();

    let verbosity = matches.get_one::<u8>("verbosity").copied().unwrap_or(0);
    let guard = init_tracing(verbosity);

    let action = handler(&matches)?;

    Ok((action, guard))
}
