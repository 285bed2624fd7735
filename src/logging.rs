/// Diagnostic tracing to a file.
///
/// The terminal is in raw mode while the game runs, so nothing may be
/// written to stderr. Set `LADDER_LOG=/path/to/file` to capture the
/// `tracing` output; `RUST_LOG` picks the filter (default `info`).
///
/// ```bash
/// LADDER_LOG=ladder.log RUST_LOG=ladder_run=debug cargo run
/// ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "LADDER_LOG";

/// Install the file subscriber if `LADDER_LOG` names a file.
/// Without it every `tracing` call is a no-op.
pub fn init() -> anyhow::Result<()> {
    let path = match std::env::var_os(LOG_ENV) {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => return Ok(()),
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false).compact())
        .try_init()
        .context("tracing subscriber already installed")?;
    Ok(())
}
