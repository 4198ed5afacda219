//! Diagnostic stream installation.
//!
//! `tracing` events from this binary and from the engine are formatted by a
//! fmt layer and written through the [`Logger`], so they land in the log file
//! and on the console under the same lock as progress lines.

use anyhow::{Result, anyhow};
use tdl_core::Logger;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "warn";

/// Installs the global subscriber writing into `logger`.
pub fn init(logger: &Logger) -> Result<()> {
    tracing_subscriber::registry()
        .with(build_env_filter())
        .with(
            fmt::layer()
                .with_writer(logger.clone())
                .with_ansi(false)
                .with_thread_ids(false),
        )
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
