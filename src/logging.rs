//! Tracing subscriber setup for the CLI.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::retro_config::LogFormat;

/// Pick the filter: `RUST_LOG` wins, then `--verbose`, then the configured level.
pub fn filter_for(level: &str, verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let directive = if verbose { "debug" } else { level };
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable.
pub fn init(level: &str, format: LogFormat, verbose: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter_for(level, verbose))
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
