//! Tracing subscriber initialisation.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Initialise the global tracing subscriber.
///
/// Configures an [`EnvFilter`] (from `RUST_LOG`, else `log_level`) and a
/// stderr formatter in the requested [`LogFormat`].
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init_telemetry(log_level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_target(false).try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialise tracing subscriber: {e}"))
}
