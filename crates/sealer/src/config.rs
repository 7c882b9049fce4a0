//! Configuration loading and validation for the `sealer` binary.
//!
//! Values are read from `SEALER_*` environment variables at startup. The
//! process exits with a clear error message if any value is invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::pipeline::DEFAULT_MAX_INPUT_BYTES;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line records.
    #[default]
    Text,
    /// One JSON object per record.
    Json,
}

/// Validated configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Location of the raw 32-byte key file (`SEALER_KEY_PATH`).
    #[serde(default = "default_key_path")]
    pub key_path: String,

    /// Directory every output is placed in, under the basename of the
    /// requested output path (`SEALER_OUTPUT_DIR`). Unset writes outputs
    /// exactly where requested.
    #[serde(default)]
    pub output_dir: Option<String>,

    /// Tracing filter (e.g. `"warn"`, `"sealer=debug"`). `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format (`SEALER_LOG_FORMAT`).
    #[serde(default)]
    pub log_format: LogFormat,

    /// Largest input, in bytes, read into memory (`SEALER_MAX_INPUT_BYTES`).
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: u64,
}

fn default_key_path() -> String {
    "key".into()
}
fn default_log_level() -> String {
    "warn".into()
}
fn default_max_input_bytes() -> u64 {
    DEFAULT_MAX_INPUT_BYTES
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("SEALER"))
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.key_path, "SEALER_KEY_PATH")?;
        if let Some(dir) = &self.output_dir {
            ensure_non_empty(dir, "SEALER_OUTPUT_DIR")?;
        }
        if self.max_input_bytes == 0 {
            anyhow::bail!("SEALER_MAX_INPUT_BYTES must be > 0");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} must not be empty");
    }
    Ok(())
}
