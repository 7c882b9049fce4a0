//! Structured logging setup.
//!
//! # Telemetry invariants
//!
//! - **No key material or plaintext** may appear in any log field. Keys are
//!   identified only by their fingerprint.
//! - Logs go to stderr so stdout carries only the operation report.
//! - Level is configurable via `SEALER_LOG_LEVEL` (default: `warn`);
//!   `RUST_LOG` overrides it.

pub mod init;

pub use init::init_telemetry;
