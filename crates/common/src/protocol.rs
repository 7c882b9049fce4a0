//! Persisted envelope layout and the reports printed by the CLI.
//!
//! These types are serialised as JSON: the envelope to disk, the reports to
//! stdout/stderr when `--json` is requested.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Envelope document
// ---------------------------------------------------------------------------

/// Field holding the encoded nonce.
pub const NONCE_FIELD: &str = "nonce";
/// Field holding the encoded ciphertext.
pub const CIPHERTEXT_FIELD: &str = "ciphertext";
/// Field holding the encoded authentication tag.
pub const TAG_FIELD: &str = "tag";

/// The persisted envelope: one document per encrypted payload.
///
/// Each field carries the standard-base64 text of the corresponding raw
/// bytes. Field names are part of the on-disk format and must not change;
/// field order is not significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeDocument {
    /// Base64 of the 12-byte nonce.
    pub nonce: String,
    /// Base64 of the ciphertext (same length as the plaintext).
    pub ciphertext: String,
    /// Base64 of the 16-byte authentication tag.
    pub tag: String,
}

impl EnvelopeDocument {
    /// Required field names, in canonical order.
    pub const FIELDS: [&'static str; 3] = [NONCE_FIELD, CIPHERTEXT_FIELD, TAG_FIELD];
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Printed on success when `--json` is requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    /// `"encrypt"`, `"decrypt"` or `"keygen"`.
    pub mode: String,
    /// Where the result was written.
    pub output: String,
    /// Detected input kind, when the operation had an input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_kind: Option<String>,
    /// Number of bytes written to `output`.
    pub bytes_written: u64,
}

/// Printed on failure when `--json` is requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Short machine-readable error code (e.g. `"authentication"`).
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl ErrorReport {
    /// Construct an [`ErrorReport`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::SealError> for ErrorReport {
    fn from(err: &crate::SealError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}
