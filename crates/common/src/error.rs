//! Caller-facing error taxonomy shared across crates.

use thiserror::Error;

/// Top-level error type reported by the `sealer` binary.
///
/// Every variant maps to a stable machine-readable code and a process exit
/// code, so callers can tell an authentication failure apart from a
/// malformed envelope without parsing messages:
/// - [`SealError::Unsupported`] → 2
/// - [`SealError::KeyLoad`] → 3
/// - [`SealError::KeyPersist`] → 4
/// - [`SealError::Authentication`] → 5
/// - [`SealError::MalformedEnvelope`] → 6
/// - [`SealError::Io`] → 7
/// - [`SealError::Conversion`] → 8
/// - [`SealError::Internal`] → 9
#[derive(Debug, Error)]
pub enum SealError {
    /// The key file is missing where one is required, unreadable, or the wrong length.
    #[error("key load failed: {0}")]
    KeyLoad(String),

    /// The key file could not be written, or a key already exists and overwrite was not requested.
    #[error("key persist failed: {0}")]
    KeyPersist(String),

    /// Tag verification failed: wrong key, wrong context, or tampered envelope.
    #[error("authentication failed: envelope was tampered with or the key does not match")]
    Authentication,

    /// The envelope document is not structurally valid.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// A filesystem operation on an input or output file failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A structured input could not be normalised to JSON.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// The input was rejected before reaching the encryption core.
    #[error("unsupported input: {0}")]
    Unsupported(String),

    /// An unexpected failure inside the tool itself.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SealError {
    /// Build an [`SealError::Io`] with a short description of the failed operation.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SealError::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the short machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            SealError::KeyLoad(_) => "key_load",
            SealError::KeyPersist(_) => "key_persist",
            SealError::Authentication => "authentication",
            SealError::MalformedEnvelope(_) => "malformed_envelope",
            SealError::Io { .. } => "io",
            SealError::Conversion(_) => "conversion",
            SealError::Unsupported(_) => "unsupported",
            SealError::Internal(_) => "internal",
        }
    }

    /// Returns the process exit code that should be used for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            SealError::Unsupported(_) => 2,
            SealError::KeyLoad(_) => 3,
            SealError::KeyPersist(_) => 4,
            SealError::Authentication => 5,
            SealError::MalformedEnvelope(_) => 6,
            SealError::Io { .. } => 7,
            SealError::Conversion(_) => 8,
            SealError::Internal(_) => 9,
        }
    }
}
