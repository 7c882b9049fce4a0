//! Conversion between [`SealedPayload`] bytes and the textual [`EnvelopeDocument`].

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::protocol::{EnvelopeDocument, CIPHERTEXT_FIELD, NONCE_FIELD, TAG_FIELD};
use serde_json::Value;
use thiserror::Error;

use crate::crypto::{SealedPayload, NONCE_LEN, TAG_LEN};
use crate::json;

/// Errors produced while reading or writing an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The input is not well-formed JSON.
    #[error("not valid JSON: {0}")]
    NotJson(#[source] serde_json::Error),

    /// The JSON value is not an object.
    #[error("envelope must be a JSON object")]
    NotAnObject,

    /// A required field is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A required field is present but not a string.
    #[error("field `{0}` must be a string")]
    NotAString(&'static str),

    /// A field is not valid base64.
    #[error("field `{field}` is not valid base64: {source}")]
    InvalidEncoding {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    /// A fixed-size field decoded to the wrong number of bytes.
    #[error("field `{field}` must decode to {expected} bytes, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The document could not be serialised.
    #[error("failed to serialise envelope: {0}")]
    Serialise(#[source] serde_json::Error),
}

/// Encode a sealed payload into an envelope document.
pub fn encode(payload: &SealedPayload) -> EnvelopeDocument {
    EnvelopeDocument {
        nonce: STANDARD.encode(payload.nonce),
        ciphertext: STANDARD.encode(&payload.ciphertext),
        tag: STANDARD.encode(payload.tag),
    }
}

/// Decode an envelope document back into raw nonce, ciphertext and tag.
///
/// # Errors
///
/// Returns [`EnvelopeError::InvalidEncoding`] for non-base64 text and
/// [`EnvelopeError::InvalidLength`] if the nonce or tag has the wrong size.
pub fn decode(doc: &EnvelopeDocument) -> Result<SealedPayload, EnvelopeError> {
    let nonce = decode_fixed::<NONCE_LEN>(NONCE_FIELD, &doc.nonce)?;
    let ciphertext = decode_field(CIPHERTEXT_FIELD, &doc.ciphertext)?;
    let tag = decode_fixed::<TAG_LEN>(TAG_FIELD, &doc.tag)?;
    Ok(SealedPayload {
        nonce,
        ciphertext,
        tag,
    })
}

/// Render a document as the bytes written to disk.
///
/// # Errors
///
/// Returns [`EnvelopeError::Serialise`] if serialisation fails.
pub fn to_json(doc: &EnvelopeDocument) -> Result<Vec<u8>, EnvelopeError> {
    json::to_pretty_vec(doc).map_err(EnvelopeError::Serialise)
}

/// Parse envelope bytes read from disk.
///
/// Extra fields are ignored. Each required field is checked by name so the
/// error says which one is missing or mistyped.
///
/// # Errors
///
/// Returns [`EnvelopeError::NotJson`], [`EnvelopeError::NotAnObject`],
/// [`EnvelopeError::MissingField`] or [`EnvelopeError::NotAString`].
pub fn from_json(bytes: &[u8]) -> Result<EnvelopeDocument, EnvelopeError> {
    let value: Value = serde_json::from_slice(bytes).map_err(EnvelopeError::NotJson)?;
    let obj = value.as_object().ok_or(EnvelopeError::NotAnObject)?;

    let field = |name: &'static str| -> Result<String, EnvelopeError> {
        match obj.get(name) {
            None => Err(EnvelopeError::MissingField(name)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(EnvelopeError::NotAString(name)),
        }
    };

    Ok(EnvelopeDocument {
        nonce: field(NONCE_FIELD)?,
        ciphertext: field(CIPHERTEXT_FIELD)?,
        tag: field(TAG_FIELD)?,
    })
}

fn decode_field(field: &'static str, text: &str) -> Result<Vec<u8>, EnvelopeError> {
    STANDARD
        .decode(text)
        .map_err(|source| EnvelopeError::InvalidEncoding { field, source })
}

fn decode_fixed<const N: usize>(field: &'static str, text: &str) -> Result<[u8; N], EnvelopeError> {
    let bytes = decode_field(field, text)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| EnvelopeError::InvalidLength {
            field,
            expected: N,
            actual: bytes.len(),
        })
}
