//! Normalisation of structured inputs (CSV, XML, key:value text) to JSON.
//!
//! Converted bytes are handed straight to the pipeline; nothing is written to
//! disk in plaintext form. All output is UTF-8 JSON with 4-space indentation.

pub mod csv;
pub mod text;
pub mod xml;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::classify::ContentKind;
use crate::json;

/// Errors produced by the converters.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The input is not valid UTF-8.
    #[error("input is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// The CSV reader rejected the input.
    #[error("invalid CSV: {0}")]
    Csv(#[from] ::csv::Error),

    /// The XML parser rejected the input.
    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The converted value could not be rendered.
    #[error("failed to render JSON: {0}")]
    Render(#[from] serde_json::Error),

    /// The content kind has no structured conversion.
    #[error("{0} input has no JSON conversion")]
    NotConvertible(ContentKind),
}

/// Convert `raw` input of the given kind into pretty JSON bytes.
///
/// # Errors
///
/// Returns [`ConvertError::NotConvertible`] for kinds that are encrypted as-is,
/// or the parser/encoding error of the matching converter.
pub fn to_json(kind: ContentKind, raw: &[u8]) -> Result<Vec<u8>, ConvertError> {
    let value = match kind {
        ContentKind::Csv => csv::convert(raw)?,
        ContentKind::Xml => xml::convert(raw)?,
        ContentKind::KeyValueText => text::convert(raw)?,
        ContentKind::Pdf | ContentKind::Envelope => return Err(ConvertError::NotConvertible(kind)),
    };
    let rendered = render(&value)?;
    debug!(kind = %kind, input_bytes = raw.len(), json_bytes = rendered.len(), "converted to JSON");
    Ok(rendered)
}

fn render(value: &Value) -> Result<Vec<u8>, ConvertError> {
    Ok(json::to_pretty_vec(value)?)
}
