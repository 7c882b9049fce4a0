//! CSV → array of objects keyed by the header row.

use serde_json::{Map, Value};

use super::ConvertError;

/// Key under which fields beyond the header width are collected.
pub const EXTRA_FIELDS_KEY: &str = "_extra";

/// Convert CSV text to a JSON array with one object per record.
///
/// Columns keep header order. Short records fill the missing columns with
/// `null`; surplus fields go into an [`EXTRA_FIELDS_KEY`] array.
pub fn convert(raw: &[u8]) -> Result<Value, ConvertError> {
    let text = std::str::from_utf8(raw)?;
    let mut reader = ::csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = Map::new();
        for (i, name) in headers.iter().enumerate() {
            let cell = record
                .get(i)
                .map_or(Value::Null, |v| Value::String(v.to_owned()));
            row.insert(name.to_owned(), cell);
        }
        if record.len() > headers.len() {
            let extra = record
                .iter()
                .skip(headers.len())
                .map(|v| Value::String(v.to_owned()))
                .collect();
            row.insert(EXTRA_FIELDS_KEY.to_owned(), Value::Array(extra));
        }
        rows.push(Value::Object(row));
    }
    Ok(Value::Array(rows))
}
