//! Plain `key: value` text → flat object.

use serde_json::{Map, Value};

use super::ConvertError;

/// Convert `key: value` lines to a JSON object.
///
/// Each line containing a colon is split at the first one and both sides are
/// trimmed. Lines without a colon are skipped. A repeated key keeps its last value.
pub fn convert(raw: &[u8]) -> Result<Value, ConvertError> {
    let text = std::str::from_utf8(raw)?;
    let mut map = Map::new();
    for line in text.lines() {
        if let Some((key, value)) = line.trim().split_once(':') {
            map.insert(key.trim().to_owned(), Value::String(value.trim().to_owned()));
        }
    }
    Ok(Value::Object(map))
}
