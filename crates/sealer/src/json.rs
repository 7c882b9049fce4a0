//! JSON rendering shared by the envelope codec and the converters.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Serialise `value` as pretty JSON with 4-space indentation.
pub fn to_pretty_vec<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    Ok(out)
}
