//! XML → nested object rooted at the document element's children.

use roxmltree::{Document, Node};
use serde_json::{Map, Value};

use super::ConvertError;

/// Convert an XML document to a JSON object.
///
/// The root tag itself is dropped. A child with element children becomes a
/// nested object; a leaf becomes its text, or `null` when it has none.
/// Repeated sibling tags keep the last value.
pub fn convert(raw: &[u8]) -> Result<Value, ConvertError> {
    let text = std::str::from_utf8(raw)?;
    let doc = Document::parse(text)?;
    Ok(element_to_value(doc.root_element()))
}

fn element_to_value(element: Node<'_, '_>) -> Value {
    let mut map = Map::new();
    for child in element.children().filter(Node::is_element) {
        let value = if child.children().any(|n| n.is_element()) {
            element_to_value(child)
        } else {
            child
                .text()
                .map_or(Value::Null, |t| Value::String(t.to_owned()))
        };
        map.insert(tag_name(child), value);
    }
    Value::Object(map)
}

/// `local`, or `{namespace}local` for namespaced tags.
fn tag_name(node: Node<'_, '_>) -> String {
    let name = node.tag_name();
    match name.namespace() {
        Some(ns) => format!("{{{ns}}}{}", name.name()),
        None => name.name().to_owned(),
    }
}
