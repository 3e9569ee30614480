//! Document representation.

use serde_json::{Map, Value};

/// A single key-value record stored in an index.
pub type Document = Map<String, Value>;

/// Build a document from a JSON value.
///
/// Returns `None` when the value is not a JSON object.
pub fn from_value(value: Value) -> Option<Document> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
