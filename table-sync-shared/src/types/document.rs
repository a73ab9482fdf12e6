//! JSON documents exchanged with the primary store and the search cluster.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of a managed table, as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build from any JSON value. Non-objects are rejected.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// The document id, when present as a string field named `id`.
    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    /// A string field by name. `None` for missing or non-string values.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Document {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_and_field_access() {
        let doc = Document::from_value(json!({
            "id": "C1",
            "programmer_id": "P1",
            "strength": 3
        }))
        .unwrap();

        assert_eq!(doc.id(), Some("C1"));
        assert_eq!(doc.get_str("programmer_id"), Some("P1"));
        assert_eq!(doc.get_str("strength"), None);
        assert_eq!(doc.get_str("missing"), None);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Document::from_value(json!("scalar")).is_none());
        assert!(Document::from_value(json!([1, 2, 3])).is_none());
    }
}
