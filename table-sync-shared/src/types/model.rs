//! Model metadata descriptors.
//!
//! A `ModelDescriptor` is the static description of one managed table: its
//! fully-qualified model name, its physical table (which doubles as the
//! search index name), and its attributes with the tags that influence
//! indexing.

use serde::{Deserialize, Serialize};

/// Tags attached to a model attribute that influence indexing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeTags {
    /// Explicit override of the search-cluster field type (e.g. `keyword`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub es_type: Option<String>,
    /// Document name of the parent model this attribute routes into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// A single attribute of a managed model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    /// Type name in the primary store (e.g. `string`, `i64`, `array<string>`).
    pub source_type: String,
    #[serde(default)]
    pub tags: AttributeTags,
}

impl Attribute {
    pub fn new(name: impl Into<String>, source_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_type: source_type.into(),
            tags: AttributeTags::default(),
        }
    }

    /// Override the derived search-cluster field type.
    pub fn with_es_type(mut self, es_type: impl Into<String>) -> Self {
        self.tags.es_type = Some(es_type.into());
        self
    }

    /// Mark this attribute as the routing key into the named parent.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.tags.parent = Some(parent.into());
        self
    }
}

/// Static description of one managed model.
///
/// `name` is the fully-qualified model name; the last `::` segment is the
/// document name used as the `type` discriminator and in join relations.
/// `table` is the physical table in the primary store and, by convention,
/// the index name in the search cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub table: String,
    pub attributes: Vec<Attribute>,
}

impl ModelDescriptor {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        attributes: Vec<Attribute>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            attributes,
        }
    }

    /// Last path segment of the fully-qualified name.
    pub fn document_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }
}

/// Resolved parent relation of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parent {
    /// Document name of the parent model.
    pub name: String,
    /// The parent's index in the search cluster.
    pub index: String,
    /// Attribute on the child whose value is the parent's id.
    pub routing_attr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_name_strips_namespaces() {
        let model = ModelDescriptor::new("Beverage::Coffee", "coffees", vec![]);
        assert_eq!(model.document_name(), "Coffee");

        let flat = ModelDescriptor::new("Programmer", "programmers", vec![]);
        assert_eq!(flat.document_name(), "Programmer");

        let deep = ModelDescriptor::new("A::B::C", "cs", vec![]);
        assert_eq!(deep.document_name(), "C");
    }

    #[test]
    fn test_attribute_builders() {
        let attr = Attribute::new("programmer_id", "string").with_parent("Programmer");
        assert_eq!(attr.tags.parent.as_deref(), Some("Programmer"));
        assert_eq!(attr.tags.es_type, None);

        let attr = Attribute::new("id", "string").with_es_type("keyword");
        assert_eq!(attr.tags.es_type.as_deref(), Some("keyword"));
    }
}
