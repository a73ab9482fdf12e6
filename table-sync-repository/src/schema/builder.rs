//! Index schema builder.
//!
//! Derives the settings + mappings document for each managed index from the
//! model registry. Parent indices absorb the properties of their children so
//! join-routed child documents index cleanly alongside their parents.

use std::collections::HashMap;

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::errors::SearchIndexError;
use crate::schema::field_type::map_field_type;
use table_sync_shared::{ModelDescriptor, ModelRegistry};

/// Analysis configuration applied to every managed index: whitespace
/// tokenization, lowercasing, and ASCII folding that preserves the original
/// token.
fn index_settings() -> Value {
    json!({
        "analysis": {
            "analyzer": {
                "default": {
                    "tokenizer": "whitespace",
                    "filter": ["lowercase", "preserved_ascii_folding"]
                }
            },
            "filter": {
                "preserved_ascii_folding": {
                    "type": "asciifolding",
                    "preserve_original": true
                }
            }
        }
    })
}

/// Mapped properties of one model. Attributes with no field type mapping are
/// omitted with a warning.
pub fn model_properties(model: &ModelDescriptor) -> Result<Map<String, Value>, SearchIndexError> {
    let mut properties = Map::new();
    for attr in &model.attributes {
        match map_field_type(&attr.source_type, attr.tags.es_type.as_deref())? {
            Some(field_type) => {
                properties.insert(attr.name.clone(), json!({ "type": field_type }));
            }
            None => {
                warn!(
                    model = %model.document_name(),
                    attribute = %attr.name,
                    source_type = %attr.source_type,
                    "No field type mapping for attribute, omitting from schema"
                );
            }
        }
    }
    Ok(properties)
}

/// Build the index schema for one model as a JSON string.
///
/// Properties are the model's own, those of every child model, and the
/// `type` discriminator. Models with children additionally carry the `join`
/// property: a single child is stored as a scalar relation, several as a
/// sorted list. Output is byte-stable across runs.
pub fn build_schema(
    model: &ModelDescriptor,
    registry: &ModelRegistry,
) -> Result<String, SearchIndexError> {
    let doc_name = model.document_name();
    let mut properties = model_properties(model)?;

    for child_name in registry.children(doc_name) {
        let Some(child) = registry.get(child_name) else {
            continue;
        };
        for (name, value) in model_properties(child)? {
            match properties.get(&name).cloned() {
                Some(existing) if existing != value => {
                    return Err(SearchIndexError::PropertyConflict {
                        property: name,
                        existing: field_type_of(&existing),
                        conflicting: field_type_of(&value),
                    });
                }
                Some(_) => {}
                None => {
                    properties.insert(name, value);
                }
            }
        }
    }

    properties.insert("type".to_string(), json!({ "type": "keyword" }));

    let children = registry.children(doc_name);
    if !children.is_empty() {
        let relations = if children.len() == 1 {
            Value::String(children[0].clone())
        } else {
            json!(children)
        };
        let mut relations_map = Map::new();
        relations_map.insert(doc_name.to_string(), relations);
        properties.insert(
            "join".to_string(),
            json!({ "type": "join", "relations": relations_map }),
        );
    }

    let schema = json!({
        "settings": index_settings(),
        "mappings": { "properties": properties }
    });
    serde_json::to_string(&schema).map_err(|e| SearchIndexError::serialization(e.to_string()))
}

/// Build schemas for every managed model, keyed by index name.
pub fn build_schemas(registry: &ModelRegistry) -> Result<HashMap<String, String>, SearchIndexError> {
    let mut schemas = HashMap::with_capacity(registry.models().len());
    for model in registry.models() {
        schemas.insert(model.table.clone(), build_schema(model, registry)?);
    }
    Ok(schemas)
}

fn field_type_of(property: &Value) -> String {
    property
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
