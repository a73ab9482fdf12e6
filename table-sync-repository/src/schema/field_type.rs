//! Mapping from source attribute types to search-cluster field types.

use crate::errors::SearchIndexError;

/// Field types accepted as explicit `es_type` overrides.
const FIELD_TYPES: &[&str] = &[
    "text",
    "keyword",
    "long",
    "integer",
    "short",
    "byte",
    "double",
    "float",
    "half_float",
    "scaled_float",
    "boolean",
    "date",
    "binary",
    "object",
    "ip",
    "completion",
    "geo_point",
    "geo_shape",
];

/// Map a source type name, plus an optional override tag, to a
/// search-cluster field type.
///
/// An override must belong to the supported set. Without one the source type
/// name decides; homogeneous collections (`array<T>`, `set<T>`) are stripped
/// and the element type mapped. Unknown types map to `None` and the caller
/// omits the attribute: one unmappable attribute must not sink the rest of
/// the schema.
pub fn map_field_type(
    source_type: &str,
    override_tag: Option<&str>,
) -> Result<Option<&'static str>, SearchIndexError> {
    if let Some(tag) = override_tag {
        return match FIELD_TYPES.iter().copied().find(|t| *t == tag) {
            Some(field_type) => Ok(Some(field_type)),
            None => Err(SearchIndexError::invalid_field_type(tag)),
        };
    }
    Ok(from_source_type(source_type))
}

fn from_source_type(source_type: &str) -> Option<&'static str> {
    let name = source_type.trim();
    if let Some(element) = collection_element(name) {
        return from_source_type(element);
    }
    if name.starts_with("map<") || name.starts_with("hash<") {
        return Some("object");
    }
    match name {
        "bool" | "boolean" => Some("boolean"),
        "i8" | "int8" => Some("byte"),
        "i16" | "int16" => Some("short"),
        "i32" | "int32" | "int" => Some("integer"),
        "i64" | "int64" => Some("long"),
        "f32" | "float32" => Some("float"),
        "f64" | "float64" => Some("double"),
        "string" => Some("text"),
        "time" | "timestamp" | "datetime" => Some("date"),
        "json" | "object" | "record" | "hash" | "map" => Some("object"),
        _ => None,
    }
}

/// `array<T>` / `set<T>` → `T`.
fn collection_element(name: &str) -> Option<&str> {
    for prefix in ["array<", "set<"] {
        if let Some(rest) = name.strip_prefix(prefix) {
            return rest.strip_suffix('>');
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        assert_eq!(
            map_field_type("string", Some("keyword")).unwrap(),
            Some("keyword")
        );
        assert_eq!(
            map_field_type("anything", Some("geo_point")).unwrap(),
            Some("geo_point")
        );
    }

    #[test]
    fn test_invalid_override_rejected() {
        let err = map_field_type("string", Some("banana")).unwrap_err();
        assert!(matches!(err, SearchIndexError::InvalidFieldType(_)));
    }

    #[test]
    fn test_primitive_mappings() {
        assert_eq!(map_field_type("bool", None).unwrap(), Some("boolean"));
        assert_eq!(map_field_type("i8", None).unwrap(), Some("byte"));
        assert_eq!(map_field_type("i16", None).unwrap(), Some("short"));
        assert_eq!(map_field_type("i32", None).unwrap(), Some("integer"));
        assert_eq!(map_field_type("i64", None).unwrap(), Some("long"));
        assert_eq!(map_field_type("f32", None).unwrap(), Some("float"));
        assert_eq!(map_field_type("f64", None).unwrap(), Some("double"));
        assert_eq!(map_field_type("string", None).unwrap(), Some("text"));
        assert_eq!(map_field_type("timestamp", None).unwrap(), Some("date"));
        assert_eq!(map_field_type("json", None).unwrap(), Some("object"));
    }

    #[test]
    fn test_maps_and_hashes_are_objects() {
        assert_eq!(
            map_field_type("map<string,string>", None).unwrap(),
            Some("object")
        );
        assert_eq!(
            map_field_type("hash<string,i64>", None).unwrap(),
            Some("object")
        );
    }

    #[test]
    fn test_collections_recurse_on_element() {
        assert_eq!(map_field_type("array<i32>", None).unwrap(), Some("integer"));
        assert_eq!(map_field_type("set<string>", None).unwrap(), Some("text"));
        assert_eq!(
            map_field_type("array<array<i64>>", None).unwrap(),
            Some("long")
        );
    }

    #[test]
    fn test_unknown_types_are_omitted() {
        assert_eq!(map_field_type("uuid", None).unwrap(), None);
        assert_eq!(map_field_type("array<uuid>", None).unwrap(), None);
    }
}
