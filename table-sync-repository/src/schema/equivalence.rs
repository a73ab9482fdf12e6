//! Mapping equivalence used by the reconciler.

use serde_json::{Map, Value};

/// Whether a live mapping and a derived mapping describe the same index.
///
/// Property key sets must match exactly and non-`join` properties must be
/// deeply equal. The `join` property compares by relations after
/// normalization — a one-element list collapses to its scalar and lists
/// sort — so child ordering and scalar-versus-singleton differences do not
/// count as drift. A missing mapping on either side is never equivalent.
pub fn mappings_equivalent(live: Option<&Value>, derived: Option<&Value>) -> bool {
    let (Some(live), Some(derived)) = (live, derived) else {
        return false;
    };
    let (Some(live_props), Some(derived_props)) = (properties(live), properties(derived)) else {
        return false;
    };

    let mut live_keys: Vec<&String> = live_props.keys().collect();
    let mut derived_keys: Vec<&String> = derived_props.keys().collect();
    live_keys.sort();
    derived_keys.sort();
    if live_keys != derived_keys {
        return false;
    }

    for (key, derived_value) in derived_props {
        let Some(live_value) = live_props.get(key) else {
            return false;
        };
        if key == "join" {
            if !join_equivalent(live_value, derived_value) {
                return false;
            }
        } else if live_value != derived_value {
            return false;
        }
    }
    true
}

fn properties(mappings: &Value) -> Option<&Map<String, Value>> {
    mappings.get("properties").and_then(Value::as_object)
}

fn join_equivalent(live: &Value, derived: &Value) -> bool {
    let (Some(live_relations), Some(derived_relations)) = (relations(live), relations(derived))
    else {
        return false;
    };
    if live_relations.len() != derived_relations.len() {
        return false;
    }
    derived_relations.iter().all(|(name, derived_value)| {
        live_relations
            .get(name)
            .is_some_and(|live_value| normalize(live_value) == normalize(derived_value))
    })
}

fn relations(join: &Value) -> Option<&Map<String, Value>> {
    join.get("relations").and_then(Value::as_object)
}

/// Single-element lists collapse to their scalar; longer lists sort.
fn normalize(value: &Value) -> Value {
    match value {
        Value::Array(items) if items.len() == 1 => items[0].clone(),
        Value::Array(items) => {
            let mut items = items.clone();
            items.sort_by_key(|item| item.to_string());
            Value::Array(items)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapping(properties: Value) -> Value {
        json!({ "properties": properties })
    }

    #[test]
    fn test_equivalence_is_reflexive() {
        let mappings = mapping(json!({
            "id": { "type": "keyword" },
            "name": { "type": "text" },
            "type": { "type": "keyword" },
            "join": { "type": "join", "relations": { "Programmer": "Migraine" } }
        }));
        assert!(mappings_equivalent(Some(&mappings), Some(&mappings)));
    }

    #[test]
    fn test_missing_side_is_never_equivalent() {
        let mappings = mapping(json!({ "id": { "type": "keyword" } }));
        assert!(!mappings_equivalent(None, Some(&mappings)));
        assert!(!mappings_equivalent(Some(&mappings), None));
        assert!(!mappings_equivalent(None, None));
    }

    #[test]
    fn test_scalar_and_singleton_list_relations_are_equivalent() {
        let scalar = mapping(json!({
            "type": { "type": "keyword" },
            "join": { "type": "join", "relations": { "Programmer": "Migraine" } }
        }));
        let singleton = mapping(json!({
            "type": { "type": "keyword" },
            "join": { "type": "join", "relations": { "Programmer": ["Migraine"] } }
        }));
        assert!(mappings_equivalent(Some(&scalar), Some(&singleton)));
        assert!(mappings_equivalent(Some(&singleton), Some(&scalar)));
    }

    #[test]
    fn test_relation_list_order_is_ignored() {
        let sorted = mapping(json!({
            "join": { "type": "join", "relations": { "Programmer": ["Migraine", "Zebra"] } }
        }));
        let reversed = mapping(json!({
            "join": { "type": "join", "relations": { "Programmer": ["Zebra", "Migraine"] } }
        }));
        assert!(mappings_equivalent(Some(&sorted), Some(&reversed)));
    }

    #[test]
    fn test_differing_key_sets_are_not_equivalent() {
        let derived = mapping(json!({
            "id": { "type": "keyword" },
            "name": { "type": "text" }
        }));
        let live = mapping(json!({ "wrong": { "type": "keyword" } }));
        assert!(!mappings_equivalent(Some(&live), Some(&derived)));
    }

    #[test]
    fn test_differing_property_values_are_not_equivalent() {
        let derived = mapping(json!({ "id": { "type": "keyword" } }));
        let live = mapping(json!({ "id": { "type": "text" } }));
        assert!(!mappings_equivalent(Some(&live), Some(&derived)));
    }

    #[test]
    fn test_differing_relations_are_not_equivalent() {
        let derived = mapping(json!({
            "join": { "type": "join", "relations": { "Programmer": ["Migraine", "Zebra"] } }
        }));
        let live = mapping(json!({
            "join": { "type": "join", "relations": { "Programmer": ["Migraine"] } }
        }));
        assert!(!mappings_equivalent(Some(&live), Some(&derived)));
    }
}
