//! Input normalization.
//!
//! Caller inputs are deep-merged over the defaults, then every nested object
//! keyed purely by array indices (`{"0": .., "1": ..}`) is turned back into an
//! array. Some template and config serializers emit array-valued fields in
//! that shape and the Elasticsearch Service API rejects it.

use serde_json::{Map, Value};

use super::spec::default_inputs;

/// Merges `inputs` over the defaults and repairs index-keyed objects.
///
/// Caller values win. Objects present on both sides are merged recursively;
/// any other caller value, including an explicit `null`, replaces the default.
/// A `null` root means "no inputs".
#[must_use]
pub fn normalize(inputs: &Value) -> Value {
    let mut merged = default_inputs();
    if !inputs.is_null() {
        merge(&mut merged, inputs);
    }
    repair_children(merged)
}

/// Deep-merges `overlay` into `base`.
pub fn merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (&mut Value::Object(ref mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Repairs every value below the root; the root object itself is kept.
fn repair_children(root: Value) -> Value {
    match root {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, repair(value)))
                .collect(),
        ),
        other => repair(other),
    }
}

fn repair(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(key, value)| (key, repair(value)))
                .collect();

            if is_index_keyed(&map) {
                into_sequence(map)
            } else {
                Value::Object(map)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(repair).collect()),
        other => other,
    }
}

fn index_of(key: &str) -> Option<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

/// Empty objects stay objects.
fn is_index_keyed(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|key| index_of(key).is_some())
}

fn into_sequence(map: Map<String, Value>) -> Value {
    let mut entries: Vec<(usize, Value)> = map
        .into_iter()
        .filter_map(|(key, value)| index_of(&key).map(|index| (index, value)))
        .collect();
    entries.sort_by_key(|(index, _)| *index);
    Value::Array(entries.into_iter().map(|(_, value)| value).collect())
}
