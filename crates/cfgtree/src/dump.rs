//! JSON rendering of a parsed tree.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::Entry;

/// Render the children of `entry` as a JSON object in source order.
///
/// Plain entries map their name to their value. Sections are keyed by
/// `name`, or `name-value` when the value is not empty, and map to a nested
/// object. A key repeated at the same level gets `-0`, `-1`, ... appended on
/// its second, third, ... occurrence.
pub fn to_json(entry: &Entry) -> Value {
    let mut out = Map::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for child in entry {
        let base = match child.section() {
            Some(_) if !child.value().is_empty() => format!("{}-{}", child.name(), child.value()),
            _ => child.name().to_string(),
        };
        let key = unique_key(&out, &mut seen, base);
        let value = match child.section() {
            Some(section) => to_json(section),
            None => Value::String(child.value().to_string()),
        };
        out.insert(key, value);
    }
    Value::Object(out)
}

/// Pick the output key for `base`, suffixing repeats.
fn unique_key(out: &Map<String, Value>, seen: &mut HashMap<String, usize>, base: String) -> String {
    let Some(count) = seen.get_mut(&base) else {
        seen.insert(base.clone(), 0);
        return base;
    };
    loop {
        let key = format!("{}-{}", base, count);
        *count += 1;
        if !out.contains_key(&key) {
            return key;
        }
    }
}
