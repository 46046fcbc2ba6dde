//! Layer merging primitives: compacting, key-by-key assignment, and the
//! one-level profile flatten used by `config export`.
//!
//! Every section merge is `defaults ⊕ compact(file values) ⊕ CLI overrides`,
//! later layers winning key-by-key. `compact` strips empty/falsy leaves from
//! the file layer first, so a file carrying `"desc": ""` or `"robot": 0`
//! cannot shadow a default that was already computed.

use serde_json::{Map, Value};

use crate::error::MiniCiError;
use crate::types::ConfigOptions;

/// Overlay `layer` onto `base`, key by key. Later callers win whole values;
/// there is no recursion here — nested bags (`setting`) are merged by the
/// caller one level deeper before they reach this point.
pub fn assign(base: &mut Map<String, Value>, layer: Map<String, Value>) {
    for (key, value) in layer {
        base.insert(key, value);
    }
}

/// True for the leaf values that are treated as "absent" during a merge:
/// null, `false`, `0`, the empty string, and empty arrays.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(_) => false,
    }
}

/// Strip blank leaves from a map, recursing into nested objects. An object
/// that compacts to nothing is dropped entirely.
pub fn compact(map: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in map {
        match value {
            Value::Object(inner) => {
                let inner = compact(inner);
                if !inner.is_empty() {
                    out.insert(key, Value::Object(inner));
                }
            }
            value if is_blank(&value) => {}
            value => {
                out.insert(key, value);
            }
        }
    }
    out
}

/// Collapse a profile snapshot to one level for export: section contents are
/// merged into a single flat object in section order (later sections
/// overwrite duplicate keys such as `robot`), with the `setting` subtree
/// kept intact.
pub fn flatten_profile(profile: &ConfigOptions) -> Result<Map<String, Value>, MiniCiError> {
    let value = serde_json::to_value(profile).map_err(|e| MiniCiError::InvalidValue {
        key: "profile".into(),
        reason: e.to_string(),
    })?;
    let Value::Object(sections) = value else {
        return Err(MiniCiError::InvalidValue {
            key: "profile".into(),
            reason: "profile did not serialize to an object".into(),
        });
    };

    let mut out = Map::new();
    for (_, section) in sections {
        if let Value::Object(fields) = section {
            assign(&mut out, fields);
        }
    }
    Ok(out)
}
