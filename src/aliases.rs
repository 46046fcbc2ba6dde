//! First-defined alias lookup over parsed CLI arguments.
//!
//! Most override flags are reachable through several spellings (`--robot`
//! and `-r`, `--qrcodeFormat` / `--qrFormat` / `--qrf`). An [`AliasSpec`]
//! names the canonical key plus its accepted aliases in priority order; the
//! resolver takes the first alias with a defined value and stores it under
//! the canonical key. The tie-break is declaration order, not command-line
//! order: with `--robot=5 -r=9` the `robot` entry wins because it is listed
//! first.
//!
//! The lookup is pure — the argument map is never mutated — and an alias
//! list with no defined value simply contributes no key, letting earlier
//! merge layers supply the field.

use serde_json::{Map, Value};

/// Accepts any value that is present at all (not JSON null).
fn defined(value: &Value) -> bool {
    !value.is_null()
}

/// Accepts only an explicit `true` — used for the compile flags, which the
/// CLI can switch on but never force off.
fn enabled(value: &Value) -> bool {
    value.as_bool() == Some(true)
}

/// Canonical key plus the ordered alias list that can supply it.
pub struct AliasSpec {
    pub canonical: &'static str,
    keys: &'static [&'static str],
    filter: fn(&Value) -> bool,
}

impl AliasSpec {
    /// An entry with aliases, evaluated left-to-right. By convention the
    /// canonical key itself is listed first.
    pub const fn new(canonical: &'static str, keys: &'static [&'static str]) -> Self {
        Self {
            canonical,
            keys,
            filter: defined,
        }
    }

    /// A bare entry: the canonical key is its only spelling.
    pub const fn bare(key: &'static str) -> Self {
        Self {
            canonical: key,
            keys: &[],
            filter: defined,
        }
    }

    /// A boolean flag that only counts when explicitly `true`.
    pub const fn flag(key: &'static str) -> Self {
        Self {
            canonical: key,
            keys: &[],
            filter: enabled,
        }
    }

    fn candidates(&self) -> &[&'static str] {
        if self.keys.is_empty() {
            std::slice::from_ref(&self.canonical)
        } else {
            self.keys
        }
    }
}

/// Resolve a full alias table against the parsed arguments, producing a
/// partial section map keyed by canonical names.
pub fn resolve_aliases(args: &Map<String, Value>, specs: &[AliasSpec]) -> Map<String, Value> {
    let mut out = Map::new();
    for spec in specs {
        let hit = spec
            .candidates()
            .iter()
            .find_map(|key| args.get(*key).filter(|v| (spec.filter)(v)));
        if let Some(value) = hit {
            out.insert(spec.canonical.to_string(), value.clone());
        }
    }
    out
}

/// First defined (non-null) value across `keys`, in key order.
pub fn first_defined<'a>(args: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| args.get(*key).filter(|v| !v.is_null()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn canonical_key_wins_regardless_of_position() {
        // Both aliases defined: the one declared first wins.
        let specs = [AliasSpec::new("robot", &["robot", "r"])];
        let parsed = args(json!({"r": 9, "robot": 5}));
        let out = resolve_aliases(&parsed, &specs);
        assert_eq!(out.get("robot"), Some(&json!(5)));
    }

    #[test]
    fn later_alias_supplies_the_canonical_key() {
        let specs = [AliasSpec::new("desc", &["desc", "d"])];
        let parsed = args(json!({"d": "short form", "desc": null}));
        let out = resolve_aliases(&parsed, &specs);
        assert_eq!(out.get("desc"), Some(&json!("short form")));
    }

    #[test]
    fn no_defined_alias_yields_no_key() {
        let specs = [AliasSpec::new("desc", &["desc", "d"])];
        let parsed = args(json!({"desc": null, "d": null}));
        let out = resolve_aliases(&parsed, &specs);
        assert!(out.is_empty());
    }

    #[test]
    fn bare_entry_looks_up_directly() {
        let specs = [AliasSpec::bare("test")];
        let parsed = args(json!({"test": true}));
        let out = resolve_aliases(&parsed, &specs);
        assert_eq!(out.get("test"), Some(&json!(true)));
    }

    #[test]
    fn flag_entry_ignores_explicit_false() {
        let specs = [AliasSpec::flag("es6")];
        let parsed = args(json!({"es6": false}));
        let out = resolve_aliases(&parsed, &specs);
        assert!(out.is_empty());
    }

    #[test]
    fn flag_entry_takes_explicit_true() {
        let specs = [AliasSpec::flag("es6")];
        let parsed = args(json!({"es6": true}));
        let out = resolve_aliases(&parsed, &specs);
        assert_eq!(out.get("es6"), Some(&json!(true)));
    }

    #[test]
    fn input_map_is_not_mutated() {
        let specs = [AliasSpec::new("robot", &["robot", "r"])];
        let parsed = args(json!({"robot": 5, "r": 9, "unrelated": "x"}));
        let before = parsed.clone();
        let _ = resolve_aliases(&parsed, &specs);
        assert_eq!(parsed, before);
    }

    #[test]
    fn first_defined_skips_null_entries() {
        let parsed = args(json!({"qrcodeFormat": null, "qrf": "image"}));
        let hit = first_defined(&parsed, &["qrcodeFormat", "qrFormat", "qrf"]);
        assert_eq!(hit, Some(&json!("image")));
    }

    #[test]
    fn first_defined_none_when_all_absent() {
        let parsed = args(json!({"other": 1}));
        assert!(first_defined(&parsed, &["qrcodeFormat", "qrf"]).is_none());
    }
}
