//! prioritised NetJSON merging and variable substitution.
//!
//! a device configuration is assembled from several NetJSON sources
//! (templates, the device's own config, VPN overlays). sources are merged
//! lowest-priority-first so that higher priorities win on conflict; maps
//! deep-merge, everything else (scalars and arrays) is replaced wholesale.
//!
//! after merging, the variable bag is applied in two passes:
//! 1. objects of the shape `{"$var": "a.b.c", "default": ...}` are replaced
//!    by the value at that path in the bag;
//! 2. strings containing `{{ ... }}` run through the template engine.

use serde_json::{Map, Value};

use crate::template;

/// one NetJSON source with a merge priority. higher priority wins.
#[derive(Debug, Clone)]
pub struct Source {
    /// source name, for diagnostics only.
    pub name: String,
    /// merge priority; lower merges first.
    pub priority: i32,
    /// the NetJSON object.
    pub json: Value,
}

impl Source {
    /// convenience constructor.
    pub fn new(name: impl Into<String>, priority: i32, json: Value) -> Self {
        Self {
            name: name.into(),
            priority,
            json,
        }
    }
}

/// merge sources by ascending priority into a single object.
///
/// the sort is stable, so equal priorities merge in input order. non-object
/// sources are skipped. the result shares no structure with the inputs.
pub fn merge(mut sources: Vec<Source>) -> Value {
    sources.sort_by_key(|s| s.priority);

    let mut out = Map::new();
    for source in &sources {
        if let Value::Object(map) = &source.json {
            deep_merge(&mut out, map);
        }
    }
    Value::Object(out)
}

fn deep_merge(dst: &mut Map<String, Value>, src: &Map<String, Value>) {
    for (key, value) in src {
        match (dst.get_mut(key), value) {
            // map + map: recurse
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            // anything else: higher priority replaces
            _ => {
                dst.insert(key.clone(), value.clone());
            }
        }
    }
}

/// apply the variable bag to a NetJSON tree.
///
/// both passes preserve structure; substitution failures are non-fatal
/// (unresolvable `$var` objects without a default stay as-is, template
/// parse errors yield the original string).
pub fn apply_vars(netjson: &Value, vars: &Map<String, Value>) -> Value {
    let after_refs = apply_var_objects(netjson, vars);
    apply_string_templates(&after_refs, vars)
}

/// replace `{"$var": "a.b.c"}` / `{"$var": "a.b.c", "default": v}` objects.
///
/// any other key in the object disqualifies it from being a reference.
/// traversal is depth-first, replacement bottom-up.
fn apply_var_objects(value: &Value, vars: &Map<String, Value>) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(path) = var_reference(map) {
                return match lookup(vars, path) {
                    Some(resolved) => resolved.clone(),
                    None => match map.get("default") {
                        Some(default) => default.clone(),
                        None => value.clone(),
                    },
                };
            }
            let walked = map
                .iter()
                .map(|(k, v)| (k.clone(), apply_var_objects(v, vars)))
                .collect();
            Value::Object(walked)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| apply_var_objects(v, vars)).collect())
        }
        other => other.clone(),
    }
}

/// returns the reference path if the object is exactly a `$var` reference.
fn var_reference(map: &Map<String, Value>) -> Option<&str> {
    let path = map.get("$var")?.as_str()?;
    if map.keys().all(|k| k == "$var" || k == "default") {
        Some(path)
    } else {
        None
    }
}

/// render `{{ ... }}` templates in every string of the tree.
fn apply_string_templates(value: &Value, vars: &Map<String, Value>) -> Value {
    match value {
        Value::String(s) if s.contains("{{") => {
            Value::String(template::render(s, vars))
        }
        Value::Object(map) => {
            let walked = map
                .iter()
                .map(|(k, v)| (k.clone(), apply_string_templates(v, vars)))
                .collect();
            Value::Object(walked)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| apply_string_templates(v, vars))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// resolve a dotted path like "a.b.c" through nested objects.
pub(crate) fn lookup<'a>(vars: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = vars.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn higher_priority_wins_on_scalars() {
        let merged = merge(vec![
            Source::new("low", 10, json!({"system": {"hostname": "a", "zone": "utc"}})),
            Source::new("high", 20, json!({"system": {"hostname": "b"}})),
        ]);
        assert_eq!(merged["system"]["hostname"], "b");
        // untouched keys from the low-priority side survive
        assert_eq!(merged["system"]["zone"], "utc");
    }

    #[test]
    fn arrays_replace_wholesale() {
        let merged = merge(vec![
            Source::new("low", 1, json!({"k": [1, 2]})),
            Source::new("high", 2, json!({"k": [3]})),
        ]);
        assert_eq!(merged["k"], json!([3]));
    }

    #[test]
    fn equal_priorities_merge_in_input_order() {
        let merged = merge(vec![
            Source::new("first", 5, json!({"k": "first"})),
            Source::new("second", 5, json!({"k": "second"})),
        ]);
        assert_eq!(merged["k"], "second");
    }

    #[test]
    fn non_object_sources_are_skipped() {
        let merged = merge(vec![
            Source::new("junk", 1, json!(null)),
            Source::new("real", 2, json!({"a": 1})),
        ]);
        assert_eq!(merged, json!({"a": 1}));
    }

    #[test]
    fn empty_input_yields_empty_object() {
        assert_eq!(merge(vec![]), json!({}));
    }

    #[test]
    fn merge_output_does_not_alias_inputs() {
        let shared = json!({"nested": {"value": 1}});
        let merged = merge(vec![Source::new("a", 1, shared.clone())]);
        assert_eq!(merged, shared);
    }

    #[test]
    fn var_reference_resolves_path() {
        let vars = obj(json!({"net": {"dns": ["1.1.1.1"]}}));
        let input = json!({"dns": {"$var": "net.dns"}});
        let out = apply_vars(&input, &vars);
        assert_eq!(out["dns"], json!(["1.1.1.1"]));
    }

    #[test]
    fn var_reference_falls_back_to_default() {
        let vars = Map::new();
        let input = json!({"mtu": {"$var": "net.mtu", "default": 1400}});
        let out = apply_vars(&input, &vars);
        assert_eq!(out["mtu"], 1400);
    }

    #[test]
    fn unresolved_reference_without_default_is_kept() {
        let vars = Map::new();
        let input = json!({"mtu": {"$var": "net.mtu"}});
        let out = apply_vars(&input, &vars);
        assert_eq!(out["mtu"], json!({"$var": "net.mtu"}));
    }

    #[test]
    fn object_with_extra_keys_is_not_a_reference() {
        let vars = obj(json!({"a": 1}));
        let input = json!({"x": {"$var": "a", "other": true}});
        let out = apply_vars(&input, &vars);
        assert_eq!(out["x"], json!({"$var": "a", "other": true}));
    }

    #[test]
    fn templates_render_inside_arrays() {
        let vars = obj(json!({"device_name": "node1"}));
        let input = json!({"names": ["{{ .device_name }}", "static"]});
        let out = apply_vars(&input, &vars);
        assert_eq!(out["names"], json!(["node1", "static"]));
    }

    #[test]
    fn lookup_stops_at_non_objects() {
        let vars = obj(json!({"a": "scalar"}));
        assert!(lookup(&vars, "a.b").is_none());
        assert_eq!(lookup(&vars, "a"), Some(&json!("scalar")));
    }
}
