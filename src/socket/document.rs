//! Dot-path access over nested JSON objects.
//!
//! Each `.`-separated segment addresses one level of object nesting.
//! Arrays are leaves: segments never index into them.

use serde_json::{Map, Value};

/// Value at `path`, or `default` if any segment is missing.
pub fn get(doc: &Value, path: &str, default: Value) -> Value {
    lookup(doc, path).cloned().unwrap_or(default)
}

/// Borrowing variant of [`get`].
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(doc);
    }
    path.split('.')
        .try_fold(doc, |node, segment| node.as_object()?.get(segment))
}

/// Whether every segment of `path` exists.
pub fn has(doc: &Value, path: &str) -> bool {
    !path.is_empty() && lookup(doc, path).is_some()
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// A non-object found along the way is replaced by an empty object. An
/// empty path replaces the whole document.
pub fn set(doc: &mut Value, path: &str, value: Value) {
    if path.is_empty() {
        *doc = value;
        return;
    }

    let mut node = doc;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Some(map) = node.as_object_mut() else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Every leaf path of `doc`, depth first in key order.
///
/// Non-empty objects are descended into; everything else (scalars, arrays,
/// empty objects) is a leaf.
pub fn flatten(doc: &Value) -> Vec<String> {
    let mut out = Vec::new();
    if let Value::Object(map) = doc {
        flatten_into(map, "", &mut out);
    }
    out
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(inner, &path, out),
            _ => out.push(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_nested_and_default() {
        let doc = json!({"progress": {"maximum": 10}});
        assert_eq!(get(&doc, "progress.maximum", Value::Null), json!(10));
        assert_eq!(get(&doc, "progress.position", json!(-1)), json!(-1));
        assert_eq!(get(&doc, "progress.maximum.deeper", json!("d")), json!("d"));
        assert_eq!(get(&doc, "", Value::Null), doc);
    }

    #[test]
    fn has_checks_full_path() {
        let doc = json!({"result": {"message": null}});
        assert!(has(&doc, "result"));
        assert!(has(&doc, "result.message"));
        assert!(!has(&doc, "result.files"));
        assert!(!has(&doc, ""));
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut doc = json!({});
        set(&mut doc, "result.data.code", json!(500));
        assert_eq!(doc, json!({"result": {"data": {"code": 500}}}));
    }

    #[test]
    fn set_replaces_scalar_on_the_way() {
        let mut doc = json!({"title": "x"});
        set(&mut doc, "title.inner", json!(true));
        assert_eq!(doc, json!({"title": {"inner": true}}));
    }

    #[test]
    fn set_overwrites_leaf_and_keeps_siblings() {
        let mut doc = json!({"progress": {"enabled": false, "maximum": -1}});
        set(&mut doc, "progress.enabled", json!(true));
        assert_eq!(doc, json!({"progress": {"enabled": true, "maximum": -1}}));
    }

    #[test]
    fn set_on_non_object_root() {
        let mut doc = Value::Null;
        set(&mut doc, "a", json!(1));
        assert_eq!(doc, json!({"a": 1}));
    }

    #[test]
    fn flatten_treats_arrays_and_empty_objects_as_leaves() {
        let doc = json!({
            "id": "x",
            "progress": {"enabled": false, "maximum": -1},
            "result": {"files": [], "data": {}}
        });
        let mut paths = flatten(&doc);
        paths.sort();
        assert_eq!(
            paths,
            vec![
                "id",
                "progress.enabled",
                "progress.maximum",
                "result.data",
                "result.files"
            ]
        );
    }
}
