//! Generic helpers over JSON trees.
//!
//! Projection branches, the schema cleaner and the industry classifier all go
//! through [`walk`] / [`transform`].

use serde_json::{Map, Value};
use std::fmt;

/// Nodes deeper than this are neither visited nor transformed.
pub const MAX_WALK_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a node inside a JSON tree, rendered dot-joined
/// (`assets.currentAssets.inventories`, `items.0.value`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

impl JsonPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child_key(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.segments.push(PathSegment::Key(key.to_string()));
        next
    }

    pub fn child_index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.segments.push(PathSegment::Index(index));
        next
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Last object key on the path, if the path ends in one.
    pub fn last_key(&self) -> Option<&str> {
        match self.segments.last() {
            Some(PathSegment::Key(k)) => Some(k.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Key(k) => f.write_str(k)?,
                PathSegment::Index(idx) => write!(f, "{}", idx)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    SkipChildren,
    Stop,
}

/// Pre-order visit of every node. The visitor receives the node's path, its
/// depth (root = 0) and the node itself.
pub fn walk<F>(value: &Value, visitor: &mut F)
where
    F: FnMut(&JsonPath, usize, &Value) -> WalkControl,
{
    walk_inner(value, &JsonPath::root(), 0, visitor);
}

fn walk_inner<F>(value: &Value, path: &JsonPath, depth: usize, visitor: &mut F) -> bool
where
    F: FnMut(&JsonPath, usize, &Value) -> WalkControl,
{
    if depth > MAX_WALK_DEPTH {
        return true;
    }

    match visitor(path, depth, value) {
        WalkControl::Stop => return false,
        WalkControl::SkipChildren => return true,
        WalkControl::Continue => {}
    }

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if !walk_inner(child, &path.child_key(key), depth + 1, visitor) {
                    return false;
                }
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                if !walk_inner(child, &path.child_index(idx), depth + 1, visitor) {
                    return false;
                }
            }
        }
        _ => {}
    }

    true
}

/// Pre-order rewrite of a tree. `f` replaces each node first; the children of
/// the replacement are then rewritten in turn.
pub fn transform<F>(value: Value, f: &mut F) -> Value
where
    F: FnMut(&JsonPath, usize, Value) -> Value,
{
    transform_inner(value, &JsonPath::root(), 0, f)
}

fn transform_inner<F>(value: Value, path: &JsonPath, depth: usize, f: &mut F) -> Value
where
    F: FnMut(&JsonPath, usize, Value) -> Value,
{
    if depth > MAX_WALK_DEPTH {
        return value;
    }

    match f(path, depth, value) {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                let child_path = path.child_key(&key);
                out.insert(key, transform_inner(child, &child_path, depth + 1, f));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(idx, child)| transform_inner(child, &path.child_index(idx), depth + 1, f))
                .collect(),
        ),
        other => other,
    }
}

/// Defensive lookup: `None` as soon as any segment is missing or the parent is
/// not an object.
pub fn get_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    Some(current)
}

/// Owned lookup that yields `Value::Null` for anything missing.
pub fn value_at(value: &Value, path: &[&str]) -> Value {
    get_path(value, path).cloned().unwrap_or(Value::Null)
}

pub fn number_at(value: &Value, path: &[&str]) -> Option<f64> {
    get_path(value, path).and_then(Value::as_f64)
}

pub fn text_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    get_path(value, path).and_then(Value::as_str)
}

/// Builds a new object holding only `keys` from `source`; absent keys become
/// `null` leaves.
pub fn pick(source: &Value, keys: &[&str]) -> Value {
    let mut out = Map::new();
    for key in keys {
        let leaf = source
            .as_object()
            .and_then(|m| m.get(*key))
            .cloned()
            .unwrap_or(Value::Null);
        out.insert((*key).to_string(), leaf);
    }
    Value::Object(out)
}

/// Number of numeric leaves in a tree.
pub fn count_numeric_leaves(value: &Value) -> usize {
    let mut count = 0;
    walk(value, &mut |_, _, node| {
        if node.is_number() {
            count += 1;
        }
        WalkControl::Continue
    });
    count
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Human-readable JSON type name used in validation messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_walk_tracks_path_and_depth() {
        let doc = json!({"assets": {"currentAssets": {"inventories": 10.0}}, "items": [1, 2]});
        let mut seen = Vec::new();
        walk(&doc, &mut |path, depth, node| {
            if node.is_number() {
                seen.push((path.to_string(), depth));
            }
            WalkControl::Continue
        });
        assert_eq!(
            seen,
            vec![
                ("assets.currentAssets.inventories".to_string(), 3),
                ("items.0".to_string(), 2),
                ("items.1".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_walk_skip_and_stop() {
        let doc = json!({"a": {"deep": 1}, "b": 2, "c": 3});
        let mut visited = Vec::new();
        walk(&doc, &mut |path, _, _| {
            visited.push(path.to_string());
            match path.last_key() {
                Some("a") => WalkControl::SkipChildren,
                Some("b") => WalkControl::Stop,
                _ => WalkControl::Continue,
            }
        });
        assert_eq!(visited, vec!["", "a", "b"]);
    }

    #[test]
    fn test_transform_rewrites_leaves() {
        let doc = json!({"x": 1.23456, "y": {"z": 2.00004}});
        let rounded = transform(doc, &mut |_, _, node| match node.as_f64() {
            Some(n) => json!(round_to(n, 2)),
            None => node,
        });
        assert_eq!(rounded, json!({"x": 1.23, "y": {"z": 2.0}}));
    }

    #[test]
    fn test_get_path_is_defensive() {
        let doc = json!({"a": {"b": 5}, "s": "text"});
        assert_eq!(number_at(&doc, &["a", "b"]), Some(5.0));
        assert_eq!(get_path(&doc, &["a", "missing"]), None);
        assert_eq!(get_path(&doc, &["s", "nested"]), None);
        assert_eq!(value_at(&doc, &["nope"]), Value::Null);
    }

    #[test]
    fn test_pick_yields_null_leaves() {
        let doc = json!({"keep": 1, "drop": 2});
        assert_eq!(pick(&doc, &["keep", "absent"]), json!({"keep": 1, "absent": null}));
        assert_eq!(pick(&Value::Null, &["keep"]), json!({"keep": null}));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(-2.5, 0), -3.0);
    }
}
