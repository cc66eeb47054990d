//! Structured entry data and path addressing.
//!
//! Entry data is a tree of [`serde_json::Value`] with insertion-ordered maps.
//! Nested fields are addressed by path segments such as `["a", "b", "0", "c"]`
//! (written `a.b.0.c` or `a.b[0].c` in configuration). All reads and writes
//! into the tree go through [`get_at_path`] and [`set_at_path`].

use serde_json::{Map, Value};

/// Decoded key/value tree of an entry.
pub type EntryData = Value;

/// An empty object, the neutral value for entry data.
pub fn empty_data() -> EntryData {
    Value::Object(Map::new())
}

/// Split a field key into path segments.
///
/// Dots and square brackets are separators: `list[0].name` becomes
/// `["list", "0", "name"]`.
pub fn key_to_path(key: &str) -> Vec<String> {
    key.split(['.', '[', ']'])
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

/// Read the value at `path`, descending through objects and arrays.
pub fn get_at_path<'a, S: AsRef<str>>(data: &'a Value, path: &[S]) -> Option<&'a Value> {
    let mut current = data;
    for segment in path {
        let segment = segment.as_ref();
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Read the value at a dotted key (see [`key_to_path`]).
pub fn get_at_key<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    get_at_path(data, &key_to_path(key))
}

/// Write `value` at `path`, creating intermediate containers as needed.
///
/// A missing intermediate becomes an array when the next segment is numeric
/// and an object otherwise. Scalars in the way are replaced. A list index
/// may address an existing item or append one item; anything further is
/// refused and `data` is left untouched. Returns whether the value was written.
pub fn set_at_path<S: AsRef<str>>(data: &mut Value, path: &[S], value: Value) -> bool {
    let Some((last, parents)) = path.split_last() else {
        *data = value;
        return true;
    };
    if !indices_in_reach(data, path) {
        return false;
    }

    let mut current = data;
    for (i, segment) in parents.iter().enumerate() {
        let next_is_index = path[i + 1].as_ref().parse::<usize>().is_ok();
        current = child_mut(current, segment.as_ref(), next_is_index);
    }

    let last = last.as_ref();
    match current {
        Value::Array(items) if last.parse::<usize>().is_ok() => {
            let index: usize = last.parse().unwrap_or_default();
            match items.get_mut(index) {
                Some(slot) => *slot = value,
                None => items.push(value),
            }
        }
        Value::Object(map) => {
            map.insert(last.to_string(), value);
        }
        other => {
            let mut map = Map::new();
            map.insert(last.to_string(), value);
            *other = Value::Object(map);
        }
    }
    true
}

/// Whether every list index along `path` is at most one past the end of the
/// list it addresses. Lists created on the way start empty, so their index
/// must be 0.
fn indices_in_reach<S: AsRef<str>>(data: &Value, path: &[S]) -> bool {
    let mut current = Some(data);
    for (i, segment) in path.iter().enumerate() {
        let segment = segment.as_ref();
        let index = segment.parse::<usize>().ok();
        current = match (current, index) {
            (Some(Value::Array(items)), Some(index)) => {
                if index > items.len() {
                    return false;
                }
                items.get(index)
            }
            (Some(Value::Object(map)), _) => map.get(segment),
            // A container created here is an array exactly when the segment is numeric.
            (_, Some(index)) if i > 0 && index > 0 => return false,
            _ => None,
        };
    }
    true
}

/// Remove and return the value at `path`, if present.
pub fn remove_at_path<S: AsRef<str>>(data: &mut Value, path: &[S]) -> Option<Value> {
    let (last, parents) = path.split_last()?;
    let mut current = data;
    for segment in parents {
        let segment = segment.as_ref();
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match current {
        Value::Object(map) => map.shift_remove(last.as_ref()),
        Value::Array(items) => {
            let index = last.as_ref().parse::<usize>().ok()?;
            (index < items.len()).then(|| items.remove(index))
        }
        _ => None,
    }
}

fn child_mut<'a>(current: &'a mut Value, segment: &str, next_is_index: bool) -> &'a mut Value {
    let container = || {
        if next_is_index {
            Value::Array(Vec::new())
        } else {
            Value::Object(Map::new())
        }
    };

    let array_index = match current {
        Value::Array(_) => segment.parse::<usize>().ok(),
        _ => None,
    };
    if let Some(index) = array_index {
        let Value::Array(items) = current else {
            unreachable!()
        };
        let index = index.min(items.len());
        if index == items.len() {
            items.push(container());
        }
        let slot = &mut items[index];
        if !slot.is_object() && !slot.is_array() {
            *slot = container();
        }
        return slot;
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    let Value::Object(map) = current else {
        unreachable!()
    };
    let slot = map.entry(segment.to_string()).or_insert_with(container);
    if !slot.is_object() && !slot.is_array() {
        *slot = container();
    }
    slot
}

/// Render a scalar the way templates and search see it.
///
/// Strings are returned as-is, numbers and booleans via `to_string`, null as
/// an empty string and containers as compact JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// JavaScript-style truthiness, used by template filters and search.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
