//! Opaque pagination cursors.
//!
//! A backend returns a [`Cursor`] with a listing: the actions it supports
//! (`next`, `prev`, `first`, `last`), provider data needed to follow them and
//! display metadata such as the current page. The engine wraps it with the
//! collection it belongs to before handing it out, and unwraps it again when
//! asked to traverse.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{QuireError, Result};

/// Load the next page
pub const NEXT: &str = "next";
/// Load the previous page
pub const PREV: &str = "prev";
/// Load the first page
pub const FIRST: &str = "first";
/// Load the last page
pub const LAST: &str = "last";
/// Load the next page and append it to the current list
pub const APPEND_NEXT: &str = "append_next";

/// Pagination state returned by a backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    #[serde(default)]
    actions: BTreeSet<String>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    meta: Value,
}

impl Cursor {
    /// A cursor supporting `actions`, carrying provider `data`.
    pub fn new<I, S>(actions: I, data: Value) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
            data,
            meta: Value::Object(Default::default()),
        }
    }

    /// Normalize a raw provider payload (`{actions, data, meta}`); anything
    /// unrecognized yields an empty cursor.
    pub fn create(raw: Option<Value>) -> Self {
        raw.and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    /// Set a metadata key (builder style).
    pub fn with_meta(mut self, key: &str, value: Value) -> Self {
        if !self.meta.is_object() {
            self.meta = Value::Object(Default::default());
        }
        if let Value::Object(map) = &mut self.meta {
            map.insert(key.to_string(), value);
        }
        self
    }

    /// Supported actions, sorted.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(String::as_str)
    }

    /// Whether `action` is supported.
    pub fn has_action(&self, action: &str) -> bool {
        self.actions.contains(action)
    }

    /// Provider data.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Display metadata.
    pub fn meta(&self) -> &Value {
        &self.meta
    }

    /// True when the cursor supports no action.
    pub fn is_exhausted(&self) -> bool {
        self.actions.is_empty()
    }

    /// Add `append_next` wherever `next` is supported.
    pub fn add_append_actions(mut self) -> Self {
        if self.has_action(NEXT) {
            self.actions.insert(APPEND_NEXT.to_string());
        }
        self
    }

    /// Current page number from metadata, when the provider reports one.
    pub fn page(&self) -> Option<u64> {
        self.meta.get("page").and_then(Value::as_u64)
    }

    /// Wrap the cursor with the collection it pages through.
    pub fn wrap(self, collection: impl Into<String>) -> WrappedCursor {
        WrappedCursor {
            kind: CursorKind::CollectionEntries,
            collection: collection.into(),
            cursor: self,
        }
    }
}

/// What a wrapped cursor pages through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CursorKind {
    /// Entries of one collection
    CollectionEntries,
}

/// A provider cursor tagged with the collection it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrappedCursor {
    kind: CursorKind,
    collection: String,
    cursor: Cursor,
}

impl WrappedCursor {
    /// Collection the cursor pages through.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Inner provider cursor.
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Whether `action` is supported.
    pub fn has_action(&self, action: &str) -> bool {
        self.cursor.has_action(action)
    }

    /// Supported actions.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.cursor.actions()
    }

    /// Current page number.
    pub fn page(&self) -> Option<u64> {
        self.cursor.page()
    }

    /// Add `append_next` wherever `next` is supported.
    pub fn add_append_actions(self) -> Self {
        Self {
            cursor: self.cursor.add_append_actions(),
            ..self
        }
    }

    /// Split into the collection name and the provider cursor.
    pub fn unwrap(self) -> (String, Cursor) {
        (self.collection, self.cursor)
    }
}

/// Map an editor action to the provider action it performs.
///
/// Returns the provider action and whether the page should be appended.
pub fn resolve_action(action: &str) -> (&str, bool) {
    if action == APPEND_NEXT {
        (NEXT, true)
    } else {
        (action, false)
    }
}

/// Check that `cursor` supports `action` before traversing it.
pub fn ensure_action(cursor: &Cursor, action: &str) -> Result<()> {
    if cursor.has_action(action) {
        Ok(())
    } else {
        Err(QuireError::Cursor(format!(
            "action '{action}' is not supported by this cursor"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_next_follows_next() {
        let cursor = Cursor::new([NEXT, LAST], json!({})).add_append_actions();
        assert!(cursor.has_action(APPEND_NEXT));
        let cursor = Cursor::new([PREV], json!({})).add_append_actions();
        assert!(!cursor.has_action(APPEND_NEXT));
    }

    #[test]
    fn wrap_and_unwrap_keep_collection() {
        let wrapped = Cursor::new([NEXT], json!({"page": 2}))
            .with_meta("page", json!(1))
            .wrap("posts");
        assert_eq!(wrapped.collection(), "posts");
        assert_eq!(wrapped.page(), Some(1));
        let (collection, cursor) = wrapped.unwrap();
        assert_eq!(collection, "posts");
        assert_eq!(cursor.data(), &json!({"page": 2}));
    }

    #[test]
    fn create_normalizes_payloads() {
        let cursor = Cursor::create(Some(json!({"actions": ["next"], "data": {"p": 1}})));
        assert!(cursor.has_action(NEXT));
        assert!(Cursor::create(Some(json!("garbage"))).is_exhausted());
        assert!(Cursor::create(None).is_exhausted());
    }

    #[test]
    fn resolve_and_ensure() {
        assert_eq!(resolve_action(APPEND_NEXT), (NEXT, true));
        assert_eq!(resolve_action(PREV), (PREV, false));
        let cursor = Cursor::new([NEXT], json!({}));
        assert!(ensure_action(&cursor, NEXT).is_ok());
        assert!(matches!(ensure_action(&cursor, PREV), Err(QuireError::Cursor(_))));
    }

    #[test]
    fn serializes_as_tagged_envelope() {
        let wrapped = Cursor::new([NEXT], json!(null)).wrap("posts");
        let value = serde_json::to_value(&wrapped).unwrap();
        assert_eq!(value["kind"], json!("collectionEntries"));
        assert_eq!(value["collection"], json!("posts"));
    }
}
