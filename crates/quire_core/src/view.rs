//! Sorting, filtering and grouping of listed entries.

use std::cmp::Ordering;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::collection::{COMMIT_AUTHOR, COMMIT_DATE, ViewFilter, ViewGroup};
use crate::entry::Entry;
use crate::value::{EntryData, get_at_path, key_to_path, value_to_string};

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    /// Data key, or `commit_date`/`commit_author`
    pub key: String,
    /// Direction
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortField {
    /// Ascending on `key`.
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending on `key`.
    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Descending,
        }
    }
}

fn sort_value(entry: &Entry, key: &str) -> Option<EntryData> {
    if let Some(value) = get_at_path(&entry.data, &key_to_path(key)).filter(|v| !v.is_null()) {
        return Some(value.clone());
    }
    match key {
        COMMIT_DATE => entry.updated_on.clone().map(EntryData::String),
        COMMIT_AUTHOR => entry.author.clone().map(EntryData::String),
        _ => None,
    }
}

fn compare_values(a: &EntryData, b: &EntryData) -> Ordering {
    match (a, b) {
        (EntryData::Number(x), EntryData::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or_default(), y.as_f64().unwrap_or_default());
            x.total_cmp(&y)
        }
        (EntryData::Bool(x), EntryData::Bool(y)) => x.cmp(y),
        _ => value_to_string(a).cmp(&value_to_string(b)),
    }
}

/// Sort `entries` by `fields` in priority order. Entries missing a key sort
/// after those that have it, in either direction. The sort is stable.
pub fn sort_entries(entries: &mut [Entry], fields: &[SortField]) {
    entries.sort_by(|a, b| {
        for field in fields {
            let ordering = match (sort_value(a, &field.key), sort_value(b, &field.key)) {
                (Some(x), Some(y)) => match field.direction {
                    SortDirection::Ascending => compare_values(&x, &y),
                    SortDirection::Descending => compare_values(&y, &x),
                },
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!(pattern, "invalid view pattern: {e}");
            None
        }
    }
}

/// Whether `entry` passes `filter`: boolean patterns compare exactly, any
/// other pattern is a regex tested against the value as text.
pub fn matches_filter(entry: &Entry, filter: &ViewFilter) -> bool {
    let value = get_at_path(&entry.data, &key_to_path(&filter.field));
    match &filter.pattern {
        EntryData::Bool(expected) => value.and_then(EntryData::as_bool) == Some(*expected),
        pattern => {
            let Some(value) = value.filter(|v| !v.is_null()) else {
                return false;
            };
            let source = value_to_string(pattern);
            compile(&source).is_some_and(|regex| regex.is_match(&value_to_string(value)))
        }
    }
}

/// Entries passing every filter in `filters`.
pub fn filter_entries(entries: Vec<Entry>, filters: &[ViewFilter]) -> Vec<Entry> {
    if filters.is_empty() {
        return entries;
    }
    entries
        .into_iter()
        .filter(|entry| filters.iter().all(|f| matches_filter(entry, f)))
        .collect()
}

/// Entries sharing a group value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryGroup {
    /// Group id: label plus value, or `missing_value`
    pub id: String,
    /// Group label from the view group
    pub label: String,
    /// Group value; `None` when the field is missing
    pub value: Option<String>,
    /// Member entries in listing order
    pub entries: Vec<Entry>,
}

/// Group `entries` by `group`, in order of first appearance.
pub fn group_entries(entries: Vec<Entry>, group: &ViewGroup) -> Vec<EntryGroup> {
    let regex = group.pattern.as_deref().and_then(compile);
    let mut groups: IndexMap<String, EntryGroup> = IndexMap::new();
    for entry in entries {
        let (id, value) = match get_at_path(&entry.data, &key_to_path(&group.field)) {
            None => ("missing_value".to_string(), None),
            Some(data) => {
                let text = value_to_string(data);
                let value = match (&group.pattern, &regex) {
                    (Some(_), Some(regex)) => regex
                        .find(&text)
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default(),
                    (Some(_), None) => String::new(),
                    (None, _) => text,
                };
                (format!("{}{value}", group.label), Some(value))
            }
        };
        groups
            .entry(id.clone())
            .or_insert_with(|| EntryGroup {
                id,
                label: group.label.clone(),
                value,
                entries: Vec::new(),
            })
            .entries
            .push(entry);
    }
    groups.into_values().collect()
}
