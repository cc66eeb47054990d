//! Draft validation.
//!
//! Errors are collected per field key (dotted, `meta.path` for the custom
//! path) and never reach the backend: a draft with errors is not persisted.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::collection::{Collection, Field};
use crate::slug::{SlugConfig, process_segment};
use crate::value::EntryData;

/// Key under which custom path errors are recorded.
pub const META_PATH_KEY: &str = "meta.path";

/// Kind of validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// A required value is missing
    Presence,
    /// The custom path is not a valid path
    InvalidPath,
    /// Another entry already lives at the custom path
    PathExists,
    /// Reported by a caller-supplied check
    Custom,
}

/// A validation error on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Kind of error
    pub kind: ErrorKind,
    /// Message for the editor
    pub message: String,
}

impl FieldError {
    /// A new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Errors keyed by field.
pub type FieldErrors = IndexMap<String, Vec<FieldError>>;

/// Whether a value counts as missing: null, `""`, `[]` or `{}`.
pub fn is_empty_value(value: Option<&EntryData>) -> bool {
    match value {
        None | Some(EntryData::Null) => true,
        Some(EntryData::String(s)) => s.is_empty(),
        Some(EntryData::Array(items)) => items.is_empty(),
        Some(EntryData::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

fn check_fields(fields: &[Field], data: Option<&EntryData>, prefix: &str, out: &mut FieldErrors) {
    for field in fields {
        let key = format!("{prefix}{}", field.name);
        let value = data.and_then(|d| d.get(&field.name));
        if field.is_required() && is_empty_value(value) {
            out.entry(key.clone()).or_default().push(FieldError::new(
                ErrorKind::Presence,
                format!("{} is required.", field.display_label()),
            ));
            continue;
        }
        if let Some(subfields) = &field.fields {
            match value {
                Some(EntryData::Array(items)) => {
                    for (index, item) in items.iter().enumerate() {
                        check_fields(subfields, Some(item), &format!("{key}.{index}."), out);
                    }
                }
                Some(object @ EntryData::Object(_)) => {
                    check_fields(subfields, Some(object), &format!("{key}."), out);
                }
                _ => {}
            }
        }
    }
}

/// Required-field errors for `data` of entry `slug` in `collection`.
pub fn validate_presence(collection: &Collection, slug: &str, data: &EntryData) -> FieldErrors {
    let mut out = FieldErrors::new();
    check_fields(collection.fields_for(slug), Some(data), "", &mut out);
    out
}

/// Validate a custom path chosen for an entry.
///
/// The path must be non-empty and already in slug form segment by segment.
/// It must not resolve to a file owned by another entry; `existing` lists
/// the paths of known entries and `draft_path` is the entry's own path.
pub fn validate_meta_path<'a>(
    collection: &Collection,
    slug_config: &SlugConfig,
    value: &str,
    existing: impl IntoIterator<Item = &'a str>,
    draft_path: &str,
) -> Option<FieldError> {
    if value.is_empty() {
        return Some(FieldError::new(ErrorKind::Presence, "Path is required."));
    }
    let sanitized = value
        .split('/')
        .map(|segment| process_segment(segment, slug_config))
        .collect::<Vec<_>>()
        .join("/");
    if sanitized != value {
        return Some(FieldError::new(
            ErrorKind::InvalidPath,
            format!("'{value}' is not a valid path."),
        ));
    }
    let custom = collection.custom_path(Some(value))?;
    existing
        .into_iter()
        .find(|path| *path == custom && *path != draft_path)
        .map(|path| FieldError::new(ErrorKind::PathExists, format!("Path '{path}' already exists.")))
}
