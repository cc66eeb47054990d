//! The entry being edited.
//!
//! [`EntryDraft`] is the single draft slot of an editing session. It tracks
//! the canonical snapshot the draft was loaded from so `has_changed` is a
//! structural comparison (reverting a field clears it), carries per-field
//! validation errors, and regenerates its `key` whenever a different entry
//! is loaded so views bound to the old one can tell.
//!
//! ```text
//! create_empty ─▶ Empty ─┐
//! from_entry ──▶ Loaded ─┼─ change_field ─▶ Editing ─ start_persisting ─▶ Persisting
//!                        │                                 │ failed          │ persisted
//!                        │                             back to Loaded    Persisted
//! discard ─────▶ Empty (no entry)
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::collection::{Collection, Field};
use crate::entry::{Entry, MediaFile};
use crate::i18n;
use crate::slug::SlugConfig;
use crate::validate::{self, FieldError, FieldErrors, META_PATH_KEY};
use crate::value::{EntryData, key_to_path, set_at_path};

/// Where the draft is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftState {
    /// New draft (or none) with nothing changed
    #[default]
    Empty,
    /// Loaded from a canonical entry, unchanged
    Loaded,
    /// Differs from what was loaded
    Editing,
    /// A save is in flight
    Persisting,
    /// Saved; matches the canonical entry
    Persisted,
}

/// Default data for `fields`.
///
/// Fields with a default use it. Object fields recurse; list fields with
/// subfields seed one item unless their default is a list. Empty objects
/// are left out. `skip` drops fields (and their subtrees) entirely.
pub fn empty_draft_data(fields: &[Field], skip: &dyn Fn(&Field) -> bool) -> EntryData {
    let mut out = serde_json::Map::new();
    for field in fields {
        if skip(field) {
            continue;
        }
        let subfields: Vec<Field> = field.subfields().into_iter().cloned().collect();
        if !subfields.is_empty() {
            if field.is_list()
                && let Some(default @ EntryData::Array(_)) = &field.default
            {
                out.insert(field.name.clone(), default.clone());
                continue;
            }
            let nested = empty_draft_data(&subfields, skip);
            let is_empty = nested.as_object().is_some_and(|m| m.is_empty());
            if !is_empty {
                let value = if field.is_list() {
                    EntryData::Array(vec![nested])
                } else {
                    nested
                };
                out.insert(field.name.clone(), value);
            }
            continue;
        }
        if let Some(default) = field.default.clone().filter(|d| !d.is_null()) {
            out.insert(field.name.clone(), default);
        }
    }
    EntryData::Object(out)
}

/// Numeric segments of `path` must each follow a list field, and a list
/// field must be followed by an index.
fn indexes_only_lists(fields: &[Field], path: &[String]) -> bool {
    let mut candidates: Vec<&Field> = fields.iter().collect();
    let mut in_list = false;
    for segment in path {
        let is_index = segment.parse::<usize>().is_ok();
        if is_index != in_list {
            return false;
        }
        if is_index {
            in_list = false;
            continue;
        }
        let Some(field) = candidates.iter().copied().find(|f| f.name == *segment) else {
            return false;
        };
        in_list = field.is_list();
        candidates = field.subfields();
    }
    !in_list
}

/// Query-string values: `true`/`false` in any common casing become booleans.
fn query_value(value: &str) -> EntryData {
    match value {
        "true" | "True" | "TRUE" => EntryData::Bool(true),
        "false" | "False" | "FALSE" => EntryData::Bool(false),
        other => EntryData::String(other.to_string()),
    }
}

/// The draft slot.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    key: Uuid,
    state: DraftState,
    entry: Option<Entry>,
    pristine: Option<Entry>,
    has_changed: bool,
    fields_errors: FieldErrors,
    local_backup: Option<Entry>,
}

impl Default for EntryDraft {
    fn default() -> Self {
        Self {
            key: Uuid::new_v4(),
            state: DraftState::Empty,
            entry: None,
            pristine: None,
            has_changed: false,
            fields_errors: FieldErrors::new(),
            local_backup: None,
        }
    }
}

impl EntryDraft {
    /// No draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// A new entry of `collection` with its defaults.
    ///
    /// `query` is a URL query string (`title=Hi&draft=true`); each key naming
    /// a field overrides that field's default.
    pub fn create_empty(collection: &Collection, query: &str) -> Self {
        let fields = collection.fields_for("");
        let mut data = empty_draft_data(fields, &|f| f.meta);
        let mut meta = empty_draft_data(fields, &|f| !f.meta);

        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            let path = key_to_path(&key);
            let target = match collection.select_field(&key) {
                Some(_) if !indexes_only_lists(&collection.fields, &path) => {
                    debug!(key = %key, "ignoring query value with a misplaced list index");
                    continue;
                }
                Some(field) if field.meta => &mut meta,
                Some(_) => &mut data,
                None => {
                    debug!(key = %key, "ignoring query value for unknown field");
                    continue;
                }
            };
            if !set_at_path(target, &path, query_value(&value)) {
                debug!(key = %key, "ignoring query value past the end of a list");
            }
        }

        let mut entry = Entry::new(&collection.name, "", "").with_data(data);
        entry.new_record = true;
        entry.meta.path = meta
            .get("path")
            .and_then(EntryData::as_str)
            .map(String::from);
        if let Some(settings) = collection.i18n_settings() {
            entry.locale_variants = i18n::placeholder_variants(settings, fields, &entry.data);
        }
        Self::with_entry(entry, DraftState::Empty)
    }

    /// Edit an existing entry.
    pub fn create_from_entry(entry: Entry) -> Self {
        Self::with_entry(entry, DraftState::Loaded)
    }

    /// A new, slug-less draft carrying `entry`'s data and draft media.
    pub fn duplicate_from_entry(entry: &Entry) -> Self {
        let mut copy = Entry::new(&entry.collection, "", "").with_data(entry.data.clone());
        copy.locale_variants = entry.locale_variants.clone();
        copy.media_files = entry.draft_media_files().cloned().collect();
        copy.new_record = true;
        Self {
            entry: Some(copy),
            pristine: None,
            has_changed: true,
            state: DraftState::Editing,
            ..Self::default()
        }
    }

    fn with_entry(entry: Entry, state: DraftState) -> Self {
        Self {
            pristine: Some(entry.clone()),
            entry: Some(entry),
            state,
            ..Self::default()
        }
    }

    /// Drop the draft.
    pub fn discard(&mut self) {
        *self = Self::default();
    }

    /// Identity token, new for every load, create and discard.
    pub fn key(&self) -> Uuid {
        self.key
    }

    /// Lifecycle state.
    pub fn state(&self) -> DraftState {
        self.state
    }

    /// The draft entry.
    pub fn entry(&self) -> Option<&Entry> {
        self.entry.as_ref()
    }

    /// Whether the draft differs from what was loaded.
    pub fn has_changed(&self) -> bool {
        self.has_changed
    }

    /// Whether a save is in flight.
    pub fn is_persisting(&self) -> bool {
        self.state == DraftState::Persisting
    }

    fn resting_state(&self) -> DraftState {
        match (&self.entry, self.has_changed) {
            (None, _) => DraftState::Empty,
            (Some(_), true) => DraftState::Editing,
            (Some(entry), false) if entry.new_record => DraftState::Empty,
            (Some(_), false) => DraftState::Loaded,
        }
    }

    fn refresh_changed(&mut self) {
        self.has_changed = match (&self.entry, &self.pristine) {
            (Some(entry), Some(pristine)) => {
                entry.data != pristine.data
                    || entry.locale_variants != pristine.locale_variants
                    || entry.meta != pristine.meta
                    || entry.media_files != pristine.media_files
            }
            (Some(_), None) => true,
            (None, _) => false,
        };
        if self.state != DraftState::Persisting {
            self.state = self.resting_state();
        }
    }

    // ==================== Editing ====================

    /// Set the value at dotted `key`.
    ///
    /// With a non-default `locale` the value goes to that locale's data.
    /// Fields marked `duplicate` are copied to every locale when the default
    /// locale changes.
    pub fn change_field(&mut self, collection: &Collection, key: &str, value: EntryData, locale: Option<&str>) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };
        let path = key_to_path(key);
        match (collection.i18n_settings(), locale) {
            (Some(settings), Some(locale)) if locale != settings.default_locale => {
                set_at_path(entry.locale_data_mut(locale, &settings.default_locale), &path, value);
            }
            (settings, _) => {
                set_at_path(&mut entry.data, &path, value);
                if let Some(settings) = settings
                    && collection
                        .select_field(key)
                        .is_some_and(|f| f.i18n_mode() == i18n::FieldI18n::Duplicate)
                {
                    let segments: Vec<&str> = path.iter().map(String::as_str).collect();
                    i18n::duplicate_field(settings, &segments, entry);
                }
            }
        }
        self.refresh_changed();
    }

    /// Set the custom path of a meta-path collection entry.
    pub fn change_meta_path(&mut self, path: Option<String>) {
        if let Some(entry) = self.entry.as_mut() {
            entry.meta.path = path;
            self.refresh_changed();
        }
    }

    /// Attach a media file uploaded in the draft.
    pub fn add_draft_media(&mut self, file: MediaFile) {
        if let Some(entry) = self.entry.as_mut() {
            entry.media_files.retain(|f| f.path != file.path);
            entry.media_files.push(MediaFile { draft: true, ..file });
            self.refresh_changed();
        }
    }

    /// Detach a media file by path.
    pub fn remove_draft_media(&mut self, path: &str) {
        if let Some(entry) = self.entry.as_mut() {
            entry.media_files.retain(|f| f.path != path);
            self.refresh_changed();
        }
    }

    // ==================== Validation ====================

    /// Validation errors by field key.
    pub fn fields_errors(&self) -> &FieldErrors {
        &self.fields_errors
    }

    /// Whether any field holds an error.
    pub fn has_errors(&self) -> bool {
        self.fields_errors.values().any(|errors| !errors.is_empty())
    }

    /// Replace the errors of one field.
    pub fn set_field_errors(&mut self, key: impl Into<String>, errors: Vec<FieldError>) {
        let key = key.into();
        if errors.is_empty() {
            self.fields_errors.shift_remove(&key);
        } else {
            self.fields_errors.insert(key, errors);
        }
    }

    /// Run required-field and custom-path checks, replacing all errors.
    ///
    /// `existing_paths` are the paths of the collection's loaded entries.
    /// Returns true when the draft is valid.
    pub fn validate<'a>(
        &mut self,
        collection: &Collection,
        slug_config: &SlugConfig,
        existing_paths: impl IntoIterator<Item = &'a str>,
    ) -> bool {
        let Some(entry) = &self.entry else {
            return true;
        };
        let mut errors = validate::validate_presence(collection, &entry.slug, &entry.data);
        if collection.has_meta_path() {
            let value = entry.meta.path.as_deref().unwrap_or_default();
            if let Some(error) =
                validate::validate_meta_path(collection, slug_config, value, existing_paths, &entry.path)
            {
                errors.insert(META_PATH_KEY.to_string(), vec![error]);
            }
        }
        self.fields_errors = errors;
        !self.has_errors()
    }

    // ==================== Persist transitions ====================

    /// Mark a save as started.
    pub fn start_persisting(&mut self) {
        if let Some(entry) = self.entry.as_mut() {
            entry.is_persisting = true;
            self.state = DraftState::Persisting;
        }
    }

    /// The save failed. The draft keeps its edits and goes back to loaded.
    pub fn persist_failed(&mut self) {
        if let Some(entry) = self.entry.as_mut() {
            entry.is_persisting = false;
            self.state = DraftState::Loaded;
        }
    }

    /// The save succeeded; `canonical` is the entry as now stored.
    pub fn persisted(&mut self, canonical: Entry) {
        self.pristine = Some(canonical.clone());
        self.entry = Some(canonical);
        self.has_changed = false;
        self.state = DraftState::Persisted;
    }

    // ==================== Local backup ====================

    /// Backup offered for recovery.
    pub fn local_backup(&self) -> Option<&Entry> {
        self.local_backup.as_ref()
    }

    /// Record (or clear) the backup offered for recovery.
    pub fn set_local_backup(&mut self, backup: Option<Entry>) {
        self.local_backup = backup;
    }

    /// Replace the draft with its backup, keeping the loaded snapshot so the
    /// restored changes show as changes.
    pub fn restore_local_backup(&mut self) -> bool {
        let Some(mut backup) = self.local_backup.take() else {
            return false;
        };
        if let Some(current) = &self.entry {
            backup.status = current.status;
            backup.new_record = current.new_record;
            backup.label = current.label.clone();
        }
        self.entry = Some(backup);
        self.key = Uuid::new_v4();
        self.refresh_changed();
        true
    }
}
