//! Collection definitions and the selectors the engine asks of them.
//!
//! A collection is either a *folder* collection (one file per entry under a
//! folder, new entries allowed when `create` is set) or a *files* collection
//! (a fixed list of named files). Everything that depends on that distinction
//! lives here so the engine can stay agnostic of it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::error::{QuireError, Result};
use crate::format::FormatKind;
use crate::i18n::{FieldI18n, I18nOptions, I18nSettings};
use crate::template::{self, TemplateDate};
use crate::value::{EntryData, get_at_key, get_at_path, is_truthy, key_to_path, value_to_string};

/// Candidate identifier field names, after `identifier_field`.
pub const IDENTIFIER_FIELDS: &[&str] = &["title", "path"];

/// Template variable holding the last commit author in summaries.
pub const COMMIT_AUTHOR: &str = "commit_author";

/// Template variable holding the last commit date in summaries.
pub const COMMIT_DATE: &str = "commit_date";

/// Whether a collection is folder based or a fixed list of files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    /// Entries are files in a folder
    Folder,
    /// Entries are named files
    Files,
}

/// A field in a collection schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Data key
    pub name: String,
    /// Display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Widget name (`string` when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
    /// Default value for new entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<EntryData>,
    /// Whether a value is required (true when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Subfields of an object or list widget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Field>>,
    /// Single item field of a list widget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<Box<Field>>,
    /// Variable types of a list widget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<Field>>,
    /// Translation behaviour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i18n: Option<FieldI18n>,
    /// Comment emitted above the key by formats that support comments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Media folder override for file and image widgets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_folder: Option<String>,
    /// Public folder override for file and image widgets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_folder: Option<String>,
    /// Whether the value lives in entry meta instead of data
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub meta: bool,
}

impl Field {
    /// A string field named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the widget (builder style).
    pub fn widget(mut self, widget: impl Into<String>) -> Self {
        self.widget = Some(widget.into());
        self
    }

    /// Set the translation mode (builder style).
    pub fn i18n(mut self, mode: FieldI18n) -> Self {
        self.i18n = Some(mode);
        self
    }

    /// Widget name, `string` when unset.
    pub fn widget_name(&self) -> &str {
        self.widget.as_deref().unwrap_or("string")
    }

    /// Whether a value must be present.
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(true)
    }

    /// Translation mode, `none` when unset.
    pub fn i18n_mode(&self) -> FieldI18n {
        self.i18n.unwrap_or_default()
    }

    /// Whether the field's value is a list.
    pub fn is_list(&self) -> bool {
        self.widget_name() == "list"
    }

    /// Direct subfields (`fields`, `field` and `types` combined).
    pub fn subfields(&self) -> Vec<&Field> {
        let mut out: Vec<&Field> = Vec::new();
        if let Some(fields) = &self.fields {
            out.extend(fields.iter());
        }
        if let Some(field) = &self.field {
            out.push(field);
        }
        if let Some(types) = &self.types {
            out.extend(types.iter());
        }
        out
    }

    /// Display label, the name when unset.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// A named file in a files collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionFile {
    /// Entry slug of the file
    pub name: String,
    /// Display label
    #[serde(default)]
    pub label: Option<String>,
    /// Repository path
    pub file: String,
    /// Field schema
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Media folder override
    #[serde(default)]
    pub media_folder: Option<String>,
    /// Public folder override
    #[serde(default)]
    pub public_folder: Option<String>,
}

/// Only entries whose `field` matches `value` belong to the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Data key to test
    pub field: String,
    /// Required value (or member, when the data holds a list)
    pub value: EntryData,
}

impl FilterRule {
    /// Whether `data` passes the rule.
    pub fn matches(&self, data: &EntryData) -> bool {
        match get_at_key(data, &self.field) {
            Some(EntryData::Array(items)) => items.contains(&self.value),
            Some(value) => *value == self.value,
            None => false,
        }
    }
}

/// Nested folder collection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nested {
    /// Maximum folder depth to list
    pub depth: usize,
    /// Summary template for the tree view
    #[serde(default)]
    pub summary: Option<String>,
}

/// The `meta.path` setting of a nested collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaPath {
    /// Widget (usually `string`)
    #[serde(default)]
    pub widget: Option<String>,
    /// Display label
    #[serde(default)]
    pub label: Option<String>,
    /// File name written inside the chosen folder
    #[serde(default = "default_index_file")]
    pub index_file: String,
}

fn default_index_file() -> String {
    "index".to_string()
}

/// Collection meta settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaConfig {
    /// Path-based metadata
    #[serde(default)]
    pub path: Option<MetaPath>,
}

/// A predefined filter offered in the collection view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewFilter {
    /// Display label
    pub label: String,
    /// Data key
    pub field: String,
    /// Value or regex source (`"^2024"`) to match
    pub pattern: EntryData,
    /// Stable id (label when unset)
    #[serde(default)]
    pub id: Option<String>,
}

/// A predefined grouping offered in the collection view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewGroup {
    /// Display label
    pub label: String,
    /// Data key
    pub field: String,
    /// Optional regex whose first match names the group
    #[serde(default)]
    pub pattern: Option<String>,
    /// Stable id (label when unset)
    #[serde(default)]
    pub id: Option<String>,
}

/// i18n setting on a collection: a flag inheriting the global settings, or
/// explicit options merged over them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectionI18n {
    /// `true` inherits the global settings
    Enabled(bool),
    /// Collection-specific overrides
    Options(I18nOptions),
}

/// A content collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Unique name
    pub name: String,
    /// Display label (plural)
    #[serde(default)]
    pub label: Option<String>,
    /// Display label (singular), used in commit messages
    #[serde(default)]
    pub label_singular: Option<String>,
    /// Folder holding the entries (folder collections)
    #[serde(default)]
    pub folder: Option<String>,
    /// Named files (files collections)
    #[serde(default)]
    pub files: Option<Vec<CollectionFile>>,
    /// File extension without the dot
    #[serde(default)]
    pub extension: Option<String>,
    /// Format of the entry files
    #[serde(default)]
    pub format: Option<FormatKind>,
    /// Field schema (folder collections)
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Entry filter
    #[serde(default)]
    pub filter: Option<FilterRule>,
    /// Whether new entries may be created
    #[serde(default)]
    pub create: bool,
    /// Whether entries may be deleted (folder: true, files: false when unset)
    #[serde(default)]
    pub delete: Option<bool>,
    /// Slug template (`{{slug}}` when unset)
    #[serde(default)]
    pub slug: Option<String>,
    /// Path template below the folder
    #[serde(default)]
    pub path: Option<String>,
    /// Nested folder settings
    #[serde(default)]
    pub nested: Option<Nested>,
    /// Meta settings
    #[serde(default)]
    pub meta: Option<MetaConfig>,
    /// i18n setting
    #[serde(default)]
    pub i18n: Option<CollectionI18n>,
    /// Media folder override
    #[serde(default)]
    pub media_folder: Option<String>,
    /// Public folder override
    #[serde(default)]
    pub public_folder: Option<String>,
    /// Summary template for list views
    #[serde(default)]
    pub summary: Option<String>,
    /// Field used as entry identifier
    #[serde(default)]
    pub identifier_field: Option<String>,
    /// Fields offered for sorting
    #[serde(default)]
    pub sortable_fields: Vec<String>,
    /// Predefined view filters
    #[serde(default)]
    pub view_filters: Vec<ViewFilter>,
    /// Predefined view groups
    #[serde(default)]
    pub view_groups: Vec<ViewGroup>,
    /// Whether the collection is listed by editors
    #[serde(default)]
    pub hide: bool,

    #[serde(skip)]
    i18n_settings: Option<I18nSettings>,
}

impl Collection {
    /// A folder collection.
    pub fn folder(name: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder: Some(folder.into()),
            ..Default::default()
        }
    }

    /// A files collection.
    pub fn files(name: impl Into<String>, files: Vec<CollectionFile>) -> Self {
        Self {
            name: name.into(),
            files: Some(files),
            ..Default::default()
        }
    }

    /// Attach resolved i18n settings (builder style).
    pub fn with_i18n(mut self, settings: I18nSettings) -> Self {
        self.i18n = Some(CollectionI18n::Enabled(true));
        self.i18n_settings = Some(settings);
        self
    }

    /// Resolve the i18n setting against the global options.
    pub fn resolve_i18n(&mut self, global: Option<&I18nOptions>) {
        self.i18n_settings = match &self.i18n {
            None | Some(CollectionI18n::Enabled(false)) => None,
            Some(CollectionI18n::Enabled(true)) => I18nSettings::resolve(None, global),
            Some(CollectionI18n::Options(local)) => I18nSettings::resolve(Some(local), global),
        };
    }

    /// Resolved i18n settings, when the collection is multi-locale.
    pub fn i18n_settings(&self) -> Option<&I18nSettings> {
        self.i18n_settings.as_ref()
    }

    /// Folder or files.
    pub fn kind(&self) -> CollectionKind {
        if self.folder.is_some() {
            CollectionKind::Folder
        } else {
            CollectionKind::Files
        }
    }

    /// Label used in commit messages.
    pub fn singular_label(&self) -> &str {
        self.label_singular
            .as_deref()
            .or(self.label.as_deref())
            .unwrap_or(&self.name)
    }

    fn folder_path(&self) -> &str {
        self.folder.as_deref().unwrap_or_default().trim_end_matches('/')
    }

    /// File extension for entries, without the dot.
    pub fn entry_extension(&self) -> String {
        if let Some(ext) = &self.extension {
            return ext.trim_start_matches('.').to_string();
        }
        self.format
            .unwrap_or_default()
            .extension()
            .to_string()
    }

    /// The configured file for `slug` in a files collection.
    pub fn file_for_slug(&self, slug: &str) -> Option<&CollectionFile> {
        self.files.as_ref()?.iter().find(|f| f.name == slug)
    }

    /// Repository path for `slug`.
    pub fn entry_path(&self, slug: &str) -> Option<String> {
        match self.kind() {
            CollectionKind::Folder => Some(format!(
                "{}/{}.{}",
                self.folder_path(),
                slug,
                self.entry_extension()
            )),
            CollectionKind::Files => self.file_for_slug(slug).map(|f| f.file.clone()),
        }
    }

    /// Slug for the entry stored at `path`.
    pub fn entry_slug(&self, path: &str) -> Option<String> {
        match self.kind() {
            CollectionKind::Folder => {
                let prefix = format!("{}/", self.folder_path());
                let relative = path.strip_prefix(&prefix).unwrap_or(path);
                let suffix = format!(".{}", self.entry_extension());
                let slug = relative.strip_suffix(&suffix).unwrap_or(relative);
                Some(slug.to_string())
            }
            CollectionKind::Files => self
                .files
                .as_ref()?
                .iter()
                .find(|f| f.file == path)
                .map(|f| f.name.clone()),
        }
    }

    /// Label of the file backing `slug` (files collections).
    pub fn file_label(&self, slug: &str) -> Option<&str> {
        self.file_for_slug(slug)?.label.as_deref()
    }

    /// Whether new entries may be created.
    pub fn allow_new_entries(&self) -> bool {
        match self.kind() {
            CollectionKind::Folder => self.create,
            CollectionKind::Files => false,
        }
    }

    /// Whether entries may be deleted.
    pub fn allow_deletion(&self) -> bool {
        match self.kind() {
            CollectionKind::Folder => self.delete.unwrap_or(true),
            CollectionKind::Files => self.delete.unwrap_or(false),
        }
    }

    /// Field schema for `slug` (the file's fields in a files collection).
    pub fn fields_for(&self, slug: &str) -> &[Field] {
        match self.kind() {
            CollectionKind::Folder => &self.fields,
            CollectionKind::Files => self
                .file_for_slug(slug)
                .map(|f| f.fields.as_slice())
                .unwrap_or_default(),
        }
    }

    /// Top-level field names in schema order, for key ordering on write.
    pub fn fields_order(&self, slug: &str) -> Result<Vec<String>> {
        if self.kind() == CollectionKind::Files && self.file_for_slug(slug).is_none() {
            return Err(QuireError::Config(format!(
                "No file found for '{slug}' in collection '{}'",
                self.name
            )));
        }
        Ok(self
            .fields_for(slug)
            .iter()
            .map(|f| f.name.clone())
            .collect())
    }

    /// Field comments keyed by dotted field name.
    pub fn fields_comments(&self, slug: &str) -> IndexMap<String, String> {
        let mut out = IndexMap::new();
        collect_comments(self.fields_for(slug), "", &mut out);
        out
    }

    /// Look up a (possibly nested) field by dotted key.
    pub fn select_field(&self, key: &str) -> Option<&Field> {
        select_field_in(&self.fields, key)
    }

    /// Every field name, nested ones dotted.
    pub fn field_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_names(&self.fields, "", &mut out);
        out
    }

    /// Whether the collection stores entries under user-chosen folders.
    pub fn has_meta_path(&self) -> bool {
        self.kind() == CollectionKind::Folder
            && self.meta.as_ref().and_then(|m| m.path.as_ref()).is_some()
    }

    /// Custom path for an entry of a meta-path collection.
    ///
    /// `folder/{meta.path}/{index_file}.{ext}`, or `None` when the collection
    /// does not use meta paths or the entry has none.
    pub fn custom_path(&self, meta_path: Option<&str>) -> Option<String> {
        let index_file = &self.meta.as_ref()?.path.as_ref()?.index_file;
        let meta_path = meta_path?;
        let mut parts = vec![self.folder_path().to_string()];
        let trimmed = meta_path.trim_matches('/');
        if !trimmed.is_empty() {
            parts.push(trimmed.to_string());
        }
        parts.push(format!("{index_file}.{}", self.entry_extension()));
        Some(parts.join("/"))
    }

    /// `meta.path` value for an entry at `path`: its folder relative to the
    /// collection folder, `/` at the root.
    pub fn meta_path_for(&self, path: &str) -> String {
        let prefix = format!("{}/", self.folder_path());
        let relative = path.strip_prefix(&prefix).unwrap_or(path);
        match relative.rsplit_once('/') {
            Some((dir, _)) if !dir.is_empty() => dir.to_string(),
            _ => "/".to_string(),
        }
    }

    /// Folder listing depth.
    pub fn depth(&self) -> usize {
        let depth = match (&self.nested, &self.path) {
            (Some(nested), _) => nested.depth,
            (None, Some(path)) => path.split('/').count(),
            (None, None) => 1,
        };
        match self.i18n_settings() {
            Some(settings) => settings.files_depth(depth),
            None => depth,
        }
    }

    /// Field holding the entry identifier.
    pub fn identifier(&self) -> Option<String> {
        let names = self.field_names();
        self.identifier_field
            .iter()
            .map(String::as_str)
            .chain(IDENTIFIER_FIELDS.iter().copied())
            .find(|id| {
                names
                    .iter()
                    .any(|n| n.trim().eq_ignore_ascii_case(id.trim()))
            })
            .map(String::from)
    }

    /// Infer the field playing role `role` (`title`, `shortTitle`, `author`,
    /// `date`, `description`, `image`) from widget types and name synonyms.
    pub fn inferred_field(&self, role: &str) -> Option<String> {
        if role == "title" && self.identifier_field.is_some() {
            return self.identifier();
        }
        let rule = InferableField::for_role(role)?;
        let main: Vec<&Field> = self
            .fields
            .iter()
            .filter(|f| f.widget_name() == rule.widget)
            .collect();
        if let Some(f) = main.iter().find(|f| rule.synonyms.contains(&f.name.as_str())) {
            return Some(f.name.clone());
        }
        if let Some(f) = self.fields.iter().find(|f| {
            rule.secondary.contains(&f.widget_name()) && rule.synonyms.contains(&f.name.as_str())
        }) {
            return Some(f.name.clone());
        }
        if rule.fallback_to_first {
            return main.first().map(|f| f.name.clone());
        }
        None
    }

    /// Display title of an entry: summary template, file label, inferred
    /// title field, then `title`.
    pub fn entry_title(&self, entry: &Entry) -> String {
        if let Some(summary) = &self.summary {
            return self.entry_summary(summary, entry);
        }
        if self.kind() == CollectionKind::Files
            && let Some(label) = self.file_label(&entry.slug)
        {
            return label.to_string();
        }
        let title_field = self.inferred_field("title");
        let value = title_field
            .as_deref()
            .and_then(|f| get_at_key(&entry.data, f))
            .filter(|v| is_truthy(v));
        match value {
            Some(v) => value_to_string(v),
            None => get_at_key(&entry.data, "title")
                .map(value_to_string)
                .unwrap_or_default(),
        }
    }

    /// Render a summary template for an entry.
    ///
    /// File template fields (`dirname`, `filename`, `extension`) and the last
    /// commit author/date are available besides the entry data.
    pub fn entry_summary(&self, summary: &str, entry: &Entry) -> String {
        let date = self
            .inferred_field("date")
            .and_then(|field| template::parse_date_from_entry(&entry.data, &field));
        let identifier = self
            .identifier()
            .and_then(|id| get_at_path(&entry.data, &key_to_path(&id)).map(value_to_string))
            .unwrap_or_default();
        let mut data = template::add_file_template_fields(
            &entry.path,
            &entry.data,
            self.folder.as_deref().unwrap_or_default(),
        );
        if let EntryData::Object(map) = &mut data {
            if let Some(author) = &entry.author
                && self.select_field(COMMIT_AUTHOR).is_none()
            {
                map.insert(COMMIT_AUTHOR.into(), author.clone().into());
            }
            if let Some(updated) = &entry.updated_on
                && self.select_field(COMMIT_DATE).is_none()
            {
                map.insert(COMMIT_DATE.into(), updated.clone().into());
            }
        }
        let date = match date {
            Some(d) => TemplateDate::At(d),
            None => TemplateDate::Disabled,
        };
        template::compile_string_template(summary, date, &identifier, &data, None)
            .unwrap_or_default()
    }

    /// Fields used for fuzzy search over this collection.
    ///
    /// The inferred title, short title, author and any summary template
    /// variables; a files collection searches its top-level field names.
    pub fn search_fields(&self) -> Vec<String> {
        if self.kind() == CollectionKind::Files {
            let mut names: Vec<String> = Vec::new();
            for file in self.files.iter().flatten() {
                for field in &file.fields {
                    if !names.contains(&field.name) {
                        names.push(field.name.clone());
                    }
                }
            }
            return names;
        }
        let mut out: Vec<String> = ["title", "shortTitle", "author"]
            .iter()
            .filter_map(|role| self.inferred_field(role))
            .collect();
        if let Some(summary) = &self.summary {
            for var in template::extract_template_vars(summary) {
                let is_date = matches!(
                    var.as_str(),
                    "year" | "month" | "day" | "hour" | "minute" | "second"
                );
                if is_date {
                    out.extend(self.inferred_field("date"));
                } else {
                    out.push(var);
                }
            }
        }
        let mut seen = Vec::new();
        out.retain(|f| {
            if seen.contains(f) {
                false
            } else {
                seen.push(f.clone());
                true
            }
        });
        out
    }
}

struct InferableField {
    widget: &'static str,
    secondary: &'static [&'static str],
    synonyms: &'static [&'static str],
    fallback_to_first: bool,
}

impl InferableField {
    fn for_role(role: &str) -> Option<Self> {
        let rule = match role {
            "title" => Self {
                widget: "string",
                secondary: &[],
                synonyms: &["title", "name", "label", "headline", "header"],
                fallback_to_first: true,
            },
            "shortTitle" => Self {
                widget: "string",
                secondary: &[],
                synonyms: &["short_title", "shortTitle", "short"],
                fallback_to_first: false,
            },
            "author" => Self {
                widget: "string",
                secondary: &[],
                synonyms: &["author", "name", "by", "byline", "owner"],
                fallback_to_first: false,
            },
            "date" => Self {
                widget: "datetime",
                secondary: &["date"],
                synonyms: &["date", "publishDate", "publish_date"],
                fallback_to_first: false,
            },
            "description" => Self {
                widget: "string",
                secondary: &["text", "markdown"],
                synonyms: &[
                    "shortDescription",
                    "short_description",
                    "shortdescription",
                    "description",
                    "intro",
                    "introduction",
                    "brief",
                    "content",
                    "biography",
                    "bio",
                    "summary",
                ],
                fallback_to_first: false,
            },
            "image" => Self {
                widget: "image",
                secondary: &[],
                synonyms: &[
                    "image", "thumbnail", "thumb", "picture", "avatar", "photo", "cover", "hero",
                    "logo",
                ],
                fallback_to_first: false,
            },
            _ => return None,
        };
        Some(rule)
    }
}

/// Look up a field by dotted key inside `fields`.
///
/// List indices in the key are skipped, so `authors.0.name` finds the `name`
/// subfield of the `authors` list.
pub fn select_field_in<'a>(fields: &'a [Field], key: &str) -> Option<&'a Field> {
    let path = key_to_path(key);
    let mut candidates: Vec<&Field> = fields.iter().collect();
    let mut found: Option<&Field> = None;
    for segment in path.iter().filter(|s| s.parse::<usize>().is_err()) {
        let field = candidates.iter().copied().find(|f| f.name == *segment)?;
        found = Some(field);
        candidates = field.subfields();
    }
    found
}

fn collect_names<'a>(fields: impl IntoIterator<Item = &'a Field>, prefix: &str, out: &mut Vec<String>) {
    for field in fields {
        let name = format!("{prefix}{}", field.name);
        out.push(name.clone());
        collect_names(field.subfields(), &format!("{name}."), out);
    }
}

fn collect_comments(fields: &[Field], prefix: &str, out: &mut IndexMap<String, String>) {
    for field in fields {
        let name = format!("{prefix}{}", field.name);
        if let Some(comment) = &field.comment {
            out.insert(name.clone(), comment.clone());
        }
        if let Some(sub) = &field.fields {
            collect_comments(sub, &format!("{name}."), out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::I18nStructure;
    use crate::test_utils::posts_collection;
    use serde_json::json;

    fn settings_collection() -> Collection {
        Collection::files(
            "settings",
            vec![CollectionFile {
                name: "general".into(),
                label: Some("General".into()),
                file: "data/general.yml".into(),
                fields: vec![Field::new("site_title"), Field::new("tagline")],
                ..Default::default()
            }],
        )
    }

    // ── paths ──

    #[test]
    fn folder_paths_and_slugs() {
        let posts = posts_collection();
        assert_eq!(posts.entry_path("hello").as_deref(), Some("content/posts/hello.md"));
        assert_eq!(posts.entry_slug("content/posts/hello.md").as_deref(), Some("hello"));
        assert_eq!(
            posts.entry_slug("content/posts/2024/hello.md").as_deref(),
            Some("2024/hello")
        );
    }

    #[test]
    fn files_paths_and_slugs() {
        let settings = settings_collection();
        assert_eq!(settings.entry_path("general").as_deref(), Some("data/general.yml"));
        assert_eq!(settings.entry_slug("data/general.yml").as_deref(), Some("general"));
        assert_eq!(settings.entry_path("missing"), None);
        assert_eq!(settings.file_label("general"), Some("General"));
    }

    #[test]
    fn extension_follows_format() {
        let mut c = Collection::folder("data", "data");
        c.format = Some(FormatKind::Json);
        assert_eq!(c.entry_extension(), "json");
        c.extension = Some(".markdown".into());
        assert_eq!(c.entry_extension(), "markdown");
        assert_eq!(Collection::folder("x", "x").entry_extension(), "md");
    }

    #[test]
    fn permissions_default_by_kind() {
        let mut posts = posts_collection();
        assert!(posts.allow_new_entries());
        assert!(posts.allow_deletion());
        posts.create = false;
        posts.delete = Some(false);
        assert!(!posts.allow_new_entries());
        assert!(!posts.allow_deletion());

        let settings = settings_collection();
        assert!(!settings.allow_new_entries());
        assert!(!settings.allow_deletion());
    }

    #[test]
    fn fields_order_errors_for_unknown_file() {
        let settings = settings_collection();
        assert_eq!(settings.fields_order("general").unwrap(), vec!["site_title", "tagline"]);
        assert!(settings.fields_order("nope").is_err());
    }

    // ── meta path ──

    #[test]
    fn custom_path_joins_meta_folder_and_index_file() {
        let mut pages = Collection::folder("pages", "content/pages");
        pages.meta = Some(MetaConfig {
            path: Some(MetaPath {
                widget: None,
                label: None,
                index_file: "index".into(),
            }),
        });
        assert!(pages.has_meta_path());
        assert_eq!(
            pages.custom_path(Some("about/team")).as_deref(),
            Some("content/pages/about/team/index.md")
        );
        assert_eq!(pages.custom_path(Some("/")).as_deref(), Some("content/pages/index.md"));
        assert_eq!(pages.meta_path_for("content/pages/about/team/index.md"), "about/team");
        assert_eq!(pages.meta_path_for("content/pages/index.md"), "/");
        assert_eq!(posts_collection().custom_path(Some("x")), None);
    }

    #[test]
    fn depth_accounts_for_path_and_locales() {
        let mut c = posts_collection();
        assert_eq!(c.depth(), 1);
        c.path = Some("{{year}}/{{slug}}".into());
        assert_eq!(c.depth(), 2);
        let c = c.with_i18n(I18nSettings::new(I18nStructure::MultipleFolders, &["en", "de"]));
        assert_eq!(c.depth(), 3);
    }

    // ── inference ──

    #[test]
    fn identifier_and_inferred_fields() {
        let mut c = posts_collection();
        assert_eq!(c.identifier().as_deref(), Some("title"));
        assert_eq!(c.inferred_field("title").as_deref(), Some("title"));
        assert_eq!(c.inferred_field("date").as_deref(), Some("date"));
        assert_eq!(c.inferred_field("image"), None);

        c.identifier_field = Some("name".into());
        c.fields.push(Field::new("name"));
        assert_eq!(c.identifier().as_deref(), Some("name"));
        assert_eq!(c.inferred_field("title").as_deref(), Some("name"));
    }

    #[test]
    fn entry_title_prefers_summary() {
        let mut c = posts_collection();
        let entry = Entry::new("posts", "hello", "content/posts/hello.md")
            .with_data(json!({"title": "Hello", "date": "2024-03-05T10:00:00Z"}));
        assert_eq!(c.entry_title(&entry), "Hello");
        c.summary = Some("{{year}}: {{title}} ({{filename}})".into());
        assert_eq!(c.entry_title(&entry), "2024: Hello (hello)");
    }

    #[test]
    fn filter_rule_matches_value_or_member() {
        let rule = FilterRule {
            field: "lang".into(),
            value: json!("en"),
        };
        assert!(rule.matches(&json!({"lang": "en"})));
        assert!(rule.matches(&json!({"lang": ["de", "en"]})));
        assert!(!rule.matches(&json!({"lang": "de"})));
        assert!(!rule.matches(&json!({})));
    }

    #[test]
    fn select_field_walks_nested_lists() {
        let mut authors = Field::new("authors").widget("list");
        authors.fields = Some(vec![Field::new("name")]);
        let fields = vec![authors];
        assert_eq!(select_field_in(&fields, "authors.0.name").map(|f| f.name.as_str()), Some("name"));
        assert!(select_field_in(&fields, "authors.0.age").is_none());
    }
}
