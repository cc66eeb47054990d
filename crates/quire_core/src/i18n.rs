//! Multi-locale entries.
//!
//! A collection with i18n enabled stores one logical entry as several files
//! (or one file keyed by locale). This module maps between the two shapes:
//! [`split_locales`] produces the files to write for an [`Entry`], and
//! [`group_entries`] folds listed per-locale entries back into logical ones.
//!
//! Path layouts, for slug `hello` with extension `md`:
//!
//! | structure          | `en` file                  | `de` file                  |
//! |--------------------|----------------------------|----------------------------|
//! | `multiple_folders` | `posts/en/hello.md`        | `posts/de/hello.md`        |
//! | `multiple_files`   | `posts/hello.en.md`        | `posts/hello.de.md`        |
//! | `single_file`      | `posts/hello.md`           | same file, keyed by locale |

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::collection::{Collection, Field};
use crate::entry::Entry;
use crate::value::{EntryData, empty_data, get_at_path, set_at_path};

/// How locale variants are laid out on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum I18nStructure {
    /// One folder per locale
    #[default]
    MultipleFolders,
    /// One file per locale with the locale before the extension
    MultipleFiles,
    /// One file with top-level locale keys
    SingleFile,
}

/// i18n settings as written in configuration (global or per collection).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct I18nOptions {
    /// Layout on disk
    #[serde(default)]
    pub structure: Option<I18nStructure>,
    /// Enabled locales
    #[serde(default)]
    pub locales: Option<Vec<String>>,
    /// Default locale (the first locale when unset)
    #[serde(default)]
    pub default_locale: Option<String>,
}

/// Resolved i18n settings of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct I18nSettings {
    /// Layout on disk
    pub structure: I18nStructure,
    /// Enabled locales, default included
    pub locales: Vec<String>,
    /// Locale whose data lives in `Entry::data`
    pub default_locale: String,
}

impl I18nSettings {
    /// Settings with the first locale as default.
    pub fn new(structure: I18nStructure, locales: &[&str]) -> Self {
        Self {
            structure,
            locales: locales.iter().map(|l| l.to_string()).collect(),
            default_locale: locales.first().map(|l| l.to_string()).unwrap_or_default(),
        }
    }

    /// Merge collection-level options over the global ones.
    ///
    /// Returns `None` when no locales are configured.
    pub fn resolve(local: Option<&I18nOptions>, global: Option<&I18nOptions>) -> Option<Self> {
        let locales: Vec<String> = local
            .and_then(|o| o.locales.clone())
            .or_else(|| global.and_then(|o| o.locales.clone()))
            .filter(|l| !l.is_empty())?;
        let structure = local
            .and_then(|o| o.structure)
            .or_else(|| global.and_then(|o| o.structure))
            .unwrap_or_default();
        let default_locale = local
            .and_then(|o| o.default_locale.clone())
            .or_else(|| global.and_then(|o| o.default_locale.clone()))
            .filter(|d| locales.contains(d))
            .unwrap_or_else(|| locales[0].clone());
        Some(Self {
            structure,
            locales,
            default_locale,
        })
    }

    /// Locales other than the default, in configuration order.
    pub fn other_locales(&self) -> impl Iterator<Item = &str> {
        self.locales
            .iter()
            .map(String::as_str)
            .filter(move |l| *l != self.default_locale)
    }

    /// Listing depth adjusted for the layout.
    pub fn files_depth(&self, depth: usize) -> usize {
        match self.structure {
            I18nStructure::MultipleFolders => depth + 1,
            _ => depth,
        }
    }
}

/// Per-field translation behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldI18n {
    /// Each locale has its own value
    Translate,
    /// Value is copied from the default locale
    Duplicate,
    /// Only the default locale has the field
    #[default]
    None,
}

impl<'de> Deserialize<'de> for FieldI18n {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Text(String),
        }
        match Raw::deserialize(d)? {
            Raw::Bool(true) => Ok(FieldI18n::Translate),
            Raw::Bool(false) => Ok(FieldI18n::None),
            Raw::Text(text) => match text.as_str() {
                "translate" => Ok(FieldI18n::Translate),
                "duplicate" => Ok(FieldI18n::Duplicate),
                "none" => Ok(FieldI18n::None),
                other => Err(serde::de::Error::unknown_variant(
                    other,
                    &["translate", "duplicate", "none"],
                )),
            },
        }
    }
}

// ============================================================================
// Paths
// ============================================================================

/// Path of `locale`'s file for an entry at `path`.
pub fn locale_file_path(
    structure: I18nStructure,
    extension: &str,
    path: &str,
    slug: &str,
    locale: &str,
) -> String {
    match structure {
        I18nStructure::MultipleFolders => {
            let needle = format!("/{slug}");
            match path.rfind(&needle) {
                Some(at) => format!("{}/{locale}{}", &path[..at], &path[at..]),
                None => format!("{locale}/{path}"),
            }
        }
        I18nStructure::MultipleFiles => {
            let suffix = format!(".{extension}");
            match path.strip_suffix(&suffix) {
                Some(stem) => format!("{stem}.{locale}.{extension}"),
                None => format!("{path}.{locale}"),
            }
        }
        I18nStructure::SingleFile => path.to_string(),
    }
}

/// Every file path an entry occupies, used when deleting it.
pub fn file_paths(settings: &I18nSettings, extension: &str, path: &str, slug: &str) -> Vec<String> {
    if settings.structure == I18nStructure::SingleFile {
        return vec![path.to_string()];
    }
    settings
        .locales
        .iter()
        .map(|locale| locale_file_path(settings.structure, extension, path, slug, locale))
        .collect()
}

/// Locale encoded in a listed file path.
pub fn locale_from_path(structure: I18nStructure, extension: &str, path: &str) -> Option<String> {
    match structure {
        I18nStructure::MultipleFolders => {
            let mut parts = path.rsplit('/');
            parts.next()?;
            parts.next().map(String::from)
        }
        I18nStructure::MultipleFiles => {
            let stem = path.strip_suffix(&format!(".{extension}"))?;
            let (_, locale) = stem.rsplit_once('.')?;
            (!locale.contains('/')).then(|| locale.to_string())
        }
        I18nStructure::SingleFile => None,
    }
}

/// Strip the locale from a per-locale file path, yielding the logical path.
pub fn normalize_file_path(structure: I18nStructure, path: &str, locale: &str) -> String {
    match structure {
        I18nStructure::MultipleFolders => {
            let segment = format!("{locale}/");
            if let Some(rest) = path.strip_prefix(&segment) {
                return rest.to_string();
            }
            path.replacen(&format!("/{segment}"), "/", 1)
        }
        I18nStructure::MultipleFiles => {
            let marker = format!(".{locale}.");
            match path.rfind(&marker) {
                Some(at) => format!("{}.{}", &path[..at], &path[at + marker.len()..]),
                None => path.to_string(),
            }
        }
        I18nStructure::SingleFile => path.to_string(),
    }
}

// ============================================================================
// Split
// ============================================================================

/// One file to write for a multi-locale entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleFile {
    /// Locale of this file; `None` for a single-file layout
    pub locale: Option<String>,
    /// Current path
    pub path: String,
    /// New path when the entry is being moved
    pub new_path: Option<String>,
    /// Data to encode
    pub data: EntryData,
}

/// Split an entry into the files its locales occupy.
///
/// Locales without data produce no file. In a single-file layout the
/// result is one file whose data is keyed by locale.
pub fn split_locales(
    settings: &I18nSettings,
    extension: &str,
    entry: &Entry,
    path: &str,
    slug: &str,
    new_path: Option<&str>,
) -> Vec<LocaleFile> {
    if settings.structure == I18nStructure::SingleFile {
        let mut data = serde_json::Map::new();
        for locale in &settings.locales {
            if let Some(value) = entry.locale_data(locale, &settings.default_locale) {
                data.insert(locale.clone(), value.clone());
            }
        }
        return vec![LocaleFile {
            locale: None,
            path: path.to_string(),
            new_path: new_path.map(String::from),
            data: EntryData::Object(data),
        }];
    }

    settings
        .locales
        .iter()
        .filter_map(|locale| {
            let data = entry.locale_data(locale, &settings.default_locale)?;
            Some(LocaleFile {
                locale: Some(locale.clone()),
                path: locale_file_path(settings.structure, extension, path, slug, locale),
                new_path: new_path
                    .map(|p| locale_file_path(settings.structure, extension, p, slug, locale)),
                data: data.clone(),
            })
        })
        .collect()
}

// ============================================================================
// Merge
// ============================================================================

/// Fold the per-locale entries of one logical entry into a single entry.
///
/// The default locale's entry provides the identity; when it is missing the
/// first available locale is used instead. The merged entry has no raw body.
pub fn merge_locale_entries(
    collection: &Collection,
    settings: &I18nSettings,
    entries: Vec<(String, Entry)>,
) -> Option<Entry> {
    let base_index = entries
        .iter()
        .position(|(locale, _)| *locale == settings.default_locale)
        .unwrap_or(0);
    let mut base: Option<(String, Entry)> = None;
    let mut variants = IndexMap::new();
    for (index, (locale, entry)) in entries.into_iter().enumerate() {
        if index == base_index {
            base = Some((locale, entry));
        } else {
            variants.insert(locale, entry.data);
        }
    }
    let (locale, mut entry) = base?;
    if locale != settings.default_locale {
        tracing::warn!(
            collection = %collection.name,
            path = %entry.path,
            "default locale file missing, using '{locale}'"
        );
        variants.insert(locale.clone(), std::mem::replace(&mut entry.data, empty_data()));
    }

    entry.path = normalize_file_path(settings.structure, &entry.path, &locale);
    if let Some(slug) = collection.entry_slug(&entry.path) {
        entry.slug = slug;
    }
    entry.raw = String::new();
    entry.locale_variants = settings
        .locales
        .iter()
        .filter_map(|l| variants.shift_remove(l).map(|data| (l.clone(), data)))
        .collect();
    Some(entry)
}

/// Unpack a single-file entry whose data is keyed by locale.
pub fn merge_single_file(settings: &I18nSettings, mut entry: Entry) -> Entry {
    let mut by_locale = match std::mem::replace(&mut entry.data, empty_data()) {
        EntryData::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    entry.data = by_locale
        .shift_remove(&settings.default_locale)
        .unwrap_or_else(empty_data);
    entry.locale_variants = settings
        .other_locales()
        .filter_map(|l| by_locale.shift_remove(l).map(|data| (l.to_string(), data)))
        .collect();
    entry.raw = String::new();
    entry
}

/// Group listed per-locale entries into logical entries.
///
/// Order follows the first appearance of each logical path.
pub fn group_entries(
    collection: &Collection,
    settings: &I18nSettings,
    extension: &str,
    entries: Vec<Entry>,
) -> Vec<Entry> {
    if settings.structure == I18nStructure::SingleFile {
        return entries
            .into_iter()
            .map(|e| merge_single_file(settings, e))
            .collect();
    }

    let mut groups: IndexMap<String, Vec<(String, Entry)>> = IndexMap::new();
    for entry in entries {
        let Some(locale) = locale_from_path(settings.structure, extension, &entry.path)
            .filter(|l| settings.locales.contains(l))
        else {
            tracing::debug!(path = %entry.path, "skipping file outside configured locales");
            continue;
        };
        let logical = normalize_file_path(settings.structure, &entry.path, &locale);
        groups.entry(logical).or_default().push((locale, entry));
    }

    groups
        .into_values()
        .filter_map(|group| merge_locale_entries(collection, settings, group))
        .collect()
}

// ============================================================================
// Field helpers
// ============================================================================

/// Raw bodies of the non-default locales, for draft backups.
pub fn backup_variants(
    settings: &I18nSettings,
    entry: &Entry,
    mut encode: impl FnMut(&EntryData) -> crate::error::Result<String>,
) -> crate::error::Result<IndexMap<String, String>> {
    let mut out = IndexMap::new();
    for locale in settings.other_locales() {
        if let Some(data) = entry.locale_variants.get(locale) {
            out.insert(locale.to_string(), encode(data)?);
        }
    }
    Ok(out)
}

/// Copy default-locale values of `duplicate` fields into every variant.
pub fn duplicate_fields(settings: &I18nSettings, fields: &[Field], entry: &mut Entry) {
    for field in fields {
        if field.i18n_mode() == FieldI18n::Duplicate {
            duplicate_field(settings, &[field.name.as_str()], entry);
        }
    }
}

/// Copy the default-locale value at `path` into every non-default locale.
pub fn duplicate_field(settings: &I18nSettings, path: &[&str], entry: &mut Entry) {
    let value = get_at_path(&entry.data, path).cloned();
    for locale in settings.other_locales() {
        let target = entry.locale_data_mut(locale, &settings.default_locale);
        match &value {
            Some(value) => {
                set_at_path(target, path, value.clone());
            }
            None => {
                crate::value::remove_at_path(target, path);
            }
        }
    }
}

/// Seed data for non-default locales of a new entry.
///
/// Only fields marked for translation or duplication get a slot; duplicated
/// fields take the default locale's value.
pub fn placeholder_variants(
    settings: &I18nSettings,
    fields: &[Field],
    default_data: &EntryData,
) -> IndexMap<String, EntryData> {
    let mut seeded = empty_data();
    for field in fields {
        let value = match field.i18n_mode() {
            FieldI18n::Duplicate => default_data.get(&field.name).cloned(),
            FieldI18n::Translate => field.default.clone(),
            FieldI18n::None => None,
        };
        if let Some(value) = value {
            set_at_path(&mut seeded, &[field.name.as_str()], value);
        }
    }
    settings
        .other_locales()
        .map(|l| (l.to_string(), seeded.clone()))
        .collect()
}
