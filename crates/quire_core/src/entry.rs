//! Entry value objects exchanged between the engine, the draft and backends.
//!
//! [`Entry`] is the logical document. [`RawFile`] and [`DataFile`] are the
//! backend-facing shapes: what a provider returns when listing and what the
//! engine hands it when persisting.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::{EntryData, empty_data};
use crate::workflow::WorkflowStatus;

/// Serde helper storing optional binary content as base64 text.
mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => s.serialize_some(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(d)?;
        encoded
            .map(|text| STANDARD.decode(text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Metadata fields edited alongside the entry data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Folder of the entry relative to the collection folder (`/` at the root).
    /// Only used by collections with a `meta.path` setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// A media file attached to an entry or listed in a media folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Provider id (often the path or a blob sha)
    pub id: String,
    /// File name
    pub name: String,
    /// Repository path
    pub path: String,
    /// Size in bytes when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Public or display URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// True while the file exists only in the draft (not yet committed)
    #[serde(default)]
    pub draft: bool,
    /// Field the file was added through
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// File content for draft files, kept so backups can restore them
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<u8>>,
}

impl MediaFile {
    /// A committed media file at `path`.
    pub fn at_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            id: path.clone(),
            name,
            path,
            ..Default::default()
        }
    }

    /// A draft media file carrying its content.
    pub fn draft(path: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            size: Some(content.len() as u64),
            draft: true,
            content: Some(content),
            ..Self::at_path(path)
        }
    }
}

/// A binary asset to upload together with an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetProxy {
    /// Target repository path
    pub path: String,
    /// File content
    #[serde(with = "base64_bytes")]
    pub content: Option<Vec<u8>>,
    /// Field the asset belongs to
    #[serde(default)]
    pub field: Option<String>,
}

impl AssetProxy {
    /// Build the upload proxy for a draft media file.
    pub fn from_media_file(file: &MediaFile) -> Self {
        Self {
            path: file.path.clone(),
            content: file.content.clone(),
            field: file.field.clone(),
        }
    }
}

/// The logical unit of content tracked by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Owning collection name
    pub collection: String,
    /// Stable identifier; empty for a draft that has never been persisted
    pub slug: String,
    /// Resolved repository path; empty for a never-persisted draft
    pub path: String,
    /// Unparsed file body (empty for merged multi-locale entries)
    #[serde(default)]
    pub raw: String,
    /// Decoded data of the default locale
    pub data: EntryData,
    /// Data of the non-default locales, keyed by locale
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub locale_variants: IndexMap<String, EntryData>,
    /// Meta fields (custom path)
    #[serde(default)]
    pub meta: EntryMeta,
    /// Attached media
    #[serde(default)]
    pub media_files: Vec<MediaFile>,
    /// Display label supplied by the backend (file collections)
    #[serde(default)]
    pub label: Option<String>,
    /// Last commit author
    #[serde(default)]
    pub author: Option<String>,
    /// Last commit date
    #[serde(default)]
    pub updated_on: Option<String>,
    /// A persist is in flight
    #[serde(default)]
    pub is_persisting: bool,
    /// A delete is in flight
    #[serde(default)]
    pub is_deleting: bool,
    /// True until the first successful persist
    #[serde(default)]
    pub new_record: bool,
    /// Editorial workflow status (unpublished entries only)
    #[serde(default)]
    pub status: Option<WorkflowStatus>,
}

impl Entry {
    /// Create an entry with the given identity and empty data.
    pub fn new(collection: impl Into<String>, slug: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            slug: slug.into(),
            path: path.into(),
            raw: String::new(),
            data: empty_data(),
            locale_variants: IndexMap::new(),
            meta: EntryMeta::default(),
            media_files: Vec::new(),
            label: None,
            author: None,
            updated_on: None,
            is_persisting: false,
            is_deleting: false,
            new_record: false,
            status: None,
        }
    }

    /// Set the entry data (builder style).
    pub fn with_data(mut self, data: EntryData) -> Self {
        self.data = data;
        self
    }

    /// Set the raw body (builder style).
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = raw.into();
        self
    }

    /// Key used by the editorial workflow: `collection.slug`.
    pub fn workflow_key(&self) -> String {
        workflow_key(&self.collection, &self.slug)
    }

    /// Data for `locale`, where the default locale lives in `data`.
    pub fn locale_data(&self, locale: &str, default_locale: &str) -> Option<&EntryData> {
        if locale == default_locale {
            Some(&self.data)
        } else {
            self.locale_variants.get(locale)
        }
    }

    /// Mutable data for `locale`, creating an empty variant when missing.
    pub fn locale_data_mut(&mut self, locale: &str, default_locale: &str) -> &mut EntryData {
        if locale == default_locale {
            &mut self.data
        } else {
            self.locale_variants
                .entry(locale.to_string())
                .or_insert_with(empty_data)
        }
    }

    /// Media files created in the draft and not committed yet.
    pub fn draft_media_files(&self) -> impl Iterator<Item = &MediaFile> {
        self.media_files.iter().filter(|file| file.draft)
    }
}

/// Build the workflow key for an entry.
pub fn workflow_key(collection: &str, slug: &str) -> String {
    format!("{collection}.{slug}")
}

/// File metadata reported by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Repository path
    pub path: String,
    /// Provider id (blob sha or similar)
    #[serde(default)]
    pub id: Option<String>,
    /// Display label (file collections)
    #[serde(default)]
    pub label: Option<String>,
    /// Last commit author
    #[serde(default)]
    pub author: Option<String>,
    /// Last commit date
    #[serde(default)]
    pub updated_on: Option<String>,
}

/// A raw file as returned by a backend listing or fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFile {
    /// File body
    pub data: String,
    /// File metadata
    pub file: FileInfo,
}

impl RawFile {
    /// A raw file with only a path and body.
    pub fn new(path: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            file: FileInfo {
                path: path.into(),
                ..Default::default()
            },
        }
    }
}

/// A file requested by path, optionally labelled (file collections).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Repository path
    pub path: String,
    /// Display label
    #[serde(default)]
    pub label: Option<String>,
}

/// One serialized file handed to the backend on persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFile {
    /// Current repository path
    pub path: String,
    /// Entry slug
    pub slug: String,
    /// Serialized body
    pub raw: String,
    /// New path when the entry is being moved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,
}

/// A user returned by authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Login handle
    #[serde(default)]
    pub login: Option<String>,
    /// Access token
    #[serde(default)]
    pub token: Option<String>,
    /// Avatar URL
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Backend this user authenticated against
    #[serde(default)]
    pub backend_name: Option<String>,
}

/// Credentials passed to [`crate::backend::BackendClient::authenticate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Access token
    #[serde(default)]
    pub token: Option<String>,
    /// Refresh token, for providers that rotate tokens
    #[serde(default)]
    pub refresh_token: Option<String>,
}
