//! Storage provider interface.
//!
//! A [`BackendClient`] is the only thing that talks to where content
//! actually lives (a git host, a local folder, memory in tests). The engine
//! never sees provider specifics: it hands over serialized [`DataFile`]s and
//! receives [`RawFile`]s back.
//!
//! Editorial workflow methods are optional. Backends without review support
//! keep the defaults, which report [`QuireError::Unsupported`].

mod local;
mod memory;
mod registry;

pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use registry::{BackendFactory, BackendRegistry};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::entry::{AssetProxy, Credentials, DataFile, FileRef, MediaFile, RawFile, User};
use crate::error::{QuireError, Result};
use crate::workflow::WorkflowStatus;

/// One page of a folder listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPage {
    /// Files on this page
    pub entries: Vec<RawFile>,
    /// Cursor for further pages
    pub cursor: Cursor,
}

/// Files and assets written by one persist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistEntry {
    /// Serialized entry files (one per locale for multi-file layouts)
    pub data_files: Vec<DataFile>,
    /// Media uploaded with the entry
    pub assets: Vec<AssetProxy>,
}

/// Options accompanying a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistOptions {
    /// The entry does not exist yet; the backend must refuse an occupied path
    pub new_entry: bool,
    /// Commit message
    pub commit_message: String,
    /// Collection of the entry
    pub collection_name: String,
    /// Write to the unpublished (review) area instead of publishing
    pub use_workflow: bool,
    /// Review status to record with an unpublished write
    pub status: Option<WorkflowStatus>,
    /// Only update the review status, data files are unchanged
    pub status_only: bool,
}

/// Reachability of the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    /// Provider API is reachable
    pub api: bool,
    /// Current credentials are valid
    pub auth: bool,
}

impl Default for BackendStatus {
    fn default() -> Self {
        Self {
            api: true,
            auth: true,
        }
    }
}

/// An entry waiting in the review area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnpublishedEntry {
    /// Collection name
    pub collection: String,
    /// Entry slug
    pub slug: String,
    /// Review status
    pub status: WorkflowStatus,
    /// Data files as they will be published
    pub files: Vec<RawFile>,
    /// Whether publishing changes an existing entry
    #[serde(default)]
    pub is_modification: bool,
    /// Last change
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A storage provider.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Provider name as used in configuration.
    fn name(&self) -> &str;

    /// Whether the provider keeps commit history (enables commit sort fields).
    fn is_git_backend(&self) -> bool {
        false
    }

    /// Exchange credentials for a user.
    async fn authenticate(&self, credentials: &Credentials) -> Result<User>;

    /// Validate a previously stored user, returning a refreshed copy.
    async fn restore_user(&self, user: &User) -> Result<User> {
        self.authenticate(&Credentials {
            token: user.token.clone(),
            refresh_token: None,
        })
        .await
    }

    /// Drop the provider session.
    async fn logout(&self) -> Result<()> {
        Ok(())
    }

    /// Provider reachability.
    async fn status(&self) -> Result<BackendStatus> {
        Ok(BackendStatus::default())
    }

    /// Fetch one file.
    async fn get_entry(&self, path: &str) -> Result<RawFile>;

    /// List files with `extension` under `folder`, at most `depth` levels deep.
    async fn entries_by_folder(&self, folder: &str, extension: &str, depth: usize)
    -> Result<EntryPage>;

    /// Fetch the named files of a files collection.
    async fn entries_by_files(&self, files: &[FileRef]) -> Result<Vec<RawFile>>;

    /// List every file under `folder` in one call.
    ///
    /// Optional: the engine falls back to following cursors.
    async fn all_entries_by_folder(
        &self,
        _folder: &str,
        _extension: &str,
        _depth: usize,
    ) -> Result<Vec<RawFile>> {
        Err(QuireError::unsupported(self.name(), "all_entries_by_folder"))
    }

    /// Follow `action` on a cursor previously returned by this backend.
    async fn traverse_cursor(&self, cursor: &Cursor, action: &str) -> Result<EntryPage>;

    /// Write entry files and their assets in one commit.
    async fn persist_entry(&self, entry: &PersistEntry, options: &PersistOptions) -> Result<()>;

    /// Upload one media file.
    async fn persist_media(&self, asset: &AssetProxy, options: &PersistOptions) -> Result<MediaFile>;

    /// Delete files in one commit.
    async fn delete_files(&self, paths: &[String], commit_message: &str) -> Result<()>;

    /// List media under `folder`.
    async fn get_media(&self, folder: &str) -> Result<Vec<MediaFile>>;

    /// Fetch one media file with its content.
    async fn get_media_file(&self, path: &str) -> Result<MediaFile>;

    // ==================== Editorial workflow ====================

    /// Every entry in the review area.
    async fn unpublished_entries(&self) -> Result<Vec<UnpublishedEntry>> {
        Err(QuireError::unsupported(self.name(), "unpublished_entries"))
    }

    /// One entry from the review area.
    async fn unpublished_entry(&self, _collection: &str, _slug: &str) -> Result<UnpublishedEntry> {
        Err(QuireError::unsupported(self.name(), "unpublished_entry"))
    }

    /// Move an unpublished entry to `status`.
    async fn update_unpublished_entry_status(
        &self,
        _collection: &str,
        _slug: &str,
        _status: WorkflowStatus,
    ) -> Result<()> {
        Err(QuireError::unsupported(self.name(), "update_unpublished_entry_status"))
    }

    /// Publish an unpublished entry.
    async fn publish_unpublished_entry(&self, _collection: &str, _slug: &str) -> Result<()> {
        Err(QuireError::unsupported(self.name(), "publish_unpublished_entry"))
    }

    /// Discard an unpublished entry.
    async fn delete_unpublished_entry(&self, _collection: &str, _slug: &str) -> Result<()> {
        Err(QuireError::unsupported(self.name(), "delete_unpublished_entry"))
    }
}
