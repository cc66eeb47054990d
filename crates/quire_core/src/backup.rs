//! Local draft backups.
//!
//! Unsaved drafts are written to a [`KeyValueStore`] under
//! `backup.{collection}.{slug}` (slug empty for new entries). The latest
//! backup is also mirrored under the bare `backup` key so a crashed session
//! can be offered for recovery before the editor knows which entry it was.
//!
//! Reads and writes go through one internal lock, so a reader never sees a
//! backup half way through being saved or deleted. Failures surface as
//! [`QuireError::BackupIo`]; callers are expected to log them and carry on.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::entry::MediaFile;
use crate::error::{QuireError, Result};
use crate::storage::KeyValueStore;

const BASE_KEY: &str = "backup";

/// Raw body of one non-default locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleBackup {
    /// Serialized data of the locale
    pub raw: String,
}

/// A stored draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Serialized draft of the default locale
    pub raw: String,
    /// Path of the entry, empty for a new entry
    #[serde(default)]
    pub path: String,
    /// Media attached to the draft, with draft content
    #[serde(default)]
    pub media_files: Vec<MediaFile>,
    /// Serialized drafts of the other locales
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i18n: Option<IndexMap<String, LocaleBackup>>,
}

/// Key of the backup for an entry; the bare key when no collection is given.
pub fn backup_key(collection: Option<&str>, slug: Option<&str>) -> String {
    match (collection, slug) {
        (None, _) => BASE_KEY.to_string(),
        (Some(collection), Some(slug)) if !slug.is_empty() => {
            format!("{BASE_KEY}.{collection}.{slug}")
        }
        (Some(collection), _) => format!("{BASE_KEY}.{collection}"),
    }
}

fn io_error(e: QuireError) -> QuireError {
    match e {
        QuireError::BackupIo(_) => e,
        other => QuireError::BackupIo(other.to_string()),
    }
}

/// Draft backups over a key/value store.
pub struct LocalBackupStore {
    store: Arc<dyn KeyValueStore>,
    lock: Mutex<()>,
}

impl LocalBackupStore {
    /// Backups kept in `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Save a draft for `collection`/`slug` and mirror it as the anonymous
    /// backup. Drafts with a blank body are not saved.
    pub async fn persist(&self, collection: &str, slug: &str, record: &BackupRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        if record.raw.trim().is_empty() {
            return Ok(());
        }
        let value = serde_json::to_value(record).map_err(|e| QuireError::BackupIo(e.to_string()))?;
        self.store
            .set(&backup_key(Some(collection), Some(slug)), value.clone())
            .await
            .map_err(io_error)?;
        self.store
            .set(&backup_key(None, None), value)
            .await
            .map_err(io_error)?;
        tracing::debug!(collection, slug, "saved local backup");
        Ok(())
    }

    /// The stored draft for `collection`/`slug`, if it has a body.
    pub async fn get(&self, collection: &str, slug: &str) -> Result<Option<BackupRecord>> {
        let _guard = self.lock.lock().await;
        self.read(&backup_key(Some(collection), Some(slug))).await
    }

    /// The most recent draft of any entry.
    pub async fn get_anonymous(&self) -> Result<Option<BackupRecord>> {
        let _guard = self.lock.lock().await;
        self.read(&backup_key(None, None)).await
    }

    async fn read(&self, key: &str) -> Result<Option<BackupRecord>> {
        let Some(value) = self.store.get(key).await.map_err(io_error)? else {
            return Ok(None);
        };
        let record: BackupRecord =
            serde_json::from_value(value).map_err(|e| QuireError::BackupIo(e.to_string()))?;
        Ok((!record.raw.trim().is_empty()).then_some(record))
    }

    /// Remove the draft for `collection`/`slug`, the collection-level key
    /// and the anonymous backup.
    pub async fn delete(&self, collection: &str, slug: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        for key in [
            backup_key(Some(collection), Some(slug)),
            backup_key(Some(collection), None),
            backup_key(None, None),
        ] {
            self.store.remove(&key).await.map_err(io_error)?;
        }
        Ok(())
    }

    /// Remove only the anonymous backup.
    pub async fn delete_anonymous(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.store
            .remove(&backup_key(None, None))
            .await
            .map_err(io_error)
    }
}

impl std::fmt::Debug for LocalBackupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackupStore").finish_non_exhaustive()
    }
}
