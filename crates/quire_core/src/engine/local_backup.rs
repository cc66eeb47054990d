//! Draft backups, serialized the same way a persist would write them.

use super::Engine;
use crate::backup::{BackupRecord, LocaleBackup};
use crate::collection::Collection;
use crate::entry::Entry;
use crate::error::Result;
use crate::format::resolve_format;
use crate::i18n;

impl Engine {
    /// Back up an unsaved draft of `collection`.
    pub async fn persist_local_backup(&self, collection: &Collection, entry: &Entry) -> Result<()> {
        let raw = self.entry_to_raw(collection, entry)?;
        let i18n = match collection.i18n_settings() {
            Some(settings) => {
                let variants = i18n::backup_variants(settings, entry, |data| {
                    self.data_to_raw(collection, &entry.slug, &entry.path, data)
                })?;
                Some(
                    variants
                        .into_iter()
                        .map(|(locale, raw)| (locale, LocaleBackup { raw }))
                        .collect(),
                )
            }
            None => None,
        };
        let record = BackupRecord {
            raw,
            path: entry.path.clone(),
            media_files: entry.media_files.clone(),
            i18n,
        };
        self.backups.persist(&collection.name, &entry.slug, &record).await
    }

    /// The backed-up draft of `slug` (empty for a new entry), decoded.
    pub async fn get_local_backup(&self, collection: &Collection, slug: &str) -> Result<Option<Entry>> {
        let Some(record) = self.backups.get(&collection.name, slug).await? else {
            return Ok(None);
        };
        let format = resolve_format(collection, Some(record.path.as_str()).filter(|p| !p.is_empty()));
        let mut entry = Entry::new(&collection.name, slug, record.path)
            .with_data(format.from_file(&record.raw)?)
            .with_raw(record.raw);
        entry.new_record = slug.is_empty();
        entry.label = collection.file_label(slug).map(String::from);
        entry.media_files = record.media_files;
        if collection.has_meta_path() && !entry.path.is_empty() {
            entry.meta.path = Some(collection.meta_path_for(&entry.path));
        }
        for (locale, backup) in record.i18n.unwrap_or_default() {
            entry
                .locale_variants
                .insert(locale, format.from_file(&backup.raw)?);
        }
        Ok(Some(entry))
    }

    /// Drop the backup of `slug` together with the anonymous one.
    pub async fn delete_local_backup(&self, collection: &Collection, slug: &str) -> Result<()> {
        self.backups.delete(&collection.name, slug).await
    }
}
