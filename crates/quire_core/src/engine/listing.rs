//! Listing, pagination and search.

use tracing::{debug, warn};

use super::Engine;
use crate::collection::{Collection, CollectionKind};
use crate::cursor::{self, Cursor, WrappedCursor};
use crate::entry::{Entry, FileRef, MediaFile, RawFile};
use crate::error::{QuireError, Result};
use crate::i18n::{self, I18nStructure};
use crate::media;
use crate::search::{QueryResult, query_entries, search_entries};
use crate::workflow::WorkflowStatus;

/// One page of decoded entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedEntries {
    /// Entries on this page
    pub entries: Vec<Entry>,
    /// Cursor for the following pages, with `append_next` added
    pub cursor: WrappedCursor,
    /// Current page number, when the backend reports one
    pub pagination: Option<u64>,
}

impl Engine {
    /// Decode raw files, drop the ones the collection filter rejects and
    /// fold per-locale files together.
    pub(crate) fn process_entries(&self, collection: &Collection, files: Vec<RawFile>) -> Vec<Entry> {
        let entries: Vec<Entry> = files
            .into_iter()
            .filter_map(|raw| {
                let path = raw.file.path.clone();
                match self.entry_from_raw(collection, raw) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!(collection = %collection.name, path, "skipping unreadable entry: {e}");
                        None
                    }
                }
            })
            .filter(|entry| {
                collection
                    .filter
                    .as_ref()
                    .is_none_or(|rule| rule.matches(&entry.data))
            })
            .collect();
        match collection.i18n_settings() {
            Some(settings) => {
                i18n::group_entries(collection, settings, &collection.entry_extension(), entries)
            }
            None => entries,
        }
    }

    fn file_refs(collection: &Collection) -> Vec<FileRef> {
        let Some(files) = &collection.files else {
            return Vec::new();
        };
        let mut refs = Vec::new();
        for file in files {
            match collection.i18n_settings() {
                Some(settings) if settings.structure != I18nStructure::SingleFile => {
                    for locale in &settings.locales {
                        refs.push(FileRef {
                            path: i18n::locale_file_path(
                                settings.structure,
                                &collection.entry_extension(),
                                &file.file,
                                &file.name,
                                locale,
                            ),
                            label: file.label.clone(),
                        });
                    }
                }
                _ => refs.push(FileRef {
                    path: file.file.clone(),
                    label: file.label.clone(),
                }),
            }
        }
        refs
    }

    /// First page of `collection`.
    pub async fn list_entries(&self, collection: &Collection) -> Result<ListedEntries> {
        let extension = collection.entry_extension();
        let page = match collection.kind() {
            CollectionKind::Folder => {
                let folder = collection.folder.as_deref().unwrap_or_default();
                self.client
                    .entries_by_folder(folder, &extension, collection.depth())
                    .await?
            }
            CollectionKind::Files => crate::backend::EntryPage {
                entries: self.client.entries_by_files(&Self::file_refs(collection)).await?,
                cursor: Cursor::default(),
            },
        };
        let entries = self.process_entries(collection, page.entries);
        debug!(collection = %collection.name, count = entries.len(), "listed entries");
        let pagination = page.cursor.page();
        Ok(ListedEntries {
            entries,
            cursor: page.cursor.wrap(&collection.name).add_append_actions(),
            pagination,
        })
    }

    /// Every entry of `collection`, following cursors when the backend has
    /// no one-shot listing.
    pub async fn list_all_entries(&self, collection: &Collection) -> Result<Vec<Entry>> {
        if collection.kind() == CollectionKind::Folder {
            let folder = collection.folder.as_deref().unwrap_or_default();
            match self
                .client
                .all_entries_by_folder(folder, &collection.entry_extension(), collection.depth())
                .await
            {
                Ok(files) => return Ok(self.process_entries(collection, files)),
                Err(QuireError::Unsupported { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        let first = self.list_entries(collection).await?;
        let mut entries = first.entries;
        let mut cursor = first.cursor;
        while cursor.has_action(cursor::NEXT) {
            let next = self.follow_cursor(collection, cursor, cursor::NEXT).await?;
            entries.extend(next.entries);
            cursor = next.cursor;
        }
        Ok(entries)
    }

    /// Follow `action` on a cursor returned by [`Engine::list_entries`].
    ///
    /// `append_next` loads the next page; whether to append is the caller's
    /// concern.
    pub async fn traverse_cursor(&self, wrapped: WrappedCursor, action: &str) -> Result<ListedEntries> {
        let collection = self.collection(wrapped.collection())?;
        self.follow_cursor(collection, wrapped, action).await
    }

    async fn follow_cursor(
        &self,
        collection: &Collection,
        wrapped: WrappedCursor,
        action: &str,
    ) -> Result<ListedEntries> {
        let (name, cursor) = wrapped.unwrap();
        if name != collection.name {
            return Err(QuireError::Cursor(format!(
                "cursor of '{name}' used for '{}'",
                collection.name
            )));
        }
        let (action, _append) = cursor::resolve_action(action);
        cursor::ensure_action(&cursor, action)?;
        let page = self.client.traverse_cursor(&cursor, action).await?;
        let pagination = page.cursor.page();
        Ok(ListedEntries {
            entries: self.process_entries(collection, page.entries),
            cursor: page.cursor.wrap(name).add_append_actions(),
            pagination,
        })
    }

    /// Search the named collections for `term`, best match first.
    pub async fn search(&self, collection_names: &[&str], term: &str) -> Result<Vec<Entry>> {
        let mut groups = Vec::new();
        for name in collection_names {
            let collection = self.collection(name)?;
            let entries = self.list_all_entries(collection).await?;
            groups.push((collection.search_fields(), entries));
        }
        Ok(search_entries(
            groups.iter().map(|(fields, entries)| (fields.as_slice(), entries.clone())),
            term,
        ))
    }

    /// Search `fields` of one collection.
    pub async fn query(
        &self,
        collection_name: &str,
        fields: &[String],
        term: &str,
        file: Option<&str>,
        limit: Option<usize>,
    ) -> Result<QueryResult> {
        let collection = self.collection(collection_name)?;
        let entries = self.list_all_entries(collection).await?;
        Ok(query_entries(entries, fields, term, file, limit))
    }

    // ==================== Single entries ====================

    async fn fetch_entry(&self, collection: &Collection, path: &str) -> Result<Entry> {
        let raw = self.client.get_entry(path).await?;
        self.entry_from_raw(collection, raw)
    }

    /// Fetch one entry with its locales and media.
    pub async fn get_entry(&self, collection: &Collection, slug: &str) -> Result<Entry> {
        let path = collection
            .entry_path(slug)
            .ok_or_else(|| QuireError::NotFound(format!("{}/{slug}", collection.name)))?;
        let extension = collection.entry_extension();

        let mut entry = match collection.i18n_settings() {
            Some(settings) if settings.structure == I18nStructure::SingleFile => {
                i18n::merge_single_file(settings, self.fetch_entry(collection, &path).await?)
            }
            Some(settings) => {
                let mut locales = Vec::new();
                for locale in &settings.locales {
                    let locale_path =
                        i18n::locale_file_path(settings.structure, &extension, &path, slug, locale);
                    match self.fetch_entry(collection, &locale_path).await {
                        Ok(entry) => locales.push((locale.clone(), entry)),
                        Err(e) if e.is_not_found() => {
                            debug!(path = %locale_path, "locale file missing");
                        }
                        Err(e) => return Err(e),
                    }
                }
                i18n::merge_locale_entries(collection, settings, locales)
                    .ok_or_else(|| QuireError::NotFound(path.clone()))?
            }
            None => self.fetch_entry(collection, &path).await?,
        };
        entry.slug = slug.to_string();
        entry.path = path;

        let has_media_override = collection.media_folder.is_some()
            || collection
                .file_for_slug(slug)
                .is_some_and(|f| f.media_folder.is_some());
        if has_media_override {
            entry.media_files = self.entry_media(collection, &entry).await?;
        }
        Ok(entry)
    }

    async fn entry_media(&self, collection: &Collection, entry: &Entry) -> Result<Vec<MediaFile>> {
        let folder = media::media_folder(&self.config, Some(collection), Some(entry), None);
        match self.client.get_media(&folder).await {
            Ok(files) => Ok(files),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Whether an entry with `slug` already exists, published or waiting
    /// for review.
    pub async fn entry_exists(&self, collection: &Collection, slug: &str) -> Result<bool> {
        if self.config.editorial_workflow() {
            match self.client.unpublished_entry(&collection.name, slug).await {
                Ok(_) => return Ok(true),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        let Some(path) = collection.entry_path(slug) else {
            return Ok(false);
        };
        let path = match collection.i18n_settings() {
            Some(settings) => i18n::locale_file_path(
                settings.structure,
                &collection.entry_extension(),
                &path,
                slug,
                &settings.default_locale,
            ),
            None => path,
        };
        match self.client.get_entry(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Entries waiting for review, with their status.
    pub async fn unpublished_entries(&self) -> Result<Vec<Entry>> {
        let mut out = Vec::new();
        for unpublished in self.client.unpublished_entries().await? {
            let Ok(collection) = self.collection(&unpublished.collection) else {
                warn!(collection = %unpublished.collection, "unpublished entry of unknown collection");
                continue;
            };
            match self.unpublished_to_entry(collection, unpublished.files, unpublished.status) {
                Ok(Some(mut entry)) => {
                    entry.slug = unpublished.slug;
                    entry.updated_on = unpublished.updated_at;
                    entry.new_record = !unpublished.is_modification;
                    out.push(entry);
                }
                Ok(None) => {}
                Err(e) => warn!(collection = %collection.name, "skipping unreadable unpublished entry: {e}"),
            }
        }
        Ok(out)
    }

    /// One entry waiting for review.
    pub async fn unpublished_entry(&self, collection: &Collection, slug: &str) -> Result<Entry> {
        let unpublished = self.client.unpublished_entry(&collection.name, slug).await?;
        let mut entry = self
            .unpublished_to_entry(collection, unpublished.files, unpublished.status)?
            .ok_or_else(|| QuireError::NotFound(format!("{}.{slug}", collection.name)))?;
        entry.slug = slug.to_string();
        entry.updated_on = unpublished.updated_at;
        entry.new_record = !unpublished.is_modification;
        Ok(entry)
    }

    fn unpublished_to_entry(
        &self,
        collection: &Collection,
        files: Vec<RawFile>,
        status: WorkflowStatus,
    ) -> Result<Option<Entry>> {
        let mut decoded = Vec::with_capacity(files.len());
        for raw in files {
            decoded.push(self.entry_from_raw(collection, raw)?);
        }
        let mut entry = match collection.i18n_settings() {
            Some(settings) => {
                i18n::group_entries(collection, settings, &collection.entry_extension(), decoded)
                    .into_iter()
                    .next()
            }
            None => decoded.into_iter().next(),
        };
        if let Some(entry) = &mut entry {
            entry.status = Some(status);
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::backend::MemoryBackend;
    use crate::collection::{CollectionFile, Field, FilterRule};
    use crate::i18n::I18nSettings;
    use crate::test_utils::{engine_with, posts_collection, posts_config};

    use super::*;

    fn seeded(count: usize, page_size: usize) -> MemoryBackend {
        (0..count).fold(MemoryBackend::paginated(page_size), |backend, i| {
            backend.with_file(
                format!("content/posts/p{i:02}.md"),
                format!("---\ntitle: Post {i}\n---\n"),
            )
        })
    }

    // ── listing ──

    #[tokio::test]
    async fn list_entries_decodes_and_wraps_cursor() {
        let engine = engine_with(posts_config(), Arc::new(seeded(5, 2))).await;
        let posts = posts_collection();
        let listed = engine.list_entries(&posts).await.unwrap();
        assert_eq!(listed.entries.len(), 2);
        assert_eq!(listed.entries[0].data["title"], "Post 0");
        assert_eq!(listed.pagination, Some(1));
        assert_eq!(listed.cursor.collection(), "posts");
        assert!(listed.cursor.has_action(cursor::APPEND_NEXT));

        let next = engine
            .traverse_cursor(listed.cursor, cursor::APPEND_NEXT)
            .await
            .unwrap();
        assert_eq!(next.pagination, Some(2));
        assert_eq!(next.entries[0].slug, "p02");
    }

    #[tokio::test]
    async fn list_all_follows_next_until_exhausted() {
        let engine = engine_with(posts_config(), Arc::new(seeded(7, 3))).await;
        let all = engine.list_all_entries(&posts_collection()).await.unwrap();
        let slugs: Vec<_> = all.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, vec!["p00", "p01", "p02", "p03", "p04", "p05", "p06"]);
    }

    #[tokio::test]
    async fn traversal_rejects_unsupported_action() {
        let engine = engine_with(posts_config(), Arc::new(seeded(1, 5))).await;
        let listed = engine.list_entries(&posts_collection()).await.unwrap();
        assert!(matches!(
            engine.traverse_cursor(listed.cursor, cursor::NEXT).await,
            Err(QuireError::Cursor(_))
        ));
    }

    #[tokio::test]
    async fn unreadable_and_filtered_entries_are_skipped() {
        let backend = MemoryBackend::new()
            .with_file("content/posts/a.md", "---\ntitle: A\nlang: en\n---\n")
            .with_file("content/posts/b.md", "---\ntitle: B\nlang: de\n---\n")
            .with_file("content/posts/bad.md", "---\ntitle: [\n---\n");
        let engine = engine_with(posts_config(), Arc::new(backend)).await;
        let mut posts = posts_collection();
        posts.filter = Some(FilterRule {
            field: "lang".into(),
            value: json!("en"),
        });
        let listed = engine.list_entries(&posts).await.unwrap();
        assert_eq!(listed.entries.len(), 1);
        assert_eq!(listed.entries[0].slug, "a");
    }

    #[tokio::test]
    async fn files_collection_lists_configured_files() {
        let backend = MemoryBackend::new().with_file("data/settings.json", r#"{"site": "Quire"}"#);
        let mut config = posts_config();
        let settings = Collection::files(
            "settings",
            vec![CollectionFile {
                name: "general".into(),
                label: Some("General".into()),
                file: "data/settings.json".into(),
                fields: vec![Field::new("site")],
                media_folder: None,
                public_folder: None,
            }],
        );
        config.collections.push(settings.clone());
        let engine = engine_with(config, Arc::new(backend)).await;
        let listed = engine.list_entries(&settings).await.unwrap();
        assert_eq!(listed.entries.len(), 1);
        assert_eq!(listed.entries[0].slug, "general");
        assert_eq!(listed.entries[0].label.as_deref(), Some("General"));
        assert_eq!(listed.entries[0].data, json!({"site": "Quire"}));
    }

    // ── single entries ──

    #[tokio::test]
    async fn get_entry_merges_locale_files() {
        let backend = MemoryBackend::new()
            .with_file("content/posts/en/hello.md", "---\ntitle: Hello\n---\n")
            .with_file("content/posts/de/hello.md", "---\ntitle: Hallo\n---\n");
        let posts = posts_collection()
            .with_i18n(I18nSettings::new(I18nStructure::MultipleFolders, &["en", "de", "fr"]));
        let mut config = posts_config();
        config.collections = vec![posts.clone()];
        let engine = engine_with(config, Arc::new(backend)).await;

        let entry = engine.get_entry(&posts, "hello").await.unwrap();
        assert_eq!(entry.path, "content/posts/hello.md");
        assert_eq!(entry.data, json!({"title": "Hello"}));
        assert_eq!(entry.locale_variants.get("de"), Some(&json!({"title": "Hallo"})));
        assert!(!entry.locale_variants.contains_key("fr"));
        assert!(engine.entry_exists(&posts, "hello").await.unwrap());
        assert!(!engine.entry_exists(&posts, "other").await.unwrap());
    }

    #[tokio::test]
    async fn missing_entry_is_not_found() {
        let engine = engine_with(posts_config(), Arc::new(MemoryBackend::new())).await;
        let err = engine.get_entry(&posts_collection(), "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    // ── search ──

    #[tokio::test]
    async fn search_and_query_across_pages() {
        let backend = MemoryBackend::paginated(1)
            .with_file("content/posts/a.md", "---\ntitle: Rust ownership\n---\n")
            .with_file("content/posts/b.md", "---\ntitle: Gardening\n---\n");
        let engine = engine_with(posts_config(), Arc::new(backend)).await;
        let hits = engine.search(&["posts"], "rust owner").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].slug, "a");

        let result = engine
            .query("posts", &["title".into()], "garden", None, None)
            .await
            .unwrap();
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].slug, "b");
        assert!(matches!(
            engine.search(&["nope"], "x").await,
            Err(QuireError::UnknownCollection(_))
        ));
    }
}
