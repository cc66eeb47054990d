//! In-memory backend (`test-repo`).
//!
//! Keeps files, media and the review area in memory. With a page size set,
//! folder listings are paginated through cursors and the one-shot listing is
//! unavailable, which exercises the engine's cursor-following path.

use std::collections::BTreeMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::json;
use tokio::sync::RwLock;

use super::{BackendClient, EntryPage, PersistEntry, PersistOptions, UnpublishedEntry};
use crate::cursor::{self, Cursor};
use crate::entry::{AssetProxy, Credentials, FileInfo, FileRef, MediaFile, RawFile, User, workflow_key};
use crate::error::{QuireError, Result};
use crate::workflow::WorkflowStatus;

const NAME: &str = "test-repo";

#[derive(Debug, Clone)]
struct StoredFile {
    content: String,
    author: Option<String>,
    updated_on: String,
}

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<String, StoredFile>,
    media: BTreeMap<String, MediaFile>,
    unpublished: IndexMap<String, UnpublishedEntry>,
    commits: Vec<String>,
    // Writes fail with this message while set
    write_error: Option<String>,
}

impl State {
    fn listing(&self, folder: &str, extension: &str, depth: usize) -> Vec<RawFile> {
        let prefix = format!("{}/", folder.trim_end_matches('/'));
        let suffix = format!(".{extension}");
        self.files
            .iter()
            .filter(|(path, _)| {
                path.strip_prefix(&prefix).is_some_and(|relative| {
                    relative.ends_with(&suffix) && relative.split('/').count() <= depth.max(1)
                })
            })
            .map(|(path, file)| raw_file(path, file))
            .collect()
    }
}

fn raw_file(path: &str, file: &StoredFile) -> RawFile {
    RawFile {
        data: file.content.clone(),
        file: FileInfo {
            path: path.to_string(),
            id: Some(path.to_string()),
            label: None,
            author: file.author.clone(),
            updated_on: Some(file.updated_on.clone()),
        },
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Memory-backed provider for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<State>,
    page_size: Option<usize>,
    token: Option<String>,
}

impl MemoryBackend {
    /// An empty, unpaginated backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty backend listing `page_size` files per page.
    pub fn paginated(page_size: usize) -> Self {
        Self {
            page_size: Some(page_size.max(1)),
            ..Self::default()
        }
    }

    /// Only accept this token when authenticating (builder style).
    pub fn require_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Seed a file (builder style).
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.state.get_mut().files.insert(
            path.into(),
            StoredFile {
                content: content.into(),
                author: None,
                updated_on: now(),
            },
        );
        self
    }

    /// Content of a stored file.
    pub async fn file(&self, path: &str) -> Option<String> {
        self.state
            .read()
            .await
            .files
            .get(path)
            .map(|f| f.content.clone())
    }

    /// Paths of every stored file, sorted.
    pub async fn paths(&self) -> Vec<String> {
        self.state.read().await.files.keys().cloned().collect()
    }

    /// Commit messages in order.
    pub async fn commits(&self) -> Vec<String> {
        self.state.read().await.commits.clone()
    }

    /// Make every following entry write fail with `message` (`None` heals).
    pub async fn fail_writes(&self, message: Option<&str>) {
        self.state.write().await.write_error = message.map(String::from);
    }

    fn page(&self, all: Vec<RawFile>, folder: &str, extension: &str, depth: usize, page: usize) -> EntryPage {
        let Some(size) = self.page_size else {
            return EntryPage {
                entries: all,
                cursor: Cursor::default(),
            };
        };
        let count = all.len();
        let page_count = count.div_ceil(size).max(1);
        let page = page.clamp(1, page_count);
        let entries = all.into_iter().skip((page - 1) * size).take(size).collect();

        let mut actions = Vec::new();
        if page < page_count {
            actions.extend([cursor::NEXT, cursor::LAST]);
        }
        if page > 1 {
            actions.extend([cursor::PREV, cursor::FIRST]);
        }
        let cursor = Cursor::new(
            actions,
            json!({"folder": folder, "extension": extension, "depth": depth, "page": page}),
        )
        .with_meta("page", json!(page))
        .with_meta("count", json!(count))
        .with_meta("page_size", json!(size))
        .with_meta("page_count", json!(page_count));
        EntryPage { entries, cursor }
    }
}

#[async_trait]
impl BackendClient for MemoryBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn is_git_backend(&self) -> bool {
        true
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<User> {
        if let Some(expected) = &self.token
            && credentials.token.as_ref() != Some(expected)
        {
            return Err(QuireError::AuthFailed("invalid token".into()));
        }
        Ok(User {
            name: Some("Test User".into()),
            login: Some("test".into()),
            token: credentials.token.clone(),
            avatar_url: None,
            backend_name: Some(NAME.into()),
        })
    }

    async fn get_entry(&self, path: &str) -> Result<RawFile> {
        let state = self.state.read().await;
        state
            .files
            .get(path)
            .map(|file| raw_file(path, file))
            .ok_or_else(|| QuireError::NotFound(path.to_string()))
    }

    async fn entries_by_folder(&self, folder: &str, extension: &str, depth: usize) -> Result<EntryPage> {
        let all = self.state.read().await.listing(folder, extension, depth);
        Ok(self.page(all, folder, extension, depth, 1))
    }

    async fn entries_by_files(&self, files: &[FileRef]) -> Result<Vec<RawFile>> {
        let state = self.state.read().await;
        Ok(files
            .iter()
            .filter_map(|file_ref| {
                let stored = state.files.get(&file_ref.path)?;
                let mut raw = raw_file(&file_ref.path, stored);
                raw.file.label = file_ref.label.clone();
                Some(raw)
            })
            .collect())
    }

    async fn all_entries_by_folder(&self, folder: &str, extension: &str, depth: usize) -> Result<Vec<RawFile>> {
        if self.page_size.is_some() {
            return Err(QuireError::unsupported(NAME, "all_entries_by_folder"));
        }
        Ok(self.state.read().await.listing(folder, extension, depth))
    }

    async fn traverse_cursor(&self, cursor: &Cursor, action: &str) -> Result<EntryPage> {
        cursor::ensure_action(cursor, action)?;
        let data = cursor.data();
        let folder = data["folder"].as_str().unwrap_or_default();
        let extension = data["extension"].as_str().unwrap_or_default();
        let depth = data["depth"].as_u64().unwrap_or(1) as usize;
        let page = data["page"].as_u64().unwrap_or(1) as usize;
        let page_count = cursor
            .meta()
            .get("page_count")
            .and_then(|v| v.as_u64())
            .unwrap_or(1) as usize;
        let target = match action {
            cursor::NEXT => page + 1,
            cursor::PREV => page.saturating_sub(1),
            cursor::FIRST => 1,
            cursor::LAST => page_count,
            other => return Err(QuireError::Cursor(format!("unknown action '{other}'"))),
        };
        let all = self.state.read().await.listing(folder, extension, depth);
        Ok(self.page(all, folder, extension, depth, target))
    }

    async fn persist_entry(&self, entry: &PersistEntry, options: &PersistOptions) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(message) = &state.write_error {
            return Err(QuireError::Backend(message.clone()));
        }
        let slug = entry
            .data_files
            .first()
            .map(|f| f.slug.clone())
            .unwrap_or_default();
        let key = workflow_key(&options.collection_name, &slug);

        if options.status_only {
            let unpublished = state
                .unpublished
                .get_mut(&key)
                .ok_or_else(|| QuireError::NotFound(key.clone()))?;
            unpublished.status = options.status.unwrap_or_default();
            unpublished.updated_at = Some(now());
            return Ok(());
        }

        for asset in &entry.assets {
            let mut media = MediaFile::at_path(&asset.path);
            media.size = asset.content.as_ref().map(|c| c.len() as u64);
            media.content = asset.content.clone();
            state.media.insert(asset.path.clone(), media);
        }

        if options.use_workflow {
            let is_modification = entry
                .data_files
                .iter()
                .any(|f| state.files.contains_key(&f.path));
            let status = options
                .status
                .or_else(|| state.unpublished.get(&key).map(|u| u.status))
                .unwrap_or_default();
            let files = entry
                .data_files
                .iter()
                .map(|f| RawFile::new(f.new_path.as_deref().unwrap_or(&f.path), f.raw.clone()))
                .collect();
            state.unpublished.insert(
                key,
                UnpublishedEntry {
                    collection: options.collection_name.clone(),
                    slug,
                    status,
                    files,
                    is_modification,
                    updated_at: Some(now()),
                },
            );
            state.commits.push(options.commit_message.clone());
            return Ok(());
        }

        if options.new_entry
            && let Some(taken) = entry.data_files.iter().find(|f| state.files.contains_key(&f.path))
        {
            return Err(QuireError::PersistConflict(format!(
                "{} already exists",
                taken.path
            )));
        }
        for file in &entry.data_files {
            let target = match &file.new_path {
                Some(new_path) if *new_path != file.path => {
                    state.files.remove(&file.path);
                    new_path.clone()
                }
                _ => file.path.clone(),
            };
            state.files.insert(
                target,
                StoredFile {
                    content: file.raw.clone(),
                    author: Some("test".into()),
                    updated_on: now(),
                },
            );
        }
        state.commits.push(options.commit_message.clone());
        Ok(())
    }

    async fn persist_media(&self, asset: &AssetProxy, options: &PersistOptions) -> Result<MediaFile> {
        let mut state = self.state.write().await;
        let mut media = MediaFile::at_path(&asset.path);
        media.size = asset.content.as_ref().map(|c| c.len() as u64);
        media.content = asset.content.clone();
        media.field = asset.field.clone();
        state.media.insert(asset.path.clone(), media.clone());
        state.commits.push(options.commit_message.clone());
        Ok(media)
    }

    async fn delete_files(&self, paths: &[String], commit_message: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(message) = &state.write_error {
            return Err(QuireError::Backend(message.clone()));
        }
        for path in paths {
            if state.files.remove(path).is_none() {
                state.media.remove(path);
            }
        }
        state.commits.push(commit_message.to_string());
        Ok(())
    }

    async fn get_media(&self, folder: &str) -> Result<Vec<MediaFile>> {
        let prefix = format!("{}/", folder.trim_end_matches('/'));
        let state = self.state.read().await;
        Ok(state
            .media
            .iter()
            .filter(|(path, _)| {
                path.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.contains('/'))
            })
            .map(|(_, media)| MediaFile {
                content: None,
                ..media.clone()
            })
            .collect())
    }

    async fn get_media_file(&self, path: &str) -> Result<MediaFile> {
        self.state
            .read()
            .await
            .media
            .get(path)
            .cloned()
            .ok_or_else(|| QuireError::NotFound(path.to_string()))
    }

    async fn unpublished_entries(&self) -> Result<Vec<UnpublishedEntry>> {
        Ok(self.state.read().await.unpublished.values().cloned().collect())
    }

    async fn unpublished_entry(&self, collection: &str, slug: &str) -> Result<UnpublishedEntry> {
        let key = workflow_key(collection, slug);
        self.state
            .read()
            .await
            .unpublished
            .get(&key)
            .cloned()
            .ok_or(QuireError::NotFound(key))
    }

    async fn update_unpublished_entry_status(
        &self,
        collection: &str,
        slug: &str,
        status: WorkflowStatus,
    ) -> Result<()> {
        let key = workflow_key(collection, slug);
        let mut state = self.state.write().await;
        let entry = state
            .unpublished
            .get_mut(&key)
            .ok_or_else(|| QuireError::NotFound(key.clone()))?;
        entry.status = status;
        entry.updated_at = Some(now());
        Ok(())
    }

    async fn publish_unpublished_entry(&self, collection: &str, slug: &str) -> Result<()> {
        let key = workflow_key(collection, slug);
        let mut state = self.state.write().await;
        let entry = state
            .unpublished
            .shift_remove(&key)
            .ok_or_else(|| QuireError::NotFound(key.clone()))?;
        for file in entry.files {
            state.files.insert(
                file.file.path,
                StoredFile {
                    content: file.data,
                    author: Some("test".into()),
                    updated_on: now(),
                },
            );
        }
        state.commits.push(format!("Publish {key}"));
        Ok(())
    }

    async fn delete_unpublished_entry(&self, collection: &str, slug: &str) -> Result<()> {
        let key = workflow_key(collection, slug);
        self.state
            .write()
            .await
            .unpublished
            .shift_remove(&key)
            .map(|_| ())
            .ok_or(QuireError::NotFound(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::DataFile;

    fn data_file(path: &str, raw: &str) -> DataFile {
        DataFile {
            path: path.into(),
            slug: "a".into(),
            raw: raw.into(),
            new_path: None,
        }
    }

    fn seeded(count: usize, page_size: usize) -> MemoryBackend {
        (0..count).fold(MemoryBackend::paginated(page_size), |backend, i| {
            backend.with_file(format!("posts/p{i:02}.md"), format!("#{i}"))
        })
    }

    #[tokio::test]
    async fn pages_through_a_folder() {
        let backend = seeded(5, 2);
        let first = backend.entries_by_folder("posts", "md", 1).await.unwrap();
        assert_eq!(first.entries.len(), 2);
        assert!(first.cursor.has_action(cursor::NEXT));
        assert!(!first.cursor.has_action(cursor::PREV));

        let last = backend.traverse_cursor(&first.cursor, cursor::LAST).await.unwrap();
        assert_eq!(last.entries.len(), 1);
        assert!(last.cursor.is_exhausted() || !last.cursor.has_action(cursor::NEXT));
        assert!(backend.traverse_cursor(&last.cursor, cursor::NEXT).await.is_err());
    }

    #[tokio::test]
    async fn depth_limits_listing() {
        let backend = MemoryBackend::new()
            .with_file("posts/a.md", "")
            .with_file("posts/2024/b.md", "")
            .with_file("posts/c.yml", "");
        let flat = backend.entries_by_folder("posts", "md", 1).await.unwrap();
        assert_eq!(flat.entries.len(), 1);
        let deep = backend.entries_by_folder("posts", "md", 2).await.unwrap();
        assert_eq!(deep.entries.len(), 2);
    }

    #[tokio::test]
    async fn new_entry_refuses_taken_path() {
        let backend = MemoryBackend::new().with_file("posts/a.md", "old");
        let options = PersistOptions {
            new_entry: true,
            ..Default::default()
        };
        let entry = PersistEntry {
            data_files: vec![data_file("posts/a.md", "new")],
            assets: vec![],
        };
        assert!(matches!(
            backend.persist_entry(&entry, &options).await,
            Err(QuireError::PersistConflict(_))
        ));
        assert_eq!(backend.file("posts/a.md").await.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn workflow_writes_stay_unpublished_until_publish() {
        let backend = MemoryBackend::new();
        let options = PersistOptions {
            new_entry: true,
            collection_name: "posts".into(),
            use_workflow: true,
            ..Default::default()
        };
        let entry = PersistEntry {
            data_files: vec![data_file("posts/a.md", "draft")],
            assets: vec![],
        };
        backend.persist_entry(&entry, &options).await.unwrap();
        assert!(backend.file("posts/a.md").await.is_none());
        assert_eq!(
            backend.unpublished_entry("posts", "a").await.unwrap().status,
            WorkflowStatus::Draft
        );

        backend.publish_unpublished_entry("posts", "a").await.unwrap();
        assert_eq!(backend.file("posts/a.md").await.as_deref(), Some("draft"));
        assert!(backend.unpublished_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn token_is_checked_when_required() {
        let backend = MemoryBackend::new().require_token("secret");
        assert!(backend.authenticate(&Credentials::default()).await.is_err());
        let user = backend
            .authenticate(&Credentials {
                token: Some("secret".into()),
                refresh_token: None,
            })
            .await
            .unwrap();
        assert_eq!(user.login.as_deref(), Some("test"));
    }
}
