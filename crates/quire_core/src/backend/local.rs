//! Local folder backend (`local`).
//!
//! Reads and writes files below a root directory. There is no history and
//! no review area; a write is immediately visible.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{BackendClient, EntryPage, PersistEntry, PersistOptions};
use crate::cursor::Cursor;
use crate::entry::{AssetProxy, Credentials, FileInfo, FileRef, MediaFile, RawFile, User};
use crate::error::{QuireError, Result};

const NAME: &str = "local";

/// Provider backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// A backend rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a repository path below the root, refusing escapes.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)))
        {
            return Err(QuireError::PermissionDenied(format!(
                "path '{path}' leaves the content root"
            )));
        }
        Ok(self.root.join(relative))
    }

    async fn read_file(&self, path: &str) -> Result<RawFile> {
        let full = self.resolve(path)?;
        let data = match tokio::fs::read_to_string(&full).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(QuireError::NotFound(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let updated_on = tokio::fs::metadata(&full)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(|t| DateTime::<Utc>::from(t).to_rfc3339());
        Ok(RawFile {
            data,
            file: FileInfo {
                path: path.to_string(),
                id: Some(path.to_string()),
                label: None,
                author: None,
                updated_on,
            },
        })
    }

    /// Repository paths of files under `folder` up to `depth` levels.
    async fn walk(&self, folder: &str, depth: usize) -> Result<Vec<String>> {
        let folder = folder.trim_matches('/');
        let mut found = Vec::new();
        let mut pending = vec![(folder.to_string(), 1usize)];
        while let Some((dir, level)) = pending.pop() {
            let mut reader = match tokio::fs::read_dir(self.resolve(&dir)?).await {
                Ok(reader) => reader,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(item) = reader.next_entry().await? {
                let name = item.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') {
                    continue;
                }
                let path = if dir.is_empty() {
                    name
                } else {
                    format!("{dir}/{name}")
                };
                let file_type = item.file_type().await?;
                if file_type.is_dir() {
                    if level < depth {
                        pending.push((path, level + 1));
                    }
                } else {
                    found.push(path);
                }
            }
        }
        found.sort();
        Ok(found)
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, content).await?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.resolve(path)?).await?)
    }
}

#[async_trait]
impl BackendClient for LocalBackend {
    fn name(&self) -> &str {
        NAME
    }

    async fn authenticate(&self, _credentials: &Credentials) -> Result<User> {
        if !tokio::fs::try_exists(&self.root).await? {
            return Err(QuireError::AuthFailed(format!(
                "content root {} does not exist",
                self.root.display()
            )));
        }
        Ok(User {
            name: Some("Local".into()),
            login: Some("local".into()),
            backend_name: Some(NAME.into()),
            ..Default::default()
        })
    }

    async fn get_entry(&self, path: &str) -> Result<RawFile> {
        self.read_file(path).await
    }

    async fn entries_by_folder(&self, folder: &str, extension: &str, depth: usize) -> Result<EntryPage> {
        Ok(EntryPage {
            entries: self.all_entries_by_folder(folder, extension, depth).await?,
            cursor: Cursor::default(),
        })
    }

    async fn entries_by_files(&self, files: &[FileRef]) -> Result<Vec<RawFile>> {
        let mut out = Vec::with_capacity(files.len());
        for file_ref in files {
            match self.read_file(&file_ref.path).await {
                Ok(mut raw) => {
                    raw.file.label = file_ref.label.clone();
                    out.push(raw);
                }
                Err(e) if e.is_not_found() => debug!(path = %file_ref.path, "listed file is missing"),
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    async fn all_entries_by_folder(&self, folder: &str, extension: &str, depth: usize) -> Result<Vec<RawFile>> {
        let suffix = format!(".{extension}");
        let mut out = Vec::new();
        for path in self.walk(folder, depth.max(1)).await? {
            if path.ends_with(&suffix) {
                out.push(self.read_file(&path).await?);
            }
        }
        Ok(out)
    }

    async fn traverse_cursor(&self, _cursor: &Cursor, action: &str) -> Result<EntryPage> {
        Err(QuireError::Cursor(format!(
            "local listings are not paginated (action '{action}')"
        )))
    }

    async fn persist_entry(&self, entry: &PersistEntry, options: &PersistOptions) -> Result<()> {
        if options.use_workflow || options.status_only {
            return Err(QuireError::unsupported(NAME, "editorial workflow"));
        }
        if options.new_entry {
            for file in &entry.data_files {
                if self.exists(&file.path).await? {
                    return Err(QuireError::PersistConflict(format!(
                        "{} already exists",
                        file.path
                    )));
                }
            }
        }
        for asset in &entry.assets {
            if let Some(content) = &asset.content {
                self.write(&asset.path, content).await?;
            }
        }
        for file in &entry.data_files {
            match &file.new_path {
                Some(new_path) if *new_path != file.path => {
                    self.write(new_path, file.raw.as_bytes()).await?;
                    tokio::fs::remove_file(self.resolve(&file.path)?).await?;
                }
                _ => self.write(&file.path, file.raw.as_bytes()).await?,
            }
        }
        info!(
            collection = %options.collection_name,
            files = entry.data_files.len(),
            "{}",
            options.commit_message
        );
        Ok(())
    }

    async fn persist_media(&self, asset: &AssetProxy, options: &PersistOptions) -> Result<MediaFile> {
        let content = asset.content.clone().unwrap_or_default();
        self.write(&asset.path, &content).await?;
        info!("{}", options.commit_message);
        let mut media = MediaFile::at_path(&asset.path);
        media.size = Some(content.len() as u64);
        media.field = asset.field.clone();
        Ok(media)
    }

    async fn delete_files(&self, paths: &[String], commit_message: &str) -> Result<()> {
        for path in paths {
            match tokio::fs::remove_file(self.resolve(path)?).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(%path, "already deleted");
                }
                Err(e) => return Err(e.into()),
            }
        }
        info!(files = paths.len(), "{commit_message}");
        Ok(())
    }

    async fn get_media(&self, folder: &str) -> Result<Vec<MediaFile>> {
        let mut out = Vec::new();
        for path in self.walk(folder, 1).await? {
            let size = tokio::fs::metadata(self.resolve(&path)?).await?.len();
            let mut media = MediaFile::at_path(path);
            media.size = Some(size);
            out.push(media);
        }
        Ok(out)
    }

    async fn get_media_file(&self, path: &str) -> Result<MediaFile> {
        let content = match tokio::fs::read(self.resolve(path)?).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(QuireError::NotFound(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let mut media = MediaFile::at_path(path);
        media.size = Some(content.len() as u64);
        media.content = Some(content);
        Ok(media)
    }
}
