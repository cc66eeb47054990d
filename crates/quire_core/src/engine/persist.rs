//! Slugs, serialization, persist and delete.

use chrono::Utc;
use tracing::{debug, info, warn};

use super::Engine;
use crate::backend::{PersistEntry, PersistOptions};
use crate::collection::Collection;
use crate::commit::CommitAction;
use crate::entry::{AssetProxy, DataFile, Entry, MediaFile};
use crate::error::{QuireError, Result};
use crate::hooks::HookEvent;
use crate::i18n;
use crate::media;
use crate::slug::{sanitize_char, slug_formatter, slug_from_custom_path};
use crate::value::EntryData;
use crate::workflow::WorkflowStatus;

/// Input to [`Engine::persist_entry`].
#[derive(Debug, Clone)]
pub struct PersistArgs<'a> {
    /// Collection of the entry
    pub collection: &'a Collection,
    /// The draft entry to save
    pub entry: &'a Entry,
    /// Slugs already known to be taken (from the loaded listing)
    pub used_slugs: &'a [String],
    /// Review status for an editorial workflow save
    pub status: Option<WorkflowStatus>,
}

impl<'a> PersistArgs<'a> {
    /// Save `entry` of `collection` with no known slugs.
    pub fn new(collection: &'a Collection, entry: &'a Entry) -> Self {
        Self {
            collection,
            entry,
            used_slugs: &[],
            status: None,
        }
    }

    /// Slugs to avoid (builder style).
    pub fn used_slugs(mut self, used_slugs: &'a [String]) -> Self {
        self.used_slugs = used_slugs;
        self
    }

    /// Review status (builder style).
    pub fn status(mut self, status: WorkflowStatus) -> Self {
        self.status = Some(status);
        self
    }
}

impl Engine {
    /// A slug for new `data` that no other entry uses.
    ///
    /// A custom path wins over the slug template. While the candidate is in
    /// `used_slugs` or exists in the backend, `-1`, `-2`, ... is appended.
    /// The backend is only asked when `used_slugs` does not already rule the
    /// candidate out.
    pub async fn generate_unique_slug(
        &self,
        collection: &Collection,
        data: &EntryData,
        used_slugs: &[String],
        custom_path: Option<&str>,
    ) -> Result<String> {
        let slug = match custom_path {
            Some(path) => slug_from_custom_path(collection, path),
            None => slug_formatter(collection, data, &self.config.slug, Utc::now())?,
        };
        let separator = sanitize_char(' ', &self.config.slug);
        let mut unique = slug.clone();
        let mut i = 1;
        while used_slugs.contains(&unique) || self.entry_exists(collection, &unique).await? {
            unique = format!("{slug}{separator}{i}");
            i += 1;
        }
        if unique != slug {
            debug!(collection = %collection.name, slug, unique, "slug taken, disambiguated");
        }
        Ok(unique)
    }

    /// The files an entry occupies once written at `path`.
    fn data_files(
        &self,
        collection: &Collection,
        entry: &Entry,
        path: &str,
        slug: &str,
        new_path: Option<&str>,
    ) -> Result<Vec<DataFile>> {
        let Some(settings) = collection.i18n_settings() else {
            return Ok(vec![DataFile {
                path: path.to_string(),
                slug: slug.to_string(),
                raw: self.data_to_raw(collection, slug, path, &entry.data)?,
                new_path: new_path.map(String::from),
            }]);
        };
        i18n::split_locales(settings, &collection.entry_extension(), entry, path, slug, new_path)
            .into_iter()
            .map(|file| {
                Ok(DataFile {
                    raw: self.data_to_raw(collection, slug, &file.path, &file.data)?,
                    path: file.path,
                    slug: slug.to_string(),
                    new_path: file.new_path,
                })
            })
            .collect()
    }

    /// Save a draft and return its final slug.
    ///
    /// New entries get a unique slug and their path from the collection;
    /// existing ones keep their slug unless a custom path moves them.
    pub async fn persist_entry(&self, args: PersistArgs<'_>) -> Result<String> {
        let PersistArgs {
            collection,
            entry,
            used_slugs,
            status,
        } = args;
        let use_workflow = self.config.editorial_workflow();
        let new_entry = entry.new_record;

        let mut data = self.run_hooks(HookEvent::PreSave, entry.data.clone()).await?;
        if !use_workflow {
            data = self.run_hooks(HookEvent::PrePublish, data).await?;
        }

        let custom_path = if collection.has_meta_path() {
            collection.custom_path(entry.meta.path.as_deref())
        } else {
            None
        };

        let (slug, path, new_path) = if new_entry {
            if !collection.allow_new_entries() {
                return Err(QuireError::PersistDenied(collection.name.clone()));
            }
            let slug = self
                .generate_unique_slug(collection, &data, used_slugs, custom_path.as_deref())
                .await?;
            let path = match custom_path {
                Some(path) => path,
                None => collection
                    .entry_path(&slug)
                    .ok_or_else(|| QuireError::Config(format!("no path for '{slug}'")))?,
            };
            (slug, path, None)
        } else {
            let slug = match &custom_path {
                Some(path) => slug_from_custom_path(collection, path),
                None => entry.slug.clone(),
            };
            let new_path = custom_path.filter(|p| *p != entry.path);
            (slug, entry.path.clone(), new_path)
        };

        let mut to_write = entry.clone();
        to_write.data = data;
        to_write.slug = slug.clone();
        to_write.path = new_path.clone().unwrap_or_else(|| path.clone());

        let mut assets: Vec<AssetProxy> = entry.draft_media_files().map(AssetProxy::from_media_file).collect();
        if new_entry {
            media::rewrite_asset_paths(&self.config, collection, &to_write, &mut assets);
        }

        let data_files = self.data_files(collection, &to_write, &path, &slug, new_path.as_deref())?;
        let user = self.signed_in_user().await;
        let action = if new_entry {
            CommitAction::Create
        } else {
            CommitAction::Update
        };
        let commit_message = self.config.backend.commit_messages.render(
            action,
            Some(collection),
            &slug,
            &path,
            user.as_ref(),
        );
        let options = PersistOptions {
            new_entry,
            commit_message,
            collection_name: collection.name.clone(),
            use_workflow,
            status: if use_workflow { status } else { None },
            status_only: false,
        };

        self.client
            .persist_entry(&PersistEntry { data_files, assets }, &options)
            .await?;
        info!(collection = %collection.name, slug, new_entry, use_workflow, "entry persisted");

        let data = self.run_hooks(HookEvent::PostSave, to_write.data).await?;
        if !use_workflow
            && let Err(e) = self.run_hooks(HookEvent::PostPublish, data).await
        {
            warn!(collection = %collection.name, %slug, error = %e, "post-publish hook failed");
        }
        Ok(slug)
    }

    /// Delete a published entry and every locale file it occupies.
    pub async fn delete_entry(&self, collection: &Collection, slug: &str) -> Result<()> {
        if !collection.allow_deletion() {
            return Err(QuireError::DeletionDenied(collection.name.clone()));
        }
        let path = collection
            .entry_path(slug)
            .ok_or_else(|| QuireError::NotFound(format!("{}/{slug}", collection.name)))?;
        let user = self.signed_in_user().await;
        let message = self.config.backend.commit_messages.render(
            CommitAction::Delete,
            Some(collection),
            slug,
            &path,
            user.as_ref(),
        );
        let paths = match collection.i18n_settings() {
            Some(settings) => i18n::file_paths(settings, &collection.entry_extension(), &path, slug),
            None => vec![path],
        };
        self.client.delete_files(&paths, &message).await?;
        info!(collection = %collection.name, slug, "entry deleted");
        Ok(())
    }

    // ==================== Media ====================

    /// Upload a media file.
    pub async fn persist_media(&self, asset: &AssetProxy) -> Result<MediaFile> {
        let user = self.signed_in_user().await;
        let commit_message = self.config.backend.commit_messages.render(
            CommitAction::UploadMedia,
            None,
            "",
            &asset.path,
            user.as_ref(),
        );
        let options = PersistOptions {
            commit_message,
            ..Default::default()
        };
        let file = self.client.persist_media(asset, &options).await?;
        info!(path = %file.path, "media uploaded");
        Ok(file)
    }

    /// Delete a committed media file.
    pub async fn delete_media(&self, path: &str) -> Result<()> {
        let user = self.signed_in_user().await;
        let message = self.config.backend.commit_messages.render(
            CommitAction::DeleteMedia,
            None,
            "",
            path,
            user.as_ref(),
        );
        self.client.delete_files(&[path.to_string()], &message).await
    }

    /// Media under `folder`, the global media folder when `None`.
    pub async fn get_media(&self, folder: Option<&str>) -> Result<Vec<MediaFile>> {
        let folder = folder.map_or_else(|| media::join_path(&[&self.config.media_folder]), String::from);
        self.client.get_media(&folder).await
    }

    /// One media file with its content.
    pub async fn get_media_file(&self, path: &str) -> Result<MediaFile> {
        self.client.get_media_file(path).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::backend::{BackendClient, MemoryBackend};
    use crate::collection::{MetaConfig, MetaPath};
    use crate::i18n::{I18nSettings, I18nStructure};
    use crate::test_utils::{engine_with, posts_collection, posts_config, workflow_config};

    use super::*;

    fn draft(data: EntryData) -> Entry {
        let mut entry = Entry::new("posts", "", "").with_data(data);
        entry.new_record = true;
        entry
    }

    // ── slugs ──

    #[tokio::test]
    async fn unique_slug_checks_memory_then_backend() {
        let backend = MemoryBackend::new()
            .with_file("content/posts/hello.md", "---\ntitle: Hello\n---\n")
            .with_file("content/posts/hello-1.md", "---\ntitle: Hello\n---\n");
        let engine = engine_with(posts_config(), Arc::new(backend)).await;
        let posts = posts_collection();
        let data = json!({"title": "Hello"});
        assert_eq!(
            engine.generate_unique_slug(&posts, &data, &[], None).await.unwrap(),
            "hello-2"
        );
        let used = vec!["hello-2".to_string()];
        assert_eq!(
            engine.generate_unique_slug(&posts, &data, &used, None).await.unwrap(),
            "hello-3"
        );
    }

    #[tokio::test]
    async fn missing_identifier_is_an_error() {
        let engine = engine_with(posts_config(), Arc::new(MemoryBackend::new())).await;
        let err = engine
            .generate_unique_slug(&posts_collection(), &json!({"title": ""}), &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, QuireError::MissingIdentifier(_)));
    }

    // ── persist ──

    #[tokio::test]
    async fn new_entry_is_written_at_its_slug_path() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine_with(posts_config(), backend.clone()).await;
        let posts = posts_collection();
        let entry = draft(json!({"title": "Hello"}));
        let slug = engine.persist_entry(PersistArgs::new(&posts, &entry)).await.unwrap();
        assert_eq!(slug, "hello");
        assert_eq!(
            backend.file("content/posts/hello.md").await.as_deref(),
            Some("---\ntitle: Hello\n---\n")
        );
        assert_eq!(backend.commits().await, vec!["Create Post “hello”"]);
    }

    #[tokio::test]
    async fn creation_and_deletion_follow_collection_policy() {
        let engine = engine_with(posts_config(), Arc::new(MemoryBackend::new())).await;
        let mut posts = posts_collection();
        posts.create = false;
        posts.delete = Some(false);
        let entry = draft(json!({"title": "Hello"}));
        assert!(matches!(
            engine.persist_entry(PersistArgs::new(&posts, &entry)).await,
            Err(QuireError::PersistDenied(_))
        ));
        assert!(matches!(
            engine.delete_entry(&posts, "hello").await,
            Err(QuireError::DeletionDenied(_))
        ));
    }

    #[tokio::test]
    async fn hooks_rewrite_data_before_write() {
        let backend = Arc::new(MemoryBackend::new());
        let mut hooks = crate::hooks::HookPipeline::new();
        hooks.register_fn(HookEvent::PreSave, |data, _| {
            let mut data = data.clone();
            data["title"] = json!("From hook");
            Ok(Some(data))
        });
        let engine = Engine::builder(posts_config())
            .client(backend.clone())
            .hooks(hooks)
            .build()
            .await
            .unwrap();
        let entry = draft(json!({"title": "Hello"}));
        let slug = engine
            .persist_entry(PersistArgs::new(&posts_collection(), &entry))
            .await
            .unwrap();
        assert_eq!(slug, "from-hook");
        assert!(backend.file("content/posts/from-hook.md").await.is_some());
    }

    #[tokio::test]
    async fn existing_entry_is_updated_in_place() {
        let backend = Arc::new(MemoryBackend::new().with_file("content/posts/a.md", "---\ntitle: A\n---\n"));
        let engine = engine_with(posts_config(), backend.clone()).await;
        let posts = posts_collection();
        let mut entry = engine.get_entry(&posts, "a").await.unwrap();
        entry.data["title"] = json!("Renamed");
        let slug = engine.persist_entry(PersistArgs::new(&posts, &entry)).await.unwrap();
        assert_eq!(slug, "a");
        assert_eq!(
            backend.file("content/posts/a.md").await.as_deref(),
            Some("---\ntitle: Renamed\n---\n")
        );
        assert_eq!(backend.commits().await, vec!["Update Post “a”"]);
    }

    #[tokio::test]
    async fn custom_path_moves_entry() {
        let backend = Arc::new(MemoryBackend::new().with_file("content/pages/about/index.md", "---\ntitle: About\n---\n"));
        let mut pages = posts_collection();
        pages.name = "pages".into();
        pages.folder = Some("content/pages".into());
        pages.nested = Some(crate::collection::Nested {
            depth: 3,
            summary: None,
        });
        pages.meta = Some(MetaConfig {
            path: Some(MetaPath {
                widget: None,
                label: None,
                index_file: "index".into(),
            }),
        });
        let mut config = posts_config();
        config.collections.push(pages.clone());
        let engine = engine_with(config, backend.clone()).await;

        let mut entry = engine.get_entry(&pages, "about/index").await.unwrap();
        assert_eq!(entry.meta.path.as_deref(), Some("about"));
        entry.meta.path = Some("company/about".into());
        let slug = engine.persist_entry(PersistArgs::new(&pages, &entry)).await.unwrap();
        assert_eq!(slug, "company/about/index");
        assert_eq!(backend.paths().await, vec!["content/pages/company/about/index.md"]);
    }

    #[tokio::test]
    async fn locales_are_written_and_deleted_together() {
        let backend = Arc::new(MemoryBackend::new());
        let posts = posts_collection()
            .with_i18n(I18nSettings::new(I18nStructure::MultipleFiles, &["en", "de"]));
        let mut config = posts_config();
        config.collections = vec![posts.clone()];
        let engine = engine_with(config, backend.clone()).await;

        let mut entry = draft(json!({"title": "Hello"}));
        entry.locale_variants.insert("de".into(), json!({"title": "Hallo"}));
        let slug = engine.persist_entry(PersistArgs::new(&posts, &entry)).await.unwrap();
        assert_eq!(slug, "hello");
        assert_eq!(
            backend.paths().await,
            vec!["content/posts/hello.de.md", "content/posts/hello.en.md"]
        );

        engine.delete_entry(&posts, "hello").await.unwrap();
        assert!(backend.paths().await.is_empty());
    }

    #[tokio::test]
    async fn workflow_save_goes_to_review_area() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine_with(workflow_config(), backend.clone()).await;
        let entry = draft(json!({"title": "Hello"}));
        engine
            .persist_entry(PersistArgs::new(&posts_collection(), &entry).status(WorkflowStatus::PendingReview))
            .await
            .unwrap();
        assert!(backend.paths().await.is_empty());
        let unpublished = backend.unpublished_entry("posts", "hello").await.unwrap();
        assert_eq!(unpublished.status, WorkflowStatus::PendingReview);
    }

    #[tokio::test]
    async fn draft_media_is_uploaded_with_the_entry() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine_with(posts_config(), backend.clone()).await;
        let mut entry = draft(json!({"title": "Pic"}));
        entry.media_files.push(MediaFile::draft("static/media/a.png", vec![1, 2]));
        engine
            .persist_entry(PersistArgs::new(&posts_collection(), &entry))
            .await
            .unwrap();
        let media = engine.get_media(None).await.unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].path, "static/media/a.png");
        assert_eq!(
            engine.get_media_file("static/media/a.png").await.unwrap().content,
            Some(vec![1, 2])
        );
    }

    #[tokio::test]
    async fn media_upload_and_delete_commit() {
        let backend = Arc::new(MemoryBackend::new());
        let engine = engine_with(posts_config(), backend.clone()).await;
        let asset = AssetProxy {
            path: "static/media/logo.svg".into(),
            content: Some(b"<svg/>".to_vec()),
            field: None,
        };
        let file = engine.persist_media(&asset).await.unwrap();
        assert_eq!(file.name, "logo.svg");
        engine.delete_media("static/media/logo.svg").await.unwrap();
        assert!(engine.get_media(None).await.unwrap().is_empty());
        assert_eq!(backend.commits().await.len(), 2);
    }
}
