//! The synchronization engine.
//!
//! [`Engine`] is the facade the editor talks to. It owns the configuration,
//! the resolved [`BackendClient`], the local backup store and the hook
//! pipeline, and is passed explicitly to whoever needs it.
//!
//! The operations are split by concern:
//!
//! - `listing`: listing, pagination and search
//! - `persist`: slug generation, serialization, persist and delete, media
//! - `local_backup`: draft backups in the key/value store
//! - `editorial`: entries in the review area

mod editorial;
mod listing;
mod local_backup;
mod persist;

pub use listing::ListedEntries;
pub use persist::PersistArgs;

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::auth::AuthStore;
use crate::backend::{BackendClient, BackendRegistry, BackendStatus};
use crate::backup::LocalBackupStore;
use crate::collection::Collection;
use crate::config::CmsConfig;
use crate::entry::{Credentials, Entry, RawFile, User};
use crate::error::Result;
use crate::format::resolve_format;
use crate::hooks::{HookEvent, HookPipeline};
use crate::storage::{KeyValueStore, MemoryStore};
use crate::value::EntryData;

/// Builder for [`Engine`].
pub struct EngineBuilder {
    config: CmsConfig,
    client: Option<Arc<dyn BackendClient>>,
    registry: Option<BackendRegistry>,
    store: Option<Arc<dyn KeyValueStore>>,
    hooks: HookPipeline,
}

impl EngineBuilder {
    /// Use this backend instead of resolving `config.backend.name`.
    pub fn client(mut self, client: Arc<dyn BackendClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Resolve the backend from this registry (built-ins when unset).
    pub fn registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Key/value store for backups and the signed-in user (memory when unset).
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Entry event hooks.
    pub fn hooks(mut self, hooks: HookPipeline) -> Self {
        self.hooks = hooks;
        self
    }

    /// Build the engine.
    ///
    /// Clears the anonymous backup left by a previous session.
    pub async fn build(self) -> Result<Engine> {
        let client = match self.client {
            Some(client) => client,
            None => self
                .registry
                .unwrap_or_else(BackendRegistry::with_builtins)
                .resolve(&self.config.backend)?,
        };
        let store: Arc<dyn KeyValueStore> = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let backups = LocalBackupStore::new(store.clone());
        if let Err(e) = backups.delete_anonymous().await {
            warn!("could not clear anonymous backup: {e}");
        }
        info!(backend = client.name(), collections = self.config.collections.len(), "engine ready");
        Ok(Engine {
            config: self.config,
            client,
            backups,
            auth: AuthStore::new(store),
            hooks: self.hooks,
            user: RwLock::new(None),
        })
    }
}

/// Entry synchronization engine.
pub struct Engine {
    config: CmsConfig,
    client: Arc<dyn BackendClient>,
    backups: LocalBackupStore,
    auth: AuthStore,
    hooks: HookPipeline,
    user: RwLock<Option<User>>,
}

impl Engine {
    /// Start building an engine for `config`.
    pub fn builder(config: CmsConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            client: None,
            registry: None,
            store: None,
            hooks: HookPipeline::new(),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &CmsConfig {
        &self.config
    }

    /// The backend.
    pub fn client(&self) -> &Arc<dyn BackendClient> {
        &self.client
    }

    /// Collection called `name`.
    pub fn collection(&self, name: &str) -> Result<&Collection> {
        self.config.collection(name)
    }

    // ==================== Auth ====================

    /// Sign in with `credentials` and remember the user.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<User> {
        let mut user = self.client.authenticate(credentials).await?;
        user.backend_name = Some(self.client.name().to_string());
        self.auth.store_user(&user).await?;
        *self.user.write().await = Some(user.clone());
        info!(login = user.login.as_deref().unwrap_or_default(), "signed in");
        Ok(user)
    }

    /// The signed-in user, restoring a stored session of the same backend.
    pub async fn current_user(&self) -> Result<Option<User>> {
        if let Some(user) = self.user.read().await.clone() {
            return Ok(Some(user));
        }
        let Some(stored) = self.auth.get_user().await? else {
            return Ok(None);
        };
        if stored.backend_name.as_deref() != Some(self.client.name()) {
            debug!("stored user belongs to another backend");
            return Ok(None);
        }
        let mut user = self.client.restore_user(&stored).await?;
        user.backend_name = Some(self.client.name().to_string());
        self.auth.store_user(&user).await?;
        *self.user.write().await = Some(user.clone());
        Ok(Some(user))
    }

    /// Replace the stored user's tokens.
    pub async fn update_user_credentials(&self, credentials: &Credentials) -> Result<()> {
        let Some(mut user) = self.auth.get_user().await? else {
            return Ok(());
        };
        user.token = credentials.token.clone();
        self.auth.store_user(&user).await?;
        *self.user.write().await = Some(user);
        Ok(())
    }

    /// Sign out. Failures are logged; the user is cleared regardless.
    pub async fn logout(&self) {
        if let Err(e) = self.client.logout().await {
            warn!("backend logout failed: {e}");
        }
        if let Err(e) = self.auth.logout().await {
            warn!("could not clear stored user: {e}");
        }
        *self.user.write().await = None;
    }

    /// Backend reachability.
    pub async fn status(&self) -> Result<BackendStatus> {
        self.client.status().await
    }

    async fn signed_in_user(&self) -> Option<User> {
        self.user.read().await.clone()
    }

    async fn run_hooks(&self, event: HookEvent, data: EntryData) -> Result<EntryData> {
        let user = self.signed_in_user().await;
        self.hooks.run(event, data, user.as_ref()).await
    }

    // ==================== Formats ====================

    /// Decode a raw file of `collection` into an entry.
    pub fn entry_from_raw(&self, collection: &Collection, raw: RawFile) -> Result<Entry> {
        let path = raw.file.path;
        let data = resolve_format(collection, Some(&path)).from_file(&raw.data)?;
        let slug = collection.entry_slug(&path).unwrap_or_default();
        let mut entry = Entry::new(&collection.name, slug, path)
            .with_data(data)
            .with_raw(raw.data);
        entry.label = raw
            .file
            .label
            .or_else(|| collection.file_label(&entry.slug).map(String::from));
        entry.author = raw.file.author;
        entry.updated_on = raw.file.updated_on;
        if collection.has_meta_path() {
            entry.meta.path = Some(collection.meta_path_for(&entry.path));
        }
        Ok(entry)
    }

    /// Encode `data` the way an entry at `path` of `collection` is stored.
    pub fn data_to_raw(&self, collection: &Collection, slug: &str, path: &str, data: &EntryData) -> Result<String> {
        let format = resolve_format(collection, Some(path).filter(|p| !p.is_empty()));
        let order = collection.fields_order(slug)?;
        let comments = collection.fields_comments(slug);
        format.to_file(data, &order, &comments)
    }

    /// Encode the default-locale data of `entry`.
    pub fn entry_to_raw(&self, collection: &Collection, entry: &Entry) -> Result<String> {
        self.data_to_raw(collection, &entry.slug, &entry.path, &entry.data)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("backend", &self.client.name())
            .field("collections", &self.config.collections.len())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::backup::{BackupRecord, backup_key};
    use crate::error::QuireError;
    use crate::test_utils::{engine_with, posts_collection, posts_config};
    use serde_json::json;

    // ── construction ──

    #[tokio::test]
    async fn build_resolves_backend_by_name_and_clears_anonymous_backup() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                &backup_key(None, None),
                serde_json::to_value(BackupRecord {
                    raw: "x".into(),
                    path: String::new(),
                    media_files: vec![],
                    i18n: None,
                })
                .unwrap(),
            )
            .await
            .unwrap();
        let engine = Engine::builder(posts_config())
            .store(store.clone())
            .build()
            .await
            .unwrap();
        assert_eq!(engine.client().name(), "test-repo");
        assert!(store.keys().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_backend_fails_to_build() {
        let mut config = posts_config();
        config.backend.name = "nope".into();
        assert!(matches!(
            Engine::builder(config).build().await,
            Err(QuireError::UnknownBackend(_))
        ));
    }

    // ── auth ──

    #[tokio::test]
    async fn authenticate_stores_and_restores_user() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(MemoryBackend::new().require_token("secret"));
        let engine = Engine::builder(posts_config())
            .client(backend.clone())
            .store(store.clone())
            .build()
            .await
            .unwrap();
        let bad = Credentials {
            token: Some("wrong".into()),
            refresh_token: None,
        };
        assert!(matches!(engine.authenticate(&bad).await, Err(QuireError::AuthFailed(_))));

        let good = Credentials {
            token: Some("secret".into()),
            refresh_token: None,
        };
        let user = engine.authenticate(&good).await.unwrap();
        assert_eq!(user.backend_name.as_deref(), Some("test-repo"));

        let restored = Engine::builder(posts_config())
            .client(backend)
            .store(store)
            .build()
            .await
            .unwrap();
        assert_eq!(restored.current_user().await.unwrap(), Some(user));
        restored.logout().await;
        assert_eq!(restored.current_user().await.unwrap(), None);
    }

    #[tokio::test]
    async fn stored_user_of_another_backend_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        AuthStore::new(store.clone())
            .store_user(&User {
                login: Some("x".into()),
                backend_name: Some("local".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let engine = Engine::builder(posts_config())
            .client(Arc::new(MemoryBackend::new()))
            .store(store)
            .build()
            .await
            .unwrap();
        assert_eq!(engine.current_user().await.unwrap(), None);
    }

    // ── formats ──

    #[tokio::test]
    async fn raw_round_trip_through_collection_format() {
        let engine = engine_with(posts_config(), Arc::new(MemoryBackend::new())).await;
        let posts = posts_collection();
        let raw = RawFile::new("content/posts/hello.md", "---\ntitle: Hello\n---\nBody text\n");
        let entry = engine.entry_from_raw(&posts, raw).unwrap();
        assert_eq!(entry.slug, "hello");
        assert_eq!(entry.data, json!({"title": "Hello", "body": "Body text\n"}));
        assert_eq!(
            engine.entry_to_raw(&posts, &entry).unwrap(),
            "---\ntitle: Hello\n---\nBody text\n"
        );
    }
}
