//! The editing session: the boundary between a UI and the engine.
//!
//! An [`EditorSession`] owns the one draft being edited, the entries loaded
//! per collection, the editorial workflow board and a queue of notices for
//! the user. Every action catches engine failures, records a notice and logs
//! them; the draft is left as it was before the attempt so the user can
//! retry. Local backup failures are logged and never stop an action.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::autosave::Autosaver;
use crate::collection::Collection;
use crate::draft::EntryDraft;
use crate::engine::{Engine, PersistArgs};
use crate::entry::{Entry, MediaFile};
use crate::error::{QuireError, Result};
use crate::value::EntryData;
use crate::workflow::{EditorialWorkflow, WorkflowStatus};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// An action completed
    Success,
    /// An action was refused or partially done
    Warning,
    /// An action failed
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity
    pub kind: NoticeKind,
    /// Human readable message
    pub message: String,
}

impl Notice {
    fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// One user's editing session over an engine.
pub struct EditorSession {
    engine: Arc<Engine>,
    autosaver: Autosaver,
    draft: EntryDraft,
    collection: Option<Collection>,
    entries: IndexMap<String, Vec<Entry>>,
    workflow: EditorialWorkflow,
    notices: Vec<Notice>,
}

impl EditorSession {
    /// A session with the default autosave delay.
    pub fn new(engine: Arc<Engine>) -> Self {
        let autosaver = Autosaver::new(engine.clone());
        Self::with_autosaver(engine, autosaver)
    }

    /// A session using `autosaver` for draft backups.
    pub fn with_autosaver(engine: Arc<Engine>, autosaver: Autosaver) -> Self {
        Self {
            engine,
            autosaver,
            draft: EntryDraft::new(),
            collection: None,
            entries: IndexMap::new(),
            workflow: EditorialWorkflow::new(),
            notices: Vec::new(),
        }
    }

    /// The engine.
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// The draft slot.
    pub fn draft(&self) -> &EntryDraft {
        &self.draft
    }

    /// Collection of the current draft.
    pub fn draft_collection(&self) -> Option<&Collection> {
        self.collection.as_ref()
    }

    /// The editorial workflow board.
    pub fn workflow(&self) -> &EditorialWorkflow {
        &self.workflow
    }

    /// Entries loaded for `collection`.
    pub fn entries(&self, collection: &str) -> &[Entry] {
        self.entries.get(collection).map(Vec::as_slice).unwrap_or_default()
    }

    /// Pending notices, oldest first.
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Take and clear the pending notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.notices.push(Notice::new(kind, message));
    }

    fn fail<T>(&mut self, action: &str, err: QuireError) -> Result<T> {
        warn!(action, error = %err, "action failed");
        self.notify(NoticeKind::Error, format!("Failed to {action}: {err}"));
        Err(err)
    }

    fn collection(&self, name: &str) -> Result<Collection> {
        self.engine.collection(name).cloned()
    }

    // ==================== Listing ====================

    /// Load every entry of `collection`.
    pub async fn load_entries(&mut self, collection: &str) -> Result<&[Entry]> {
        let loaded = match self.collection(collection) {
            Ok(c) => self.engine.list_all_entries(&c).await,
            Err(e) => Err(e),
        };
        match loaded {
            Ok(entries) => {
                debug!(collection, count = entries.len(), "entries loaded");
                self.entries.insert(collection.to_string(), entries);
                Ok(self.entries(collection))
            }
            Err(e) => self.fail("load entries", e),
        }
    }

    fn remember_entry(&mut self, entry: Entry) {
        let list = self.entries.entry(entry.collection.clone()).or_default();
        match list.iter_mut().find(|e| e.slug == entry.slug) {
            Some(existing) => *existing = entry,
            None => list.push(entry),
        }
    }

    fn forget_entry(&mut self, collection: &str, slug: &str) {
        if let Some(list) = self.entries.get_mut(collection) {
            list.retain(|e| e.slug != slug);
        }
    }

    // ==================== Draft ====================

    /// Open an existing entry for editing.
    ///
    /// Under the editorial workflow an entry waiting for review opens in its
    /// unpublished form. A local backup that differs from the stored entry is
    /// offered through [`EntryDraft::local_backup`].
    pub async fn open_entry(&mut self, collection: &str, slug: &str) -> Result<()> {
        let result = match self.collection(collection) {
            Ok(c) => self.fetch_for_edit(&c, slug).await.map(|entry| (c, entry)),
            Err(e) => Err(e),
        };
        let (collection, entry) = match result {
            Ok(found) => found,
            Err(e) => return self.fail("load entry", e),
        };
        self.autosaver.reset().await;
        let backup = self
            .local_backup_for(&collection, slug)
            .await
            .filter(|b| b.data != entry.data || b.locale_variants != entry.locale_variants);
        self.draft = EntryDraft::create_from_entry(entry);
        self.draft.set_local_backup(backup);
        self.collection = Some(collection);
        Ok(())
    }

    async fn fetch_for_edit(&self, collection: &Collection, slug: &str) -> Result<Entry> {
        if self.engine.config().editorial_workflow() {
            match self.engine.unpublished_entry(collection, slug).await {
                Ok(mut entry) => {
                    entry.new_record = false;
                    return Ok(entry);
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        self.engine.get_entry(collection, slug).await
    }

    async fn local_backup_for(&self, collection: &Collection, slug: &str) -> Option<Entry> {
        match self.engine.get_local_backup(collection, slug).await {
            Ok(backup) => backup,
            Err(e) => {
                warn!(collection = %collection.name, slug, error = %e, "could not read local backup");
                None
            }
        }
    }

    /// Start a new entry of `collection`; `query` seeds field values
    /// (`title=Hello&draft=true`).
    pub async fn create_empty(&mut self, collection: &str, query: &str) -> Result<()> {
        let collection = match self.collection(collection) {
            Ok(c) if !c.allow_new_entries() => {
                let name = c.name.clone();
                return self.fail("create entry", QuireError::PersistDenied(name));
            }
            Ok(c) => c,
            Err(e) => return self.fail("create entry", e),
        };
        self.autosaver.reset().await;
        let backup = self.local_backup_for(&collection, "").await;
        self.draft = EntryDraft::create_empty(&collection, query);
        self.draft.set_local_backup(backup);
        self.collection = Some(collection);
        Ok(())
    }

    /// Replace the draft with a new, unsaved copy of it.
    pub async fn duplicate(&mut self) {
        let Some(entry) = self.draft.entry().cloned() else {
            return;
        };
        self.autosaver.reset().await;
        self.draft = EntryDraft::duplicate_from_entry(&entry);
        self.schedule_backup();
    }

    /// Edit a field of the draft. `locale` targets a non-default locale.
    pub fn change_field(&mut self, key: &str, value: EntryData, locale: Option<&str>) {
        let Some(collection) = &self.collection else {
            return;
        };
        self.draft.change_field(collection, key, value, locale);
        self.schedule_backup();
    }

    /// Set the draft's custom path.
    pub fn change_meta_path(&mut self, path: Option<String>) {
        self.draft.change_meta_path(path);
        self.schedule_backup();
    }

    /// Attach a media file to the draft.
    pub fn add_draft_media(&mut self, file: MediaFile) {
        self.draft.add_draft_media(file);
        self.schedule_backup();
    }

    /// Detach a media file from the draft.
    pub fn remove_draft_media(&mut self, path: &str) {
        self.draft.remove_draft_media(path);
        self.schedule_backup();
    }

    fn schedule_backup(&self) {
        if let (Some(collection), Some(entry)) = (&self.collection, self.draft.entry())
            && self.draft.has_changed()
        {
            self.autosaver.schedule(collection, entry);
        }
    }

    /// Close the draft without saving. Its backup stays for recovery.
    pub async fn discard(&mut self) {
        self.autosaver.cancel_pending().await;
        self.draft.discard();
        self.collection = None;
    }

    // ==================== Local backup ====================

    /// Replace the draft with the backup offered for it.
    pub fn restore_local_backup(&mut self) -> bool {
        let restored = self.draft.restore_local_backup();
        if restored {
            self.notify(NoticeKind::Success, "Restored unsaved changes");
        }
        restored
    }

    /// Throw away the draft's backup.
    pub async fn delete_local_backup(&mut self) {
        self.autosaver.cancel_pending().await;
        if let (Some(collection), Some(entry)) = (&self.collection, self.draft.entry()) {
            self.clear_backup(collection, &entry.slug).await;
        }
        self.draft.set_local_backup(None);
    }

    async fn clear_backup(&self, collection: &Collection, slug: &str) {
        if let Err(e) = self.engine.delete_local_backup(collection, slug).await {
            warn!(collection = %collection.name, slug, error = %e, "could not delete local backup");
        }
    }

    // ==================== Persist / delete ====================

    /// Validate and save the draft, returning its slug.
    ///
    /// Invalid drafts never reach the backend. On success the pending backup
    /// is cancelled and deleted and the draft is reloaded from the backend.
    pub async fn persist(&mut self) -> Result<String> {
        let Some(collection) = self.collection.clone().filter(|_| self.draft.entry().is_some()) else {
            return self.fail("save entry", QuireError::Validation("no entry is open".into()));
        };

        let existing: Vec<String> = self.entries(&collection.name).iter().map(|e| e.path.clone()).collect();
        let slug_config = self.engine.config().slug.clone();
        if !self
            .draft
            .validate(&collection, &slug_config, existing.iter().map(String::as_str))
        {
            let fields: Vec<&str> = self.draft.fields_errors().keys().map(String::as_str).collect();
            let err = QuireError::Validation(format!("invalid fields: {}", fields.join(", ")));
            self.notify(NoticeKind::Warning, "Oops, you've missed a required field. Please complete before saving.");
            warn!(collection = %collection.name, error = %err, "draft not saved");
            return Err(err);
        }

        self.draft.start_persisting();
        self.autosaver.cancel_pending().await;

        let Some(entry) = self.draft.entry().cloned() else {
            return self.fail("save entry", QuireError::Validation("no entry is open".into()));
        };
        let used_slugs: Vec<String> = self.entries(&collection.name).iter().map(|e| e.slug.clone()).collect();
        let mut args = PersistArgs::new(&collection, &entry).used_slugs(&used_slugs);
        if let Some(status) = self.workflow.status(&collection.name, &entry.slug).or(entry.status) {
            args = args.status(status);
        }
        let slug = match self.engine.persist_entry(args).await {
            Ok(slug) => slug,
            Err(e) => {
                self.draft.persist_failed();
                return self.fail("save entry", e);
            }
        };

        self.clear_backup(&collection, &entry.slug).await;
        if entry.slug != slug {
            self.clear_backup(&collection, &slug).await;
        }
        self.autosaver.reset().await;
        if entry.slug != slug && !entry.slug.is_empty() {
            self.forget_entry(&collection.name, &entry.slug);
        }

        let entry_was_new = entry.new_record;
        let canonical = match self.fetch_for_edit(&collection, &slug).await {
            Ok(canonical) => canonical,
            Err(e) => {
                warn!(collection = %collection.name, %slug, error = %e, "could not reload saved entry");
                let mut saved = entry;
                saved.slug = slug.clone();
                saved.new_record = false;
                saved.is_persisting = false;
                saved
            }
        };
        if self.engine.config().editorial_workflow() {
            let mut tracked = canonical.clone();
            tracked.new_record = entry_was_new
                || self
                    .workflow
                    .get(&collection.name, &slug)
                    .is_some_and(|e| e.new_record);
            self.workflow.track(tracked);
        } else {
            self.remember_entry(canonical.clone());
        }
        self.draft.persisted(canonical);
        info!(collection = %collection.name, %slug, "draft saved");
        self.notify(NoticeKind::Success, "Entry saved");
        Ok(slug)
    }

    /// Delete the draft's entry from the backend and close the draft.
    ///
    /// A never-saved draft only loses its backup.
    pub async fn delete(&mut self) -> Result<()> {
        let (Some(collection), Some(entry)) = (self.collection.clone(), self.draft.entry().cloned()) else {
            return Ok(());
        };
        self.autosaver.cancel_pending().await;
        if !entry.new_record {
            if let Err(e) = self.engine.delete_entry(&collection, &entry.slug).await {
                return self.fail("delete entry", e);
            }
            self.forget_entry(&collection.name, &entry.slug);
            self.notify(NoticeKind::Success, "Entry deleted");
        }
        self.clear_backup(&collection, &entry.slug).await;
        self.draft.discard();
        self.collection = None;
        Ok(())
    }

    // ==================== Editorial workflow ====================

    /// Load the entries waiting for review.
    pub async fn load_unpublished(&mut self) -> Result<()> {
        match self.engine.unpublished_entries().await {
            Ok(entries) => {
                self.workflow.load(entries);
                Ok(())
            }
            Err(e) => self.fail("load unpublished entries", e),
        }
    }

    /// Move an unpublished entry to another status. Only the status is
    /// written.
    pub async fn move_unpublished(&mut self, collection: &str, slug: &str, status: WorkflowStatus) -> Result<()> {
        let moved = match self.collection(collection) {
            Ok(c) => self.engine.update_unpublished_status(&c, slug, status).await,
            Err(e) => Err(e),
        };
        if let Err(e) = moved {
            return self.fail("update status", e);
        }
        match self.workflow.move_status(collection, slug, status) {
            Ok(previous) => debug!(collection, slug, %previous, %status, "status changed"),
            Err(_) => debug!(collection, slug, "moved entry is not on the board"),
        }
        Ok(())
    }

    /// Ask for review of a draft.
    pub async fn request_review(&mut self, collection: &str, slug: &str) -> Result<()> {
        self.move_unpublished(collection, slug, WorkflowStatus::PendingReview)
            .await
    }

    /// Mark a reviewed entry ready to publish.
    pub async fn mark_ready(&mut self, collection: &str, slug: &str) -> Result<()> {
        self.move_unpublished(collection, slug, WorkflowStatus::PendingPublish)
            .await
    }

    /// Publish an entry that is ready; anything else is reported as not ready
    /// and stays where it is.
    pub async fn publish(&mut self, collection: &str, slug: &str) -> Result<()> {
        if let Err(e) = self.workflow.ensure_publishable(collection, slug) {
            if let QuireError::NotReady(_) = e {
                self.notify(
                    NoticeKind::Warning,
                    "This entry is not ready to be published. Move it to Ready first.",
                );
                return Err(e);
            }
            return self.fail("publish entry", e);
        }
        let c = match self.collection(collection) {
            Ok(c) => c,
            Err(e) => return self.fail("publish entry", e),
        };
        if let Err(e) = self.engine.publish_unpublished(&c, slug).await {
            return self.fail("publish entry", e);
        }
        self.workflow.publish(collection, slug);
        match self.engine.get_entry(&c, slug).await {
            Ok(entry) => self.remember_entry(entry),
            Err(e) => warn!(collection, slug, error = %e, "could not reload published entry"),
        }
        self.notify(NoticeKind::Success, "Entry published");
        Ok(())
    }

    /// Discard an unpublished entry. A brand-new entry also loses its
    /// local backup.
    pub async fn delete_unpublished(&mut self, collection: &str, slug: &str) -> Result<()> {
        let c = match self.collection(collection) {
            Ok(c) => c,
            Err(e) => return self.fail("delete unpublished entry", e),
        };
        if let Err(e) = self.engine.delete_unpublished(&c, slug).await {
            return self.fail("delete unpublished entry", e);
        }
        let removed = self.workflow.remove(collection, slug);
        if removed.is_some_and(|e| e.new_record) {
            self.clear_backup(&c, slug).await;
        }
        if self
            .draft
            .entry()
            .is_some_and(|e| e.collection == collection && e.slug == slug)
        {
            self.autosaver.cancel_pending().await;
            self.draft.discard();
            self.collection = None;
        }
        self.notify(NoticeKind::Success, "Unpublished changes deleted");
        Ok(())
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("draft", &self.draft.key())
            .field("state", &self.draft.state())
            .field("collections_loaded", &self.entries.len())
            .field("unpublished", &self.workflow.len())
            .field("notices", &self.notices.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::backend::MemoryBackend;
    use crate::draft::DraftState;
    use crate::test_utils::{engine_with, posts_collection, posts_config, workflow_config};

    async fn session_with(config: crate::config::CmsConfig, backend: Arc<MemoryBackend>) -> EditorSession {
        let engine = Arc::new(engine_with(config, backend).await);
        let autosaver = Autosaver::with_delay(engine.clone(), Duration::from_millis(100));
        EditorSession::with_autosaver(engine, autosaver)
    }

    // ── drafts ──

    #[tokio::test]
    async fn new_post_is_saved_and_reloaded() {
        let backend = Arc::new(MemoryBackend::new());
        let mut session = session_with(posts_config(), backend.clone()).await;
        session.create_empty("posts", "").await.unwrap();
        assert_eq!(session.draft().entry().unwrap().data["title"], "Untitled");

        session.change_field("title", json!("Hello"), None);
        let slug = session.persist().await.unwrap();
        assert_eq!(slug, "hello");
        assert_eq!(
            backend.file("content/posts/hello.md").await.as_deref(),
            Some("---\ntitle: Hello\n---\n")
        );
        assert_eq!(session.draft().state(), DraftState::Persisted);
        assert!(!session.draft().entry().unwrap().new_record);
        assert_eq!(session.entries("posts").len(), 1);
        assert_eq!(session.take_notices().last().unwrap().kind, NoticeKind::Success);
    }

    #[tokio::test]
    async fn invalid_drafts_never_reach_the_backend() {
        let backend = Arc::new(MemoryBackend::new());
        let mut session = session_with(posts_config(), backend.clone()).await;
        session.create_empty("posts", "").await.unwrap();
        session.change_field("title", json!(""), None);
        assert!(matches!(session.persist().await, Err(QuireError::Validation(_))));
        assert!(session.draft().fields_errors().contains_key("title"));
        assert!(backend.commits().await.is_empty());
        assert_eq!(session.notices()[0].kind, NoticeKind::Warning);
    }

    #[tokio::test]
    async fn failed_save_keeps_the_draft() {
        let backend = Arc::new(MemoryBackend::new().with_file("content/posts/hello.md", "---\ntitle: Old\n---\n"));
        let mut session = session_with(posts_config(), backend.clone()).await;
        session.open_entry("posts", "hello").await.unwrap();
        session.change_field("title", json!("New"), None);
        backend.fail_writes(Some("remote unavailable")).await;

        assert!(session.persist().await.is_err());
        let draft = session.draft();
        assert_eq!(draft.state(), DraftState::Loaded);
        assert_eq!(draft.entry().unwrap().data["title"], "New");
        assert!(!draft.is_persisting());
        assert_eq!(session.notices().last().unwrap().kind, NoticeKind::Error);
    }

    #[tokio::test]
    async fn delete_removes_the_entry() {
        let backend = Arc::new(MemoryBackend::new().with_file("content/posts/gone.md", "---\ntitle: Gone\n---\n"));
        let mut session = session_with(posts_config(), backend.clone()).await;
        session.load_entries("posts").await.unwrap();
        session.open_entry("posts", "gone").await.unwrap();
        session.delete().await.unwrap();
        assert!(backend.file("content/posts/gone.md").await.is_none());
        assert!(session.entries("posts").is_empty());
        assert!(session.draft().entry().is_none());
    }

    #[tokio::test]
    async fn unknown_collection_is_reported() {
        let mut session = session_with(posts_config(), Arc::new(MemoryBackend::new())).await;
        assert!(matches!(
            session.load_entries("pages").await,
            Err(QuireError::UnknownCollection(_))
        ));
        assert_eq!(session.take_notices().len(), 1);
        assert!(session.notices().is_empty());
    }

    // ── backups ──

    #[tokio::test(start_paused = true)]
    async fn autosaved_backup_is_offered_and_cleared_on_save() {
        let backend = Arc::new(MemoryBackend::new());
        let mut session = session_with(posts_config(), backend).await;
        let posts = posts_collection();
        session.create_empty("posts", "").await.unwrap();
        session.change_field("title", json!("Unsaved"), None);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(session.engine().get_local_backup(&posts, "").await.unwrap().is_some());

        session.discard().await;
        session.create_empty("posts", "").await.unwrap();
        assert_eq!(
            session.draft().local_backup().unwrap().data["title"],
            "Unsaved"
        );
        assert!(session.restore_local_backup());
        assert_eq!(session.draft().entry().unwrap().data["title"], "Unsaved");

        session.persist().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(session.engine().get_local_backup(&posts, "").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_a_backup_forgets_it() {
        let mut session = session_with(posts_config(), Arc::new(MemoryBackend::new())).await;
        session.create_empty("posts", "").await.unwrap();
        session.change_field("title", json!("Scratch"), None);
        tokio::time::sleep(Duration::from_millis(200)).await;
        session.delete_local_backup().await;
        assert!(session.draft().local_backup().is_none());
        assert!(
            session
                .engine()
                .get_local_backup(&posts_collection(), "")
                .await
                .unwrap()
                .is_none()
        );
    }

    // ── workflow ──

    #[tokio::test]
    async fn publish_requires_ready_status() {
        let backend = Arc::new(MemoryBackend::new());
        let mut session = session_with(workflow_config(), backend.clone()).await;
        session.create_empty("posts", "title=Review+me").await.unwrap();
        let slug = session.persist().await.unwrap();
        assert_eq!(session.workflow().status("posts", &slug), Some(WorkflowStatus::Draft));

        assert!(matches!(session.publish("posts", &slug).await, Err(QuireError::NotReady(_))));
        assert_eq!(session.workflow().len(), 1);

        session.request_review("posts", &slug).await.unwrap();
        assert!(session.publish("posts", &slug).await.is_err());
        session.mark_ready("posts", &slug).await.unwrap();
        assert_eq!(
            session.workflow().by_status(WorkflowStatus::PendingPublish).len(),
            1
        );

        session.publish("posts", &slug).await.unwrap();
        assert!(session.workflow().is_empty());
        assert!(backend.file("content/posts/review-me.md").await.is_some());
        assert_eq!(session.entries("posts").len(), 1);
    }

    #[tokio::test]
    async fn saving_an_unpublished_entry_keeps_its_slug_and_status() {
        let backend = Arc::new(MemoryBackend::new());
        let mut session = session_with(workflow_config(), backend).await;
        session.create_empty("posts", "title=Hello").await.unwrap();
        let slug = session.persist().await.unwrap();
        session.request_review("posts", &slug).await.unwrap();

        session.open_entry("posts", &slug).await.unwrap();
        session.change_field("body", json!("More"), None);
        assert_eq!(session.persist().await.unwrap(), slug);
        assert_eq!(
            session.workflow().status("posts", &slug),
            Some(WorkflowStatus::PendingReview)
        );
    }

    #[tokio::test]
    async fn deleting_a_new_unpublished_entry_clears_its_backup() {
        let backend = Arc::new(MemoryBackend::new());
        let mut session = session_with(workflow_config(), backend).await;
        let posts = posts_collection();
        session.create_empty("posts", "title=Temp").await.unwrap();
        let slug = session.persist().await.unwrap();
        session.load_unpublished().await.unwrap();

        let mut backup = Entry::new("posts", slug.clone(), "content/posts/temp.md").with_data(json!({"title": "Unsaved"}));
        backup.new_record = false;
        session.engine().persist_local_backup(&posts, &backup).await.unwrap();

        session.delete_unpublished("posts", &slug).await.unwrap();
        assert!(session.workflow().is_empty());
        assert!(session.draft().entry().is_none());
        assert!(session.engine().get_local_backup(&posts, &slug).await.unwrap().is_none());
    }
}
