//! Shared fixtures for unit tests.

use std::sync::Arc;

use serde_json::json;

use crate::backend::MemoryBackend;
use crate::collection::{Collection, Field};
use crate::config::{BackendConfig, CmsConfig, PublishMode};
use crate::engine::Engine;
use crate::format::FormatKind;
use crate::storage::MemoryStore;

/// `posts`: a creatable frontmatter folder collection under `content/posts`
/// with `title`, `date` and `body` fields.
pub fn posts_collection() -> Collection {
    let mut title = Field::new("title");
    title.default = Some(json!("Untitled"));
    let mut date = Field::new("date").widget("datetime");
    date.required = Some(false);
    let mut body = Field::new("body").widget("markdown");
    body.required = Some(false);

    let mut posts = Collection::folder("posts", "content/posts");
    posts.label_singular = Some("Post".into());
    posts.extension = Some("md".into());
    posts.format = Some(FormatKind::Frontmatter);
    posts.create = true;
    posts.fields = vec![title, date, body];
    posts
}

/// Configuration with the `posts` collection on the in-memory backend.
pub fn posts_config() -> CmsConfig {
    CmsConfig {
        backend: BackendConfig::named("test-repo"),
        media_folder: "static/media".into(),
        collections: vec![posts_collection()],
        ..Default::default()
    }
    .normalize()
}

/// The same configuration in editorial workflow mode.
pub fn workflow_config() -> CmsConfig {
    CmsConfig {
        publish_mode: PublishMode::EditorialWorkflow,
        ..posts_config()
    }
}

/// An engine over `backend` with a fresh in-memory store.
pub async fn engine_with(config: CmsConfig, backend: Arc<MemoryBackend>) -> Engine {
    Engine::builder(config)
        .client(backend)
        .store(Arc::new(MemoryStore::new()))
        .build()
        .await
        .expect("engine")
}
