#![allow(dead_code)]

use std::sync::Arc;

use quire_core::backend::{BackendClient, MemoryBackend};
use quire_core::storage::MemoryStore;
use quire_core::{CmsConfig, Engine};

pub const POSTS: &str = r#"
backend:
  name: test-repo
media_folder: static/media
collections:
  - name: posts
    label_singular: Post
    folder: content/posts
    extension: md
    format: frontmatter
    create: true
    fields:
      - { name: title, default: Untitled }
      - { name: date, widget: datetime, required: false }
      - { name: body, widget: markdown, required: false }
"#;

pub fn posts_config() -> CmsConfig {
    CmsConfig::from_yaml_str(POSTS).expect("posts config")
}

pub async fn engine(config: CmsConfig, client: Arc<dyn BackendClient>) -> Arc<Engine> {
    Arc::new(
        Engine::builder(config)
            .client(client)
            .store(Arc::new(MemoryStore::new()))
            .build()
            .await
            .expect("engine"),
    )
}

pub async fn posts_engine(backend: Arc<MemoryBackend>) -> Arc<Engine> {
    engine(posts_config(), backend).await
}
