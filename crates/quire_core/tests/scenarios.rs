mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;

use quire_core::backend::MemoryBackend;
use quire_core::engine::PersistArgs;
use quire_core::format::FormatKind;
use quire_core::{EditorSession, Entry};

use common::posts_engine;

#[tokio::test]
async fn new_post_lands_at_its_slug_path() {
    let backend = Arc::new(MemoryBackend::new());
    let engine = posts_engine(backend.clone()).await;
    let mut session = EditorSession::new(engine);

    session.create_empty("posts", "").await.unwrap();
    assert_eq!(session.draft().entry().unwrap().data, json!({"title": "Untitled"}));
    session.change_field("title", json!("Hello"), None);
    let slug = session.persist().await.unwrap();

    assert_eq!(slug, "hello");
    assert_eq!(backend.paths().await, vec!["content/posts/hello.md".to_string()]);
    let raw = backend.file("content/posts/hello.md").await.unwrap();
    let decoded = FormatKind::Frontmatter.codec().from_file(&raw).unwrap();
    assert_eq!(decoded, json!({"title": "Hello"}));
}

#[tokio::test]
async fn colliding_title_gets_next_free_suffix() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_file("content/posts/hello.md", "---\ntitle: Hello\n---\n")
            .with_file("content/posts/hello-1.md", "---\ntitle: Hello\n---\n"),
    );
    let engine = posts_engine(backend.clone()).await;
    let mut session = EditorSession::new(engine);
    session.load_entries("posts").await.unwrap();

    session.create_empty("posts", "title=Hello").await.unwrap();
    assert_eq!(session.persist().await.unwrap(), "hello-2");
    assert!(backend.file("content/posts/hello-2.md").await.is_some());
}

#[tokio::test]
async fn repeated_creations_get_distinct_slugs() {
    let backend = Arc::new(MemoryBackend::new());
    let engine = posts_engine(backend.clone()).await;
    let posts = engine.collection("posts").unwrap().clone();

    let mut used = Vec::new();
    for i in 0..6 {
        let mut entry = Entry::new("posts", "", "").with_data(json!({"title": "Same title"}));
        entry.new_record = true;
        // Every other creation relies on the backend existence check alone.
        let known: &[String] = if i % 2 == 0 { &used } else { &[] };
        let slug = engine
            .persist_entry(PersistArgs::new(&posts, &entry).used_slugs(known))
            .await
            .unwrap();
        used.push(slug);
    }

    let distinct: BTreeSet<&String> = used.iter().collect();
    assert_eq!(distinct.len(), used.len());
    assert_eq!(used[0], "same-title");
    assert_eq!(used[5], "same-title-5");
    assert_eq!(backend.paths().await.len(), 6);
}

#[tokio::test]
async fn editing_keeps_the_slug_and_reports_update() {
    let backend = Arc::new(MemoryBackend::new().with_file("content/posts/first.md", "---\ntitle: First\n---\n"));
    let engine = posts_engine(backend.clone()).await;
    let mut session = EditorSession::new(engine);

    session.open_entry("posts", "first").await.unwrap();
    session.change_field("title", json!("Renamed"), None);
    assert_eq!(session.persist().await.unwrap(), "first");
    assert_eq!(
        backend.file("content/posts/first.md").await.as_deref(),
        Some("---\ntitle: Renamed\n---\n")
    );
    assert_eq!(backend.commits().await, vec!["Update Post “first”".to_string()]);
}
