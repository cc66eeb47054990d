//! Multi-locale entries written through the engine and read back.

mod common;

use std::sync::Arc;

use serde_json::json;

use quire_core::backend::MemoryBackend;
use quire_core::engine::PersistArgs;
use quire_core::{CmsConfig, Entry};

const ALL_LOCALES: [&str; 5] = ["en", "de", "fr", "es", "it"];

fn config(structure: &str, locales: &[&str]) -> CmsConfig {
    let yaml = format!(
        r#"
backend:
  name: test-repo
i18n:
  structure: {structure}
  locales: [{}]
collections:
  - name: posts
    label_singular: Post
    folder: content/posts
    extension: md
    format: frontmatter
    create: true
    i18n: true
    fields:
      - {{ name: title, i18n: true }}
      - {{ name: body, widget: markdown, required: false, i18n: true }}
"#,
        locales.join(", ")
    );
    CmsConfig::from_yaml_str(&yaml).unwrap()
}

/// An entry with data for every locale except the last one of a
/// multi-locale set, which stays untranslated.
fn entry(locales: &[&str]) -> Entry {
    let mut entry = Entry::new("posts", "", "").with_data(json!({"title": "Hello", "body": "en body\n"}));
    entry.new_record = true;
    let translated = if locales.len() > 1 { &locales[1..locales.len() - 1] } else { &[][..] };
    for locale in translated {
        entry
            .locale_variants
            .insert(locale.to_string(), json!({"title": format!("Hello {locale}")}));
    }
    entry
}

async fn round_trip(structure: &str, locales: &[&str]) -> (Arc<MemoryBackend>, Entry, Entry) {
    let backend = Arc::new(MemoryBackend::new());
    let engine = common::engine(config(structure, locales), backend.clone()).await;
    let posts = engine.collection("posts").unwrap().clone();
    let written = entry(locales);
    let slug = engine.persist_entry(PersistArgs::new(&posts, &written)).await.unwrap();
    let read = engine.get_entry(&posts, &slug).await.unwrap();

    let listed = engine.list_all_entries(&posts).await.unwrap();
    assert_eq!(listed.len(), 1, "{structure} {locales:?}");
    assert_eq!(listed[0].locale_variants, read.locale_variants);
    (backend, written, read)
}

#[tokio::test]
async fn multiple_folders_round_trip() {
    for n in [1, 2, 5] {
        let locales = &ALL_LOCALES[..n];
        let (backend, written, read) = round_trip("multiple_folders", locales).await;
        assert_eq!(read.data, written.data);
        assert_eq!(read.locale_variants, written.locale_variants);
        assert_eq!(read.path, "content/posts/hello.md");
        assert!(backend.file("content/posts/en/hello.md").await.is_some());
        if n > 1 {
            let absent = locales[n - 1];
            assert!(backend.file(&format!("content/posts/{absent}/hello.md")).await.is_none());
        }
    }
}

#[tokio::test]
async fn multiple_files_round_trip() {
    for n in [1, 2, 5] {
        let locales = &ALL_LOCALES[..n];
        let (backend, written, read) = round_trip("multiple_files", locales).await;
        assert_eq!(read.data, written.data);
        assert_eq!(read.locale_variants, written.locale_variants);
        assert!(backend.file("content/posts/hello.en.md").await.is_some());
        assert_eq!(backend.paths().await.len(), n.saturating_sub(1).max(1));
    }
}

#[tokio::test]
async fn single_file_round_trip() {
    for n in [1, 2, 5] {
        let locales = &ALL_LOCALES[..n];
        let (backend, written, read) = round_trip("single_file", locales).await;
        assert_eq!(read.data, written.data);
        assert_eq!(read.locale_variants, written.locale_variants);
        assert_eq!(backend.paths().await, vec!["content/posts/hello.md".to_string()]);
    }
}

#[tokio::test]
async fn deleting_removes_every_locale_file() {
    let (backend, _, read) = round_trip("multiple_files", &ALL_LOCALES).await;
    let engine = common::engine(config("multiple_files", &ALL_LOCALES), backend.clone()).await;
    let posts = engine.collection("posts").unwrap().clone();
    engine.delete_entry(&posts, &read.slug).await.unwrap();
    assert!(backend.paths().await.is_empty());
}
