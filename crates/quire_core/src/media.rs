//! Media folder resolution.
//!
//! Uploads go to the global `media_folder` unless a field, a file of a files
//! collection, or the collection overrides it (most specific wins). An
//! override starting with `/` is relative to the repository root; any other
//! override is relative to the folder of the entry it belongs to.
//!
//! Overrides may use `{{media_folder}}`, `{{public_folder}}`, the file
//! fields `{{dirname}}`/`{{filename}}`/`{{extension}}` and entry data.

use serde_json::Value;

use crate::collection::{Collection, Field};
use crate::config::CmsConfig;
use crate::entry::{AssetProxy, Entry};
use crate::template::{self, TemplateDate};

#[derive(Clone, Copy)]
enum Folder {
    Media,
    Public,
}

fn field_override(field: &Field, kind: Folder) -> Option<&str> {
    match kind {
        Folder::Media => field.media_folder.as_deref(),
        Folder::Public => field.public_folder.as_deref(),
    }
}

/// Most specific folder override for `kind`.
fn folder_override<'a>(
    collection: &'a Collection,
    entry: Option<&Entry>,
    field: Option<&'a Field>,
    kind: Folder,
) -> Option<&'a str> {
    if let Some(folder) = field.and_then(|f| field_override(f, kind)) {
        return Some(folder);
    }
    let file = entry.and_then(|e| collection.file_for_slug(&e.slug));
    let file_folder = file.and_then(|f| match kind {
        Folder::Media => f.media_folder.as_deref(),
        Folder::Public => f.public_folder.as_deref(),
    });
    file_folder.or(match kind {
        Folder::Media => collection.media_folder.as_deref(),
        Folder::Public => collection.public_folder.as_deref(),
    })
}

fn render(template: &str, config: &CmsConfig, collection: &Collection, entry: Option<&Entry>) -> String {
    let (path, data, slug) = match entry {
        Some(entry) => (entry.path.as_str(), &entry.data, entry.slug.as_str()),
        None => ("", &Value::Null, ""),
    };
    let mut data = template::add_file_template_fields(path, data, collection.folder.as_deref().unwrap_or_default());
    if !data.is_object() {
        data = Value::Object(Default::default());
    }
    data["media_folder"] = config.media_folder.clone().into();
    data["public_folder"] = global_public_folder(config).into();
    template::compile_string_template(template, TemplateDate::Disabled, slug, &data, None)
        .unwrap_or_else(|_| template.to_string())
}

/// Join path parts, resolving `.` and `..` segments and dropping empties.
pub fn join_path(parts: &[&str]) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in parts.iter().flat_map(|p| p.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}

fn dirname(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or_default()
}

/// Folder that entry-relative media resolves against.
fn entry_base(collection: &Collection, entry: Option<&Entry>) -> String {
    match entry {
        Some(entry) if !entry.path.is_empty() => dirname(&entry.path).to_string(),
        Some(entry) => collection
            .entry_path(&entry.slug)
            .filter(|_| !entry.slug.is_empty())
            .map(|p| dirname(&p).to_string())
            .or_else(|| collection.folder.clone())
            .unwrap_or_default(),
        None => collection.folder.clone().unwrap_or_default(),
    }
}

fn global_public_folder(config: &CmsConfig) -> String {
    match &config.public_folder {
        Some(public) => public.clone(),
        None => format!("/{}", config.media_folder.trim_matches('/')),
    }
}

/// Repository folder for media of `entry`'s `field`.
pub fn media_folder(
    config: &CmsConfig,
    collection: Option<&Collection>,
    entry: Option<&Entry>,
    field: Option<&Field>,
) -> String {
    let global = join_path(&[&config.media_folder]);
    let Some(collection) = collection else {
        return global;
    };
    let Some(template) = folder_override(collection, entry, field, Folder::Media) else {
        return global;
    };
    let rendered = render(template, config, collection, entry);
    if rendered.starts_with('/') {
        join_path(&[&rendered])
    } else {
        join_path(&[&entry_base(collection, entry), &rendered])
    }
}

/// Whether media of `collection` lives next to its entries.
pub fn is_entry_relative(collection: &Collection, entry: Option<&Entry>, field: Option<&Field>) -> bool {
    folder_override(collection, entry, field, Folder::Media).is_some_and(|f| !f.starts_with('/'))
}

/// Public URL prefix for media of `entry`'s `field`.
///
/// A collection-level media override without a public override yields the
/// media override itself, so entry-relative media is referenced relatively.
pub fn public_folder(
    config: &CmsConfig,
    collection: Option<&Collection>,
    entry: Option<&Entry>,
    field: Option<&Field>,
) -> String {
    let Some(collection) = collection else {
        return global_public_folder(config);
    };
    let template = folder_override(collection, entry, field, Folder::Public)
        .or_else(|| folder_override(collection, entry, field, Folder::Media));
    match template {
        Some(template) => render(template, config, collection, entry),
        None => global_public_folder(config),
    }
}

/// Value written into entry data for a media file named `name`.
pub fn public_path(
    config: &CmsConfig,
    collection: Option<&Collection>,
    entry: Option<&Entry>,
    field: Option<&Field>,
    name: &str,
) -> String {
    let folder = public_folder(config, collection, entry, field);
    let joined = join_path(&[&folder, name]);
    if folder.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Repository path for an upload named `name`.
pub fn media_file_path(
    config: &CmsConfig,
    collection: Option<&Collection>,
    entry: Option<&Entry>,
    field: Option<&Field>,
    name: &str,
) -> String {
    join_path(&[&media_folder(config, collection, entry, field), name])
}

/// Move entry-relative assets next to the entry's final path.
///
/// Draft uploads of a new entry were placed before the entry had a path;
/// once the path is known their target is recomputed.
pub fn rewrite_asset_paths(config: &CmsConfig, collection: &Collection, entry: &Entry, assets: &mut [AssetProxy]) {
    for asset in assets {
        let field = asset.field.as_deref().and_then(|key| collection.select_field(key));
        if !is_entry_relative(collection, Some(entry), field) {
            continue;
        }
        let name = asset.path.rsplit('/').next().unwrap_or_default().to_string();
        let target = media_file_path(config, Some(collection), Some(entry), field, &name);
        if target != asset.path {
            tracing::debug!(from = %asset.path, to = %target, "moving draft asset next to entry");
            asset.path = target;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{posts_collection, posts_config};

    fn entry() -> Entry {
        Entry::new("posts", "hello", "content/posts/hello/index.md")
    }

    #[test]
    fn join_path_normalizes() {
        assert_eq!(join_path(&["content/posts/", "./img"]), "content/posts/img");
        assert_eq!(join_path(&["content/posts", "../shared"]), "content/shared");
        assert_eq!(join_path(&["/static/", "a.png"]), "static/a.png");
    }

    #[test]
    fn global_folder_without_overrides() {
        let config = posts_config();
        let posts = posts_collection();
        assert_eq!(media_folder(&config, Some(&posts), Some(&entry()), None), "static/media");
        assert_eq!(public_folder(&config, Some(&posts), None, None), "/static/media");
        assert_eq!(
            public_path(&config, Some(&posts), None, None, "a.png"),
            "/static/media/a.png"
        );
    }

    #[test]
    fn collection_override_relative_to_entry() {
        let config = posts_config();
        let mut posts = posts_collection();
        posts.media_folder = Some("img".into());
        assert_eq!(
            media_folder(&config, Some(&posts), Some(&entry()), None),
            "content/posts/hello/img"
        );
        assert_eq!(media_folder(&config, Some(&posts), None, None), "content/posts/img");
        assert_eq!(public_path(&config, Some(&posts), None, None, "a.png"), "img/a.png");
    }

    #[test]
    fn absolute_and_templated_overrides() {
        let config = posts_config();
        let mut posts = posts_collection();
        posts.media_folder = Some("/{{media_folder}}/posts/{{filename}}".into());
        let e = Entry::new("posts", "hello", "content/posts/hello.md");
        assert_eq!(
            media_folder(&config, Some(&posts), Some(&e), None),
            "static/media/posts/hello"
        );
    }

    #[test]
    fn field_override_wins() {
        let config = posts_config();
        let mut posts = posts_collection();
        posts.media_folder = Some("img".into());
        let mut field = Field::new("cover").widget("image");
        field.media_folder = Some("/uploads/covers".into());
        assert_eq!(
            media_folder(&config, Some(&posts), Some(&entry()), Some(&field)),
            "uploads/covers"
        );
    }

    #[test]
    fn assets_follow_the_final_entry_path() {
        let config = posts_config();
        let mut posts = posts_collection();
        posts.media_folder = Some("".into());
        let mut assets = vec![AssetProxy {
            path: "content/posts/a.png".into(),
            content: Some(vec![1]),
            field: None,
        }];
        rewrite_asset_paths(&config, &posts, &entry(), &mut assets);
        assert_eq!(assets[0].path, "content/posts/hello/a.png");
    }
}
