//! Entry file formats.
//!
//! A [`Format`] turns a file body into [`EntryData`] and back. Encoders
//! order top-level keys by the collection's field order and, where the syntax
//! allows it, emit field comments above their keys.

mod frontmatter;
mod json;
mod toml;
mod yaml;

pub use frontmatter::{FrontmatterFormat, FrontmatterLanguage};
pub use json::JsonFormat;
pub use toml::TomlFormat;
pub use yaml::YamlFormat;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::collection::Collection;
use crate::error::Result;
use crate::value::EntryData;

/// A bidirectional codec between file bodies and entry data.
pub trait Format: Send + Sync {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Decode a file body.
    fn from_file(&self, content: &str) -> Result<EntryData>;

    /// Encode entry data.
    ///
    /// Keys listed in `field_order` come first, in that order, followed by
    /// the remaining keys. `comments` maps dotted field names to comments.
    fn to_file(
        &self,
        data: &EntryData,
        field_order: &[String],
        comments: &IndexMap<String, String>,
    ) -> Result<String>;
}

/// Format setting of a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatKind {
    /// YAML file, `.yml`
    Yml,
    /// YAML file, `.yml`
    Yaml,
    /// TOML file
    Toml,
    /// JSON file
    Json,
    /// Markdown with front matter in any supported language
    #[default]
    Frontmatter,
    /// Markdown with YAML front matter (`---`)
    YamlFrontmatter,
    /// Markdown with TOML front matter (`+++`)
    TomlFrontmatter,
    /// Markdown with JSON front matter (`{ }`)
    JsonFrontmatter,
}

impl FormatKind {
    /// Default file extension.
    pub fn extension(self) -> &'static str {
        match self {
            FormatKind::Yml | FormatKind::Yaml => "yml",
            FormatKind::Toml => "toml",
            FormatKind::Json => "json",
            _ => "md",
        }
    }

    /// Codec for this format.
    pub fn codec(self) -> &'static dyn Format {
        match self {
            FormatKind::Yml | FormatKind::Yaml => &YamlFormat,
            FormatKind::Toml => &TomlFormat,
            FormatKind::Json => &JsonFormat,
            FormatKind::Frontmatter => &FrontmatterFormat::INFER,
            FormatKind::YamlFrontmatter => &FrontmatterFormat::YAML,
            FormatKind::TomlFrontmatter => &FrontmatterFormat::TOML,
            FormatKind::JsonFrontmatter => &FrontmatterFormat::JSON,
        }
    }
}

/// Codec for a file extension, if one is known.
pub fn format_for_extension(extension: &str) -> Option<&'static dyn Format> {
    let kind = match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "yml" | "yaml" => FormatKind::Yaml,
        "toml" => FormatKind::Toml,
        "json" => FormatKind::Json,
        "md" | "markdown" | "html" => FormatKind::Frontmatter,
        _ => return None,
    };
    Some(kind.codec())
}

/// Pick the codec for an entry of `collection`.
///
/// An explicit collection format wins, then the extension of `path`, then
/// the collection extension. Front matter is the fallback.
pub fn resolve_format(collection: &Collection, path: Option<&str>) -> &'static dyn Format {
    if let Some(kind) = collection.format {
        return kind.codec();
    }
    path.and_then(|p| p.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.contains('/'))
        .and_then(format_for_extension)
        .or_else(|| collection.extension.as_deref().and_then(format_for_extension))
        .unwrap_or(&FrontmatterFormat::INFER)
}

/// Reorder the top level of `data`: `field_order` keys first, then the rest.
pub(crate) fn ordered(data: &EntryData, field_order: &[String]) -> EntryData {
    let EntryData::Object(map) = data else {
        return data.clone();
    };
    let mut out = Map::new();
    for key in field_order {
        if let Some(value) = map.get(key) {
            out.insert(key.clone(), value.clone());
        }
    }
    for (key, value) in map {
        if !out.contains_key(key) {
            out.insert(key.clone(), value.clone());
        }
    }
    EntryData::Object(out)
}

/// Insert `# comment` lines above top-level keys of a line-oriented document.
///
/// `is_key_line` reports which top-level key a line starts, if any.
pub(crate) fn insert_comments(
    text: &str,
    comments: &IndexMap<String, String>,
    is_key_line: impl Fn(&str) -> Option<&str>,
) -> String {
    if comments.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if let Some(comment) = is_key_line(line).and_then(|key| comments.get(key)) {
            for comment_line in comment.lines() {
                out.push_str("# ");
                out.push_str(comment_line);
                out.push('\n');
            }
        }
        out.push_str(line);
    }
    out
}

/// An empty document decodes to an empty object; anything else must be one.
pub(crate) fn expect_object(format: &str, value: EntryData) -> Result<EntryData> {
    match value {
        EntryData::Null => Ok(crate::value::empty_data()),
        EntryData::Object(_) => Ok(value),
        other => Err(crate::error::QuireError::format(
            format,
            format!("expected a mapping at the top level, found {other}"),
        )),
    }
}
