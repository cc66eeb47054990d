//! Slug generation and sanitization.
//!
//! A slug is derived from the collection's slug template, with every
//! placeholder value passed through [`prepare_slug`] and [`sanitize_slug`].
//! Collections with a `path` template then place the slug inside that path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::collection::Collection;
use crate::error::{QuireError, Result};
use crate::template::{TemplateDate, compile_string_template};
use crate::value::{EntryData, get_at_path, is_truthy, key_to_path, value_to_string};

/// Characters a URI accepts without escaping.
const URI_CHARS: &[char] = &['-', '_', '.', '~'];

/// Characters no file system accepts in a name.
const FILENAME_ILLEGAL_CHARS: &[char] = &['/', '?', '<', '>', '\\', ':', '*', '|', '"'];

/// Names Windows reserves regardless of extension.
const WINDOWS_RESERVED: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Longest file name most file systems accept, in bytes.
const MAX_FILENAME_BYTES: usize = 255;

/// Which characters survive in a slug.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlugEncoding {
    /// Letters and digits of any script
    #[default]
    Unicode,
    /// ASCII letters and digits only
    Ascii,
}

/// Slug settings from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlugConfig {
    /// Allowed character set
    #[serde(default)]
    pub encoding: SlugEncoding,
    /// Strip accents before sanitizing (`é` becomes `e`)
    #[serde(default)]
    pub clean_accents: bool,
    /// Replacement for rejected characters
    #[serde(default = "default_replacement")]
    pub sanitize_replacement: String,
}

fn default_replacement() -> String {
    "-".to_string()
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self {
            encoding: SlugEncoding::Unicode,
            clean_accents: false,
            sanitize_replacement: default_replacement(),
        }
    }
}

/// Normalize a raw value before sanitizing: trim, lowercase, drop single
/// quotes, turn periods into dashes.
pub fn prepare_slug(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .replace('\'', "")
        .replace('.', "-")
}

fn is_valid_char(c: char, encoding: SlugEncoding) -> bool {
    if c.is_ascii_alphanumeric() || URI_CHARS.contains(&c) {
        return true;
    }
    match encoding {
        SlugEncoding::Ascii => false,
        SlugEncoding::Unicode => (c as u32) >= 0xA0 && !c.is_whitespace() && !c.is_control(),
    }
}

fn sanitize_uri(value: &str, config: &SlugConfig) -> String {
    value
        .chars()
        .map(|c| {
            if is_valid_char(c, config.encoding) {
                c.to_string()
            } else {
                config.sanitize_replacement.clone()
            }
        })
        .collect()
}

fn sanitize_filename(value: &str, replacement: &str) -> String {
    let mut out: String = value
        .chars()
        .map(|c| {
            if FILENAME_ILLEGAL_CHARS.contains(&c) || c.is_control() {
                replacement.to_string()
            } else {
                c.to_string()
            }
        })
        .collect();
    if out == "." || out == ".." {
        out = replacement.to_string();
    }
    let stem = out.split('.').next().unwrap_or_default();
    if WINDOWS_RESERVED.contains(&stem.to_lowercase().as_str()) {
        out = replacement.to_string();
    }
    let trimmed_len = out.trim_end_matches(['.', ' ']).len();
    if trimmed_len < out.len() {
        out.truncate(trimmed_len);
        out.push_str(replacement);
    }
    if out.len() > MAX_FILENAME_BYTES {
        let mut end = MAX_FILENAME_BYTES;
        while !out.is_char_boundary(end) {
            end -= 1;
        }
        out.truncate(end);
    }
    out
}

fn strip_diacritics(value: &str) -> String {
    value.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

/// Replace characters a slug cannot contain and tidy up replacements.
///
/// Runs of the replacement collapse to one, and leading or trailing
/// replacements are removed.
pub fn sanitize_slug(value: &str, config: &SlugConfig) -> String {
    let value = if config.clean_accents {
        strip_diacritics(value)
    } else {
        value.to_string()
    };
    let replacement = config.sanitize_replacement.as_str();
    let sanitized = sanitize_filename(&sanitize_uri(&value, config), replacement);
    if replacement.is_empty() {
        return sanitized;
    }

    let doubled = replacement.repeat(2);
    let mut collapsed = sanitized;
    while collapsed.contains(&doubled) {
        collapsed = collapsed.replace(&doubled, replacement);
    }
    let trimmed = collapsed
        .strip_prefix(replacement)
        .unwrap_or(&collapsed);
    trimmed
        .strip_suffix(replacement)
        .unwrap_or(trimmed)
        .to_string()
}

/// The string a single rejected character becomes (used for `-1` suffixes).
pub fn sanitize_char(c: char, config: &SlugConfig) -> String {
    if is_valid_char(c, config.encoding) {
        c.to_string()
    } else {
        config.sanitize_replacement.clone()
    }
}

/// Process one template value into a slug segment.
pub fn process_segment(value: &str, config: &SlugConfig) -> String {
    sanitize_slug(&prepare_slug(value), config)
}

/// Slug for new entry data in `collection`.
///
/// The identifier field must have a value. With a `path` template, the
/// result is the rendered path with `{{slug}}` standing for the slug.
pub fn slug_formatter(
    collection: &Collection,
    data: &EntryData,
    config: &SlugConfig,
    now: DateTime<Utc>,
) -> Result<String> {
    let template = collection.slug.as_deref().unwrap_or("{{slug}}");
    let identifier = collection
        .identifier()
        .and_then(|id| get_at_path(data, &key_to_path(&id)).cloned())
        .filter(is_truthy)
        .ok_or_else(|| QuireError::MissingIdentifier(collection.name.clone()))?;

    let process = |value: &str| process_segment(value, config);
    let slug = compile_string_template(
        template,
        TemplateDate::At(now),
        &value_to_string(&identifier),
        data,
        Some(&process),
    )?;

    match &collection.path {
        None => Ok(slug),
        Some(path) => {
            let passthrough = |value: &str| value.to_string();
            compile_string_template(path, TemplateDate::At(now), &slug, data, Some(&passthrough))
        }
    }
}

/// Slug of an entry stored at a custom (meta path) location.
///
/// The collection folder and the extension are removed, keeping the
/// relative folder: `content/pages/about/index.md` gives `about/index`.
pub fn slug_from_custom_path(collection: &Collection, custom_path: &str) -> String {
    let folder = collection.folder.as_deref().unwrap_or_default().to_lowercase();
    let lowered = custom_path.to_lowercase();
    let relative = lowered.strip_prefix(&folder).unwrap_or(&lowered);
    let relative = relative.trim_matches('/');
    let (dir, file) = relative.rsplit_once('/').unwrap_or(("", relative));
    let base = match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    };
    if dir.is_empty() {
        base.to_string()
    } else {
        format!("{dir}/{base}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Field;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap()
    }

    #[test]
    fn prepare_slug_lowercases_and_rewrites_periods() {
        assert_eq!(prepare_slug("  It's v1.2 "), "its v1-2");
    }

    #[test]
    fn sanitize_collapses_and_trims_replacements() {
        let config = SlugConfig::default();
        assert_eq!(sanitize_slug("hello world!", &config), "hello-world");
        assert_eq!(sanitize_slug("  a   b  ", &config), "a-b");
        assert_eq!(sanitize_slug("über café", &config), "über-café");
    }

    #[test]
    fn ascii_encoding_and_clean_accents() {
        let ascii = SlugConfig {
            encoding: SlugEncoding::Ascii,
            ..Default::default()
        };
        assert_eq!(sanitize_slug("über café", &ascii), "ber-caf");

        let clean = SlugConfig {
            encoding: SlugEncoding::Ascii,
            clean_accents: true,
            ..Default::default()
        };
        assert_eq!(sanitize_slug("über café", &clean), "uber-cafe");
    }

    #[test]
    fn custom_replacement() {
        let config = SlugConfig {
            sanitize_replacement: "_".into(),
            ..Default::default()
        };
        assert_eq!(sanitize_slug("a b/c", &config), "a_b_c");
        assert_eq!(sanitize_char(' ', &config), "_");
    }

    #[test]
    fn windows_reserved_names_are_replaced() {
        assert_eq!(sanitize_slug("con", &SlugConfig::default()), "");
    }

    #[test]
    fn formatter_uses_identifier_and_dates() {
        let mut c = Collection::folder("posts", "content/posts");
        c.fields = vec![Field::new("title")];
        c.slug = Some("{{year}}-{{month}}-{{slug}}".into());
        let slug = slug_formatter(&c, &json!({"title": "Hello World"}), &SlugConfig::default(), now());
        assert_eq!(slug.unwrap(), "2024-03-hello-world");
    }

    #[test]
    fn formatter_places_slug_in_path_template() {
        let mut c = Collection::folder("posts", "content/posts");
        c.fields = vec![Field::new("title")];
        c.path = Some("{{year}}/{{slug}}".into());
        let slug = slug_formatter(&c, &json!({"title": "Hi"}), &SlugConfig::default(), now());
        assert_eq!(slug.unwrap(), "2024/hi");
    }

    #[test]
    fn formatter_requires_identifier() {
        let mut c = Collection::folder("posts", "content/posts");
        c.fields = vec![Field::new("title")];
        let err = slug_formatter(&c, &json!({"title": ""}), &SlugConfig::default(), now());
        assert!(matches!(err, Err(QuireError::MissingIdentifier(_))));
    }

    #[test]
    fn slug_from_custom_path_keeps_relative_folder() {
        let c = Collection::folder("pages", "content/pages");
        assert_eq!(slug_from_custom_path(&c, "content/pages/about/index.md"), "about/index");
        assert_eq!(slug_from_custom_path(&c, "content/pages/index.md"), "index");
    }
}
