//! `{{placeholder}}` string templates.
//!
//! Used for slugs, entry paths, summaries and commit messages. A placeholder
//! is a data key (dotted for nesting, `fields.` prefix to force a data lookup),
//! a date part (`year`, `month`, `day`, `hour`, `minute`, `second`) or `slug`,
//! optionally followed by a filter:
//!
//! ```text
//! {{title | upper}}   {{date | date('YYYY-MM')}}   {{draft | ternary('D', 'P')}}
//! {{body | truncate(20, '…')}}   {{author | default('anon')}}
//! {{path | split('/', '$2-$1')}}
//! ```

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::{Captures, Regex};
use serde_json::Map;

use crate::error::{QuireError, Result};
use crate::value::{EntryData, get_at_path, is_truthy, key_to_path, value_to_string};

const FIELD_PREFIX: &str = "fields.";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^}{|]+?)\s*(?:\|\s*([^}{]+?))?\s*\}\}").expect("placeholder regex")
});

static FILTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:(upper|lower)|date\('(.+)'\)|default\('(.+)'\)|ternary\('(.*)',\s*'(.*)'\)|truncate\((\d+)(?:,\s*['"]([^'"]*)['"])?\)|split\('(.+)',\s*'(.+)'\))$"#,
    )
    .expect("filter regex")
});

/// How date placeholders are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateDate {
    /// Use this instant
    At(DateTime<Utc>),
    /// No date available; a date placeholder is an error
    Missing,
    /// Date placeholders render empty
    Disabled,
}

fn date_part(key: &str, date: &DateTime<Utc>) -> Option<String> {
    let format = match key {
        "year" => "%Y",
        "month" => "%m",
        "day" => "%d",
        "hour" => "%H",
        "minute" => "%M",
        "second" => "%S",
        _ => return None,
    };
    Some(date.format(format).to_string())
}

fn is_date_key(key: &str) -> bool {
    matches!(key, "year" | "month" | "day" | "hour" | "minute" | "second")
}

/// Render `template` against entry data.
///
/// `identifier` fills `{{slug}}`. When `processor` is given it replaces the
/// filter step and receives every resolved value. Unknown keys render empty.
pub fn compile_string_template(
    template: &str,
    date: TemplateDate,
    identifier: &str,
    data: &EntryData,
    processor: Option<&dyn Fn(&str) -> String>,
) -> Result<String> {
    let mut missing_date = false;
    let compiled = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let key = caps[1].trim();
        let filter = caps.get(2).map(|m| m.as_str().trim());

        let value = if let Some(explicit) = explicit_field(key, data) {
            explicit
        } else if is_date_key(key) {
            match date {
                TemplateDate::At(date) => EntryData::String(date_part(key, &date).unwrap_or_default()),
                TemplateDate::Missing => {
                    missing_date = true;
                    return String::new();
                }
                TemplateDate::Disabled => return String::new(),
            }
        } else if key == "slug" {
            EntryData::String(identifier.to_string())
        } else {
            get_at_path(data, &key_to_path(key))
                .cloned()
                .unwrap_or(EntryData::Null)
        };

        match processor {
            Some(processor) => processor(&value_to_string(&value)),
            None => match filter {
                Some(filter) => apply_filter(filter, &value),
                None => value_to_string(&value),
            },
        }
    });
    if missing_date {
        return Err(QuireError::MissingRequiredDate);
    }
    Ok(compiled.into_owned())
}

fn explicit_field(key: &str, data: &EntryData) -> Option<EntryData> {
    let key = key.strip_prefix(FIELD_PREFIX)?;
    let value = get_at_path(data, &key_to_path(key))?;
    let value = match value {
        EntryData::Object(_) | EntryData::Array(_) => EntryData::String(value.to_string()),
        other => other.clone(),
    };
    is_truthy(&value).then_some(value)
}

fn apply_filter(filter: &str, value: &EntryData) -> String {
    let text = value_to_string(value);
    let Some(caps) = FILTER.captures(filter) else {
        tracing::warn!(filter, "unknown template filter");
        return text;
    };
    if let Some(case) = caps.get(1) {
        return if case.as_str() == "upper" {
            text.to_uppercase()
        } else {
            text.to_lowercase()
        };
    }
    if let Some(format) = caps.get(2) {
        return parse_date(&text)
            .map(|d| format_moment(&d, format.as_str()))
            .unwrap_or_default();
    }
    if let Some(default) = caps.get(3) {
        return if is_truthy(value) { text } else { default.as_str().to_string() };
    }
    if let (Some(yes), Some(no)) = (caps.get(4), caps.get(5)) {
        return if is_truthy(value) { yes.as_str() } else { no.as_str() }.to_string();
    }
    if let Some(length) = caps.get(6) {
        let length: usize = length.as_str().parse().unwrap_or(usize::MAX);
        let omission = caps.get(7).map_or("...", |m| m.as_str());
        return truncate(&text, length, omission);
    }
    if let (Some(separator), Some(pattern)) = (caps.get(8), caps.get(9)) {
        let parts: Vec<&str> = text.split(separator.as_str()).collect();
        let mut out = pattern.as_str().to_string();
        for (i, part) in parts.iter().enumerate().rev() {
            out = out.replace(&format!("${}", i + 1), part);
        }
        return out;
    }
    text
}

fn truncate(text: &str, length: usize, omission: &str) -> String {
    if text.chars().count() <= length + omission.chars().count() {
        return text.to_string();
    }
    let mut out: String = text.chars().take(length).collect();
    out.push_str(omission);
    out
}

/// Keys referenced by a template, in order of appearance.
pub fn extract_template_vars(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| {
            let key = caps[1].trim();
            key.strip_prefix(FIELD_PREFIX).unwrap_or(key).to_string()
        })
        .collect()
}

// ============================================================================
// Dates
// ============================================================================

/// Parse a date the way entry data usually stores one.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` (UTC assumed), `YYYY-MM-DD HH:MM[:SS]`
/// and `YYYY-MM-DD`.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

/// Date stored in the entry's `field`, if it parses.
pub fn parse_date_from_entry(data: &EntryData, field: &str) -> Option<DateTime<Utc>> {
    let value = get_at_path(data, &key_to_path(field))?;
    parse_date(value.as_str()?)
}

/// Format `date` with a moment-style pattern (`YYYY-MM-DD`, `MMM D`, `[at] HH:mm`).
pub fn format_moment(date: &DateTime<Utc>, pattern: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("M", "%-m"),
        ("DD", "%d"),
        ("D", "%-d"),
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("HH", "%H"),
        ("H", "%-H"),
        ("hh", "%I"),
        ("h", "%-I"),
        ("mm", "%M"),
        ("m", "%-M"),
        ("ss", "%S"),
        ("s", "%-S"),
        ("A", "%p"),
        ("a", "%P"),
        ("Z", "%:z"),
    ];

    let mut strftime = String::new();
    let mut rest = pattern;
    'outer: while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(end) = rest.find(']') {
                strftime.push_str(&rest[1..end].replace('%', "%%"));
                rest = &rest[end + 1..];
                continue;
            }
        }
        for (token, spec) in TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                strftime.push_str(spec);
                rest = after;
                continue 'outer;
            }
        }
        if c == '%' {
            strftime.push_str("%%");
        } else {
            strftime.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    date.format(&strftime).to_string()
}

// ============================================================================
// Data helpers
// ============================================================================

/// Copy of `data` with `dirname`, `filename` and `extension` of `path` added.
///
/// `dirname` is relative to `folder`.
pub fn add_file_template_fields(path: &str, data: &EntryData, folder: &str) -> EntryData {
    if path.is_empty() {
        return data.clone();
    }
    let (dir, file) = path.rsplit_once('/').unwrap_or(("", path));
    let (filename, extension) = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext),
        _ => (file, ""),
    };
    let folder = folder.trim_matches('/');
    let dir = dir.trim_start_matches('/');
    let dirname = if folder.is_empty() {
        dir
    } else {
        dir.strip_prefix(folder)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(dir)
    };

    let mut map = match data {
        EntryData::Object(map) => map.clone(),
        _ => Map::new(),
    };
    map.insert("dirname".into(), dirname.into());
    map.insert("filename".into(), filename.into());
    map.insert("extension".into(), extension.into());
    EntryData::Object(map)
}

/// Expand `*` segments of a dotted path over the array indices present in `data`.
///
/// `authors.*.name` with two authors becomes `authors.0.name`, `authors.1.name`.
pub fn expand_path(data: &EntryData, path: &str) -> Vec<String> {
    let mut out = Vec::new();
    expand_into(data, path, &mut out);
    out
}

fn expand_into(data: &EntryData, path: &str, out: &mut Vec<String>) {
    let segments: Vec<&str> = path.split('.').collect();
    let Some(star) = segments.iter().position(|s| *s == "*") else {
        out.push(path.to_string());
        return;
    };
    let head = &segments[..star];
    let tail = segments[star + 1..].join(".");
    if let Some(EntryData::Array(items)) = get_at_path(data, head) {
        for index in 0..items.len() {
            let mut expanded = head.join(".");
            if !expanded.is_empty() {
                expanded.push('.');
            }
            expanded.push_str(&index.to_string());
            if !tail.is_empty() {
                expanded.push('.');
                expanded.push_str(&tail);
            }
            expand_into(data, &expanded, out);
        }
    }
}
