//! Local fuzzy search over listed entries.
//!
//! Matching is a case-insensitive subsequence test. Each matched character
//! scores `1 + run` where `run` doubles along a consecutive streak, so
//! contiguous matches dominate; an exact match scores infinity.
//!
//! [`query_entries`] expands list-valued search fields (`authors.*.name`)
//! into one candidate per element, then merges hits back per entry keeping
//! only the list elements that matched.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::entry::Entry;
use crate::template::expand_path;
use crate::value::{EntryData, get_at_path, is_truthy, key_to_path, set_at_path, value_to_string};

/// Scores at or below this are dropped from global search results.
pub const MIN_SEARCH_SCORE: f64 = 5.0;

/// Score `text` against `pattern`, `None` when `pattern` is not a
/// subsequence of `text`.
pub fn fuzzy_score(pattern: &str, text: &str) -> Option<f64> {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let mut index = 0;
    let mut total = 0.0;
    let mut run = 0.0;
    for ch in &text {
        if pattern.get(index) == Some(ch) {
            index += 1;
            run += 1.0 + run;
        } else {
            run = 0.0;
        }
        total += run;
    }
    if index < pattern.len() {
        return None;
    }
    Some(if text == pattern { f64::INFINITY } else { total })
}

/// Text of `field` in `entry`; falls back to entry attributes (`slug`,
/// `path`, `collection`) so those can be searched too.
pub fn entry_field(entry: &Entry, field: &str) -> String {
    match get_at_path(&entry.data, &key_to_path(field)) {
        Some(value) if is_truthy(value) => value_to_string(value),
        _ => match field.split('.').next().unwrap_or_default() {
            "slug" => entry.slug.clone(),
            "path" => entry.path.clone(),
            "collection" => entry.collection.clone(),
            _ => String::new(),
        },
    }
}

/// Every field value of `entry`, space separated.
pub fn search_text(entry: &Entry, fields: &[String]) -> String {
    fields.iter().fold(String::new(), |mut acc, field| {
        let value = entry_field(entry, field);
        if !value.is_empty() {
            acc.push(' ');
            acc.push_str(&value);
        }
        acc
    })
}

struct Hit<T> {
    score: f64,
    item: T,
}

fn rank<T>(mut hits: Vec<Hit<T>>) -> Vec<T> {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.into_iter().map(|h| h.item).collect()
}

/// Entries matching `term` in any of their collection's search fields,
/// best first. Low scores are dropped.
pub fn search_entries<'a, I>(groups: I, term: &str) -> Vec<Entry>
where
    I: IntoIterator<Item = (&'a [String], Vec<Entry>)>,
{
    let mut hits = Vec::new();
    for (fields, entries) in groups {
        for entry in entries {
            if let Some(score) = fuzzy_score(term, &search_text(&entry, fields))
                && score > MIN_SEARCH_SCORE
            {
                hits.push(Hit { score, item: entry });
            }
        }
    }
    rank(hits)
}

/// One search candidate: an entry and the concrete field path searched.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedEntry {
    /// The entry
    pub entry: Entry,
    /// Concrete field path (wildcards resolved)
    pub field: String,
}

/// One candidate per entry and concrete field path.
pub fn expand_search_entries(entries: &[Entry], fields: &[String]) -> Vec<ExpandedEntry> {
    let mut out = Vec::new();
    for entry in entries {
        for field in fields {
            for path in expand_path(&entry.data, field) {
                out.push(ExpandedEntry {
                    entry: entry.clone(),
                    field: path,
                });
            }
        }
    }
    out
}

/// Fold hits back into one entry per slug, in hit order.
///
/// Lists traversed by a matching path keep only their matching elements,
/// ordered by which element matched first.
pub fn merge_expanded_entries(hits: Vec<ExpandedEntry>) -> Vec<Entry> {
    let fields: Vec<String> = hits.iter().map(|h| h.field.clone()).collect();
    let mut merged: Vec<(Entry, BTreeSet<String>)> = Vec::new();

    for hit in hits {
        let index = match merged.iter().position(|(e, _)| e.slug == hit.entry.slug) {
            Some(index) => index,
            None => {
                merged.push((hit.entry, BTreeSet::new()));
                merged.len() - 1
            }
        };
        let (entry, array_paths) = &mut merged[index];
        let segments: Vec<&str> = hit.field.split('.').collect();
        // Only lists the path descends into are narrowed.
        for end in 1..segments.len() {
            if let Some(EntryData::Array(_)) = get_at_path(&entry.data, &segments[..end]) {
                array_paths.insert(segments[..end].join("."));
            }
        }
    }

    merged
        .into_iter()
        .map(|(mut entry, array_paths)| {
            for path in array_paths {
                let segments = key_to_path(&path);
                let Some(EntryData::Array(items)) = get_at_path(&entry.data, &segments) else {
                    continue;
                };
                let first_match = |index: usize| {
                    let prefix = format!("{path}.{index}.");
                    fields.iter().position(|f| format!("{f}.").starts_with(&prefix))
                };
                let mut kept: Vec<(usize, EntryData)> = items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| first_match(i).map(|rank| (rank, item.clone())))
                    .collect();
                kept.sort_by_key(|(rank, _)| *rank);
                let filtered = kept.into_iter().map(|(_, item)| item).collect();
                set_at_path(&mut entry.data, &segments, EntryData::Array(filtered));
            }
            entry
        })
        .collect()
}

/// Result of [`query_entries`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// The search term
    pub query: String,
    /// Matching entries, best first
    pub hits: Vec<Entry>,
}

/// Search `fields` of `entries` for `term`.
///
/// `file` restricts the search to the entry with that slug; `limit` caps the
/// number of expanded hits before merging.
pub fn query_entries(
    entries: Vec<Entry>,
    fields: &[String],
    term: &str,
    file: Option<&str>,
    limit: Option<usize>,
) -> QueryResult {
    let entries: Vec<Entry> = match file {
        Some(slug) => entries.into_iter().filter(|e| e.slug == slug).collect(),
        None => entries,
    };
    let hits = expand_search_entries(&entries, fields)
        .into_iter()
        .filter_map(|candidate| {
            let text = entry_field(&candidate.entry, &candidate.field);
            fuzzy_score(term, &text).map(|score| Hit {
                score,
                item: candidate,
            })
        })
        .collect();
    let mut ranked = rank(hits);
    if let Some(limit) = limit.filter(|l| *l > 0) {
        ranked.truncate(limit);
    }
    QueryResult {
        query: term.to_string(),
        hits: merge_expanded_entries(ranked),
    }
}
