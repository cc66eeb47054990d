use indexmap::IndexMap;

use super::{Format, expect_object, insert_comments, ordered};
use crate::error::{QuireError, Result};
use crate::value::EntryData;

/// YAML documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFormat;

impl YamlFormat {
    pub(crate) fn parse(content: &str) -> Result<EntryData> {
        let mut content = content.trim_end();
        // a trailing document marker left over from front matter
        if let Some(stripped) = content.strip_suffix("\n---") {
            content = stripped;
        }
        if content.trim().is_empty() {
            return Ok(crate::value::empty_data());
        }
        let value: EntryData =
            serde_yaml_ng::from_str(content).map_err(|e| QuireError::format("yaml", e))?;
        expect_object("yaml", value)
    }

    pub(crate) fn render(
        data: &EntryData,
        field_order: &[String],
        comments: &IndexMap<String, String>,
    ) -> Result<String> {
        let text = serde_yaml_ng::to_string(&ordered(data, field_order))
            .map_err(|e| QuireError::format("yaml", e))?;
        Ok(insert_comments(&text, comments, |line| {
            if line.starts_with([' ', '-', '#']) {
                return None;
            }
            line.split_once(':').map(|(key, _)| key.trim_matches(['"', '\'']))
        }))
    }
}

impl Format for YamlFormat {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn from_file(&self, content: &str) -> Result<EntryData> {
        Self::parse(content)
    }

    fn to_file(
        &self,
        data: &EntryData,
        field_order: &[String],
        comments: &IndexMap<String, String>,
    ) -> Result<String> {
        Self::render(data, field_order, comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_lists_and_nulls_survive() {
        let data = json!({
            "title": "Hello",
            "tags": ["a", "b"],
            "author": {"name": "Sam", "links": [{"url": "https://x"}]},
            "draft": null,
            "count": 3
        });
        let text = YamlFormat.to_file(&data, &[], &IndexMap::new()).unwrap();
        assert_eq!(YamlFormat.from_file(&text).unwrap(), data);
    }

    #[test]
    fn comments_precede_their_keys() {
        let mut comments = IndexMap::new();
        comments.insert("title".to_string(), "Page title".to_string());
        let text = YamlFormat
            .to_file(&json!({"title": "Hi", "n": 1}), &[], &comments)
            .unwrap();
        assert!(text.starts_with("# Page title\ntitle: Hi\n"));
        assert_eq!(YamlFormat.from_file(&text).unwrap(), json!({"title": "Hi", "n": 1}));
    }

    #[test]
    fn empty_body_is_an_empty_object() {
        assert_eq!(YamlFormat.from_file("").unwrap(), json!({}));
        assert!(YamlFormat.from_file("- a\n- b\n").is_err());
    }
}
