use indexmap::IndexMap;
use serde_json::Map;

use super::{Format, JsonFormat, TomlFormat, YamlFormat, ordered};
use crate::error::{QuireError, Result};
use crate::value::EntryData;

/// Data key holding the document body below the front matter.
pub const BODY_KEY: &str = "body";

/// Front matter syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterLanguage {
    /// `---` delimited YAML
    Yaml,
    /// `+++` delimited TOML
    Toml,
    /// A leading JSON object
    Json,
}

/// Markdown (or any text) with front matter.
///
/// The body is exposed as the `body` key. A fixed language reads only that
/// syntax; the inferring variant reads any of them and writes YAML.
#[derive(Debug, Clone, Copy)]
pub struct FrontmatterFormat {
    language: Option<FrontmatterLanguage>,
}

impl FrontmatterFormat {
    /// Detect the language on read, write YAML.
    pub const INFER: Self = Self { language: None };
    /// YAML front matter.
    pub const YAML: Self = Self {
        language: Some(FrontmatterLanguage::Yaml),
    };
    /// TOML front matter.
    pub const TOML: Self = Self {
        language: Some(FrontmatterLanguage::Toml),
    };
    /// JSON front matter.
    pub const JSON: Self = Self {
        language: Some(FrontmatterLanguage::Json),
    };

    fn detect(content: &str) -> Option<FrontmatterLanguage> {
        if content.starts_with("---") {
            Some(FrontmatterLanguage::Yaml)
        } else if content.starts_with("+++") {
            Some(FrontmatterLanguage::Toml)
        } else if content.starts_with('{') {
            Some(FrontmatterLanguage::Json)
        } else {
            None
        }
    }

    /// Split `content` into (front matter data, body).
    fn split(language: FrontmatterLanguage, content: &str) -> Result<Option<(EntryData, String)>> {
        match language {
            FrontmatterLanguage::Yaml => {
                let Some((matter, body)) = split_delimited(content, "---") else {
                    return Ok(None);
                };
                Ok(Some((YamlFormat::parse(matter)?, body.to_string())))
            }
            FrontmatterLanguage::Toml => {
                let Some((matter, body)) = split_delimited(content, "+++") else {
                    return Ok(None);
                };
                Ok(Some((TomlFormat::parse(matter)?, body.to_string())))
            }
            FrontmatterLanguage::Json => {
                let mut stream = serde_json::Deserializer::from_str(content).into_iter::<EntryData>();
                let data = match stream.next() {
                    Some(Ok(data @ EntryData::Object(_))) => data,
                    Some(Err(e)) => return Err(QuireError::format("frontmatter", e)),
                    _ => return Ok(None),
                };
                let rest = &content[stream.byte_offset()..];
                let body = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')).unwrap_or(rest);
                Ok(Some((data, body.to_string())))
            }
        }
    }
}

/// Split `---\n<matter>\n---\n<body>`; `None` when the fence is not closed.
fn split_delimited<'a>(content: &'a str, fence: &str) -> Option<(&'a str, &'a str)> {
    let rest = content.strip_prefix(fence)?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == fence {
            let matter = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((matter, body));
        }
        offset += line.len();
    }
    None
}

impl Format for FrontmatterFormat {
    fn name(&self) -> &'static str {
        "frontmatter"
    }

    fn from_file(&self, content: &str) -> Result<EntryData> {
        let language = self.language.or_else(|| Self::detect(content));
        let (data, body) = match language {
            Some(language) => Self::split(language, content)?.unwrap_or_else(|| {
                (crate::value::empty_data(), content.to_string())
            }),
            None => (crate::value::empty_data(), content.to_string()),
        };
        let mut map = match data {
            EntryData::Object(map) => map,
            _ => Map::new(),
        };
        if !body.trim().is_empty() {
            map.insert(BODY_KEY.to_string(), EntryData::String(body));
        }
        Ok(EntryData::Object(map))
    }

    fn to_file(
        &self,
        data: &EntryData,
        field_order: &[String],
        comments: &IndexMap<String, String>,
    ) -> Result<String> {
        let mut meta = match ordered(data, field_order) {
            EntryData::Object(map) => map,
            _ => Map::new(),
        };
        let body = match meta.shift_remove(BODY_KEY) {
            Some(EntryData::String(body)) => body,
            Some(EntryData::Null) | None => String::new(),
            Some(other) => crate::value::value_to_string(&other),
        };
        if meta.is_empty() {
            return Ok(body);
        }
        let meta = EntryData::Object(meta);
        let matter = match self.language.unwrap_or(FrontmatterLanguage::Yaml) {
            FrontmatterLanguage::Yaml => {
                let text = YamlFormat::render(&meta, &[], comments)?;
                format!("---\n{}---\n", ensure_newline(text))
            }
            FrontmatterLanguage::Toml => {
                let text = TomlFormat::render(&meta, &[], comments)?;
                format!("+++\n{}+++\n", ensure_newline(text))
            }
            FrontmatterLanguage::Json => {
                let text = JsonFormat.to_file(&meta, &[], comments)?;
                format!("{}\n", text.trim_end())
            }
        };
        Ok(matter + &body)
    }
}

fn ensure_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn round_trip(format: FrontmatterFormat, data: EntryData) {
        let text = format.to_file(&data, &[], &IndexMap::new()).unwrap();
        assert_eq!(format.from_file(&text).unwrap(), data, "{text}");
    }

    #[test]
    fn yaml_front_matter_with_body() {
        let text = "---\ntitle: Hello\ntags:\n- a\n---\nHello world\n";
        let data = FrontmatterFormat::INFER.from_file(text).unwrap();
        assert_eq!(
            data,
            json!({"title": "Hello", "tags": ["a"], "body": "Hello world\n"})
        );
        assert_eq!(
            FrontmatterFormat::INFER.to_file(&data, &[], &IndexMap::new()).unwrap(),
            text
        );
    }

    #[test]
    fn every_language_round_trips() {
        let data = json!({"title": "Hi", "nested": {"a": [1, 2]}, "body": "Text\n\nMore\n"});
        round_trip(FrontmatterFormat::YAML, data.clone());
        round_trip(FrontmatterFormat::TOML, data.clone());
        round_trip(FrontmatterFormat::JSON, data);
    }

    #[test]
    fn toml_and_json_are_detected() {
        let toml = "+++\ntitle = \"T\"\n+++\nbody\n";
        assert_eq!(
            FrontmatterFormat::INFER.from_file(toml).unwrap(),
            json!({"title": "T", "body": "body\n"})
        );
        let json_text = "{\n  \"title\": \"J\"\n}\nbody\n";
        assert_eq!(
            FrontmatterFormat::INFER.from_file(json_text).unwrap(),
            json!({"title": "J", "body": "body\n"})
        );
    }

    #[test]
    fn body_only_documents() {
        assert_eq!(
            FrontmatterFormat::INFER.from_file("just text").unwrap(),
            json!({"body": "just text"})
        );
        round_trip(FrontmatterFormat::INFER, json!({"body": "just text"}));
        round_trip(FrontmatterFormat::INFER, json!({"title": "no body"}));
    }

    #[test]
    fn unclosed_fence_is_body() {
        let text = "---\ntitle: x\n";
        assert_eq!(
            FrontmatterFormat::INFER.from_file(text).unwrap(),
            json!({"body": text})
        );
    }
}
