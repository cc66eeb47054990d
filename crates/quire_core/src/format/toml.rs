use indexmap::IndexMap;
use serde_json::{Map, Number};

use super::{Format, insert_comments, ordered};
use crate::error::{QuireError, Result};
use crate::value::EntryData;

/// TOML documents.
///
/// TOML has no null, so null keys are omitted on write. A null list item or
/// an integer beyond the signed 64-bit range cannot be written and fails
/// with a format error. Datetimes decode to their RFC 3339 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlFormat;

impl TomlFormat {
    pub(crate) fn parse(content: &str) -> Result<EntryData> {
        let table: toml::Table = content.parse().map_err(|e| QuireError::format("toml", e))?;
        Ok(from_toml(toml::Value::Table(table)))
    }

    pub(crate) fn render(
        data: &EntryData,
        field_order: &[String],
        comments: &IndexMap<String, String>,
    ) -> Result<String> {
        let table = match to_toml(&ordered(data, field_order))? {
            Some(toml::Value::Table(table)) => table,
            _ => toml::Table::new(),
        };
        let text = toml::to_string(&table).map_err(|e| QuireError::format("toml", e))?;
        Ok(insert_comments(&text, comments, |line| {
            if line.starts_with([' ', '[', '#']) {
                return None;
            }
            line.split_once('=').map(|(key, _)| key.trim().trim_matches('"'))
        }))
    }
}

fn from_toml(value: toml::Value) -> EntryData {
    match value {
        toml::Value::String(s) => EntryData::String(s),
        toml::Value::Integer(i) => EntryData::Number(i.into()),
        toml::Value::Float(f) => Number::from_f64(f).map_or(EntryData::Null, EntryData::Number),
        toml::Value::Boolean(b) => EntryData::Bool(b),
        toml::Value::Datetime(dt) => EntryData::String(dt.to_string()),
        toml::Value::Array(items) => EntryData::Array(items.into_iter().map(from_toml).collect()),
        toml::Value::Table(table) => EntryData::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, from_toml(v)))
                .collect::<Map<_, _>>(),
        ),
    }
}

fn to_toml(value: &EntryData) -> Result<Option<toml::Value>> {
    Ok(Some(match value {
        EntryData::Null => return Ok(None),
        EntryData::Bool(b) => toml::Value::Boolean(*b),
        EntryData::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) => toml::Value::Float(f),
            None => return Ok(None),
        },
        EntryData::Number(n) => match n.as_i64() {
            Some(i) => toml::Value::Integer(i),
            None => return Err(QuireError::format("toml", format!("integer {n} is out of range"))),
        },
        EntryData::String(s) => toml::Value::String(s.clone()),
        EntryData::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                match to_toml(item)? {
                    Some(item) => out.push(item),
                    None => {
                        return Err(QuireError::format("toml", format!("list item {index} is null")));
                    }
                }
            }
            toml::Value::Array(out)
        }
        EntryData::Object(map) => {
            let mut table = toml::Table::new();
            for (key, value) in map {
                if let Some(value) = to_toml(value)? {
                    table.insert(key.clone(), value);
                }
            }
            toml::Value::Table(table)
        }
    }))
}

impl Format for TomlFormat {
    fn name(&self) -> &'static str {
        "toml"
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
