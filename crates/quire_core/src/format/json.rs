use indexmap::IndexMap;

use super::{Format, expect_object, ordered};
use crate::error::{QuireError, Result};
use crate::value::EntryData;

/// JSON documents. Comments are not representable and are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn from_file(&self, content: &str) -> Result<EntryData> {
        if content.trim().is_empty() {
            return Ok(crate::value::empty_data());
        }
        let value: EntryData =
            serde_json::from_str(content).map_err(|e| QuireError::format("json", e))?;
        expect_object("json", value)
    }

    fn to_file(
        &self,
        data: &EntryData,
        field_order: &[String],
        _comments: &IndexMap<String, String>,
    ) -> Result<String> {
        serde_json::to_string_pretty(&ordered(data, field_order))
            .map_err(|e| QuireError::format("json", e))
    }
}
