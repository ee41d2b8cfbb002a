//! Output records handed back to the host

use chnode_core::{ChNodeError, JsonObject, Result};
use serde::Serialize;
use serde_json::Value;

/// Index of the input item a record was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairedItem {
    pub item: usize,
}

/// One output record: `{json, pairedItem: {item}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub json: JsonObject,
    pub paired_item: PairedItem,
}

impl NodeRecord {
    pub fn new(json: JsonObject, item: usize) -> Self {
        Self {
            json,
            paired_item: PairedItem { item },
        }
    }

    /// Record from any value serializing to a JSON object
    pub fn from_serialize<T: Serialize>(value: &T, item: usize) -> Result<Self> {
        match serde_json::to_value(value)? {
            Value::Object(json) => Ok(Self::new(json, item)),
            other => Err(ChNodeError::Serialization(serde::ser::Error::custom(
                format!("expected a JSON object, got {}", value_kind(&other)),
            ))),
        }
    }

    /// `{error: message}` for a failed item under continue-on-fail
    pub fn error(error: &ChNodeError, item: usize) -> Self {
        let mut json = JsonObject::new();
        json.insert("error".to_string(), Value::String(error.to_string()));
        Self::new(json, item)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
