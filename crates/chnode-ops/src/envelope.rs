//! Parsing of ClickHouse `FORMAT JSON` payloads

use chnode_core::{ChNodeError, JsonObject, Redactor, Result};
use serde_json::Value;

/// The `{data, meta, statistics}` payload of a `FORMAT JSON` response
///
/// Only object entries survive: non-object rows and meta entries are
/// dropped, and a non-object `statistics` becomes empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClickHouseJson {
    pub rows: Vec<JsonObject>,
    pub meta: Vec<JsonObject>,
    pub statistics: JsonObject,
}

impl ClickHouseJson {
    /// Parse a response body, reporting failures with a redacted excerpt
    pub fn parse(body: &str, redactor: &Redactor) -> Result<Self> {
        let parsed: Value = serde_json::from_str(body).map_err(|source| ChNodeError::Parse {
            excerpt: redactor.excerpt(body),
            source,
        })?;
        Ok(Self::from_value(parsed))
    }

    /// Filter an already-parsed payload; anything but an object is empty
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut payload) = value else {
            return Self::default();
        };

        Self {
            rows: objects(payload.remove("data")),
            meta: objects(payload.remove("meta")),
            statistics: match payload.remove("statistics") {
                Some(Value::Object(statistics)) => statistics,
                _ => JsonObject::new(),
            },
        }
    }
}

fn objects(value: Option<Value>) -> Vec<JsonObject> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(object) => Some(object),
            _ => None,
        })
        .collect()
}
