//! Node parameters as resolved by the host

use crate::ExecutionContext;
use chnode_core::{ChNodeError, JsonObject, NodeDefaults, Result, is_truthy};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Every parameter the node reads
pub const PARAMETER_NAMES: [&str; 19] = [
    "resource",
    "operation",
    "databaseOverride",
    "timeoutMs",
    "compress",
    "query",
    "command",
    "limit",
    "paginate",
    "outputMode",
    "table",
    "columnsCsv",
    "columnsUi",
    "batchSize",
    "ignoreUnknownFields",
    "gzipRequest",
    "jsonArrayField",
    "metadataDatabase",
    "metadataTable",
];

/// How query rows are emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputMode {
    /// One `{rows, meta, statistics, summary}` record per item
    #[default]
    Single,
    /// One record per returned row
    PerRow,
}

/// Parameter values for one item
///
/// Numbers and flags are accepted loosely, the way the host hands them
/// over; unset tunables stay `None` and resolve against [`NodeDefaults`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeParameters {
    pub resource: String,
    pub operation: String,
    #[serde(deserialize_with = "trimmed")]
    pub database_override: Option<String>,
    /// Zero means unset
    #[serde(deserialize_with = "positive_u64")]
    pub timeout_ms: Option<u64>,
    #[serde(deserialize_with = "truthy")]
    pub compress: Option<bool>,
    pub query: String,
    pub command: String,
    #[serde(deserialize_with = "floored_i64")]
    pub limit: Option<i64>,
    #[serde(deserialize_with = "truthy")]
    pub paginate: Option<bool>,
    #[serde(deserialize_with = "output_mode")]
    pub output_mode: OutputMode,
    pub table: String,
    pub columns_csv: Option<String>,
    pub columns_ui: Option<Value>,
    #[serde(deserialize_with = "floored_i64")]
    pub batch_size: Option<i64>,
    #[serde(deserialize_with = "truthy")]
    pub ignore_unknown_fields: Option<bool>,
    #[serde(deserialize_with = "truthy")]
    pub gzip_request: Option<bool>,
    pub json_array_field: String,
    #[serde(deserialize_with = "trimmed")]
    pub metadata_database: Option<String>,
    #[serde(deserialize_with = "trimmed")]
    pub metadata_table: Option<String>,
}

impl Default for NodeParameters {
    fn default() -> Self {
        Self {
            resource: "query".to_string(),
            operation: "executeQuery".to_string(),
            database_override: None,
            timeout_ms: None,
            compress: None,
            query: String::new(),
            command: String::new(),
            limit: None,
            paginate: None,
            output_mode: OutputMode::default(),
            table: String::new(),
            columns_csv: None,
            columns_ui: None,
            batch_size: None,
            ignore_unknown_fields: None,
            gzip_request: None,
            json_array_field: String::new(),
            metadata_database: None,
            metadata_table: None,
        }
    }
}

impl NodeParameters {
    /// Read every known parameter for `item_index` from the host
    pub fn read(ctx: &dyn ExecutionContext, item_index: usize) -> Result<Self> {
        let mut values = JsonObject::new();
        for name in PARAMETER_NAMES {
            if let Some(value) = ctx.parameter(name, item_index).filter(|v| !v.is_null()) {
                values.insert(name.to_string(), value);
            }
        }
        Self::from_object(values)
    }

    pub fn from_object(values: JsonObject) -> Result<Self> {
        serde_json::from_value(Value::Object(values))
            .map_err(|e| ChNodeError::configuration(format!("Invalid node parameters: {}", e)))
    }

    pub fn timeout_ms(&self, defaults: &NodeDefaults) -> u64 {
        self.timeout_ms.unwrap_or(defaults.timeout_ms)
    }

    pub fn compress(&self, defaults: &NodeDefaults) -> bool {
        self.compress.unwrap_or(defaults.compress)
    }

    pub fn limit(&self, defaults: &NodeDefaults) -> i64 {
        self.limit.unwrap_or(defaults.limit)
    }

    pub fn batch_size(&self, defaults: &NodeDefaults) -> i64 {
        self.batch_size.unwrap_or(defaults.batch_size)
    }

    /// `metadataDatabase`, then `databaseOverride`
    pub fn metadata_database_override(&self) -> Option<&str> {
        self.metadata_database
            .as_deref()
            .or(self.database_override.as_deref())
    }
}

fn trimmed<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn truthy<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok((!value.is_null()).then(|| is_truthy(&value)))
}

/// Anything but `perRow` is a single record
fn output_mode<'de, D>(deserializer: D) -> std::result::Result<OutputMode, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value.as_str() {
        Some("perRow") => OutputMode::PerRow,
        _ => OutputMode::Single,
    })
}

fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn floored_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number(&value).map(|n| n.floor() as i64))
}

fn positive_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number(&value)
        .map(f64::floor)
        .filter(|n| *n >= 1.0)
        .map(|n| n as u64))
}

/// A resolved resource/operation pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ExecuteQuery,
    ExecuteCommand,
    InsertFromItems,
    InsertFromJson,
    ListDatabases,
    ListTables,
    ListColumns,
}

impl Operation {
    pub fn resolve(resource: &str, operation: &str) -> Result<Self> {
        match (resource, operation) {
            ("query", "executeQuery") => Ok(Self::ExecuteQuery),
            ("command", "executeCommand") => Ok(Self::ExecuteCommand),
            ("insert", "insertFromItems") => Ok(Self::InsertFromItems),
            ("insert", "insertFromJson") => Ok(Self::InsertFromJson),
            ("metadata", "listDatabases") => Ok(Self::ListDatabases),
            ("metadata", "listTables") => Ok(Self::ListTables),
            ("metadata", "listColumns") => Ok(Self::ListColumns),
            ("query" | "command" | "insert" | "metadata", _) => Err(ChNodeError::configuration(
                format!("Unsupported operation \"{}\" for resource \"{}\"", operation, resource),
            )),
            _ => Err(ChNodeError::configuration(format!(
                "Unsupported resource \"{}\"",
                resource
            ))),
        }
    }

    /// Insert and metadata run once for the whole input, reading item 0
    pub fn is_resource_level(&self) -> bool {
        matches!(
            self,
            Self::InsertFromItems
                | Self::InsertFromJson
                | Self::ListDatabases
                | Self::ListTables
                | Self::ListColumns
        )
    }
}

#[cfg(test)]
mod tests;
