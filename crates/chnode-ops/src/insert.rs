//! Batched `JSONEachRow` inserts

use chnode_core::{
    ChNodeError, DEFAULT_BATCH_SIZE, DEFAULT_TIMEOUT_MS, HeaderMap, JsonObject, Result,
    sanitize_headers,
};
use chnode_transport::{ClickHouseClient, RequestOptions, SettingValue};
use serde::Serialize;
use serde_json::Value;

/// Destination of an insert
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertTarget {
    pub database: Option<String>,
    pub table: String,
    pub columns: Vec<String>,
}

/// `INSERT INTO [db.]table[ (a, b)] FORMAT JSONEachRow`
pub fn build_insert_query(target: &InsertTarget) -> Result<String> {
    let table = target.table.trim();
    if table.is_empty() {
        return Err(ChNodeError::configuration("Table name is required for insert"));
    }

    let qualified = match target.database.as_deref() {
        Some(database) if !database.is_empty() => format!("{}.{}", database.trim(), table),
        _ => table.to_string(),
    };
    let columns = if target.columns.is_empty() {
        String::new()
    } else {
        format!(" ({})", target.columns.join(", "))
    };

    Ok(format!("INSERT INTO {}{} FORMAT JSONEachRow", qualified, columns))
}

/// One JSON object per line, key order preserved
pub fn build_ndjson(rows: &[JsonObject]) -> String {
    rows.iter()
        .map(|row| Value::Object(row.clone()).to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Contiguous batches of at most `max(1, batch_size)` rows
pub fn chunk_rows(rows: &[JsonObject], batch_size: i64) -> Vec<&[JsonObject]> {
    let size = usize::try_from(batch_size.max(1)).unwrap_or(usize::MAX);
    rows.chunks(size).collect()
}

/// Resolve the insert column list
///
/// The fixed-collection UI value wins when it names at least one column:
/// entries live under `columns` (or the `values`/`column` aliases), possibly
/// nested one more `columns` level deep, each as `{column: "name"}`.
/// Otherwise the comma-separated list is used.
pub fn parse_columns(columns_csv: Option<&str>, columns_ui: Option<&Value>) -> Vec<String> {
    let from_ui = columns_ui.map(columns_from_ui).unwrap_or_default();
    if !from_ui.is_empty() {
        return from_ui;
    }

    columns_csv
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .map(str::to_string)
        .collect()
}

fn columns_from_ui(value: &Value) -> Vec<String> {
    let Some(record) = value.as_object() else {
        return Vec::new();
    };
    let Some(collection) = ["columns", "values", "column"]
        .iter()
        .find_map(|key| record.get(*key).filter(|v| !v.is_null()))
    else {
        return Vec::new();
    };

    let entries = match collection {
        Value::Array(entries) => entries,
        Value::Object(nested) => match nested.get("columns") {
            Some(Value::Array(entries)) => entries,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    entries
        .iter()
        .filter_map(|entry| entry.get("column")?.as_str())
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .map(str::to_string)
        .collect()
}

/// Value at a dot/bracket path such as `payload.rows` or `data[0].items`
pub fn get_value_at_path<'a>(input: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    path.split(['.', '[', ']'])
        .filter(|segment| !segment.is_empty())
        .try_fold(input, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Object entries of the array found at each item's path
///
/// Items whose path does not lead to an array contribute nothing.
pub fn collect_rows_from_json_field<F>(items: &[JsonObject], mut path_for: F) -> Vec<JsonObject>
where
    F: FnMut(usize) -> String,
{
    let mut rows = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let path = path_for(index);
        let item = Value::Object(item.clone());
        let Some(Value::Array(entries)) = get_value_at_path(&item, &path) else {
            continue;
        };
        rows.extend(entries.iter().filter_map(|entry| entry.as_object().cloned()));
    }
    rows
}

/// Parameters of one insert run
#[derive(Debug, Clone)]
pub struct InsertRequest {
    /// `target.database` doubles as the request's database override
    pub target: InsertTarget,
    pub batch_size: i64,
    pub ignore_unknown_fields: bool,
    pub gzip_request: bool,
    pub timeout_ms: u64,
    pub compress: bool,
}

impl InsertRequest {
    pub fn new(target: InsertTarget) -> Self {
        Self {
            target,
            batch_size: DEFAULT_BATCH_SIZE,
            ignore_unknown_fields: false,
            gzip_request: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            compress: true,
        }
    }

    pub fn batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn ignore_unknown_fields(mut self, ignore: bool) -> Self {
        self.ignore_unknown_fields = ignore;
        self
    }

    pub fn gzip_request(mut self, gzip: bool) -> Self {
        self.gzip_request = gzip;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Summary record of an insert run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InsertSummary {
    pub inserted: usize,
    pub batches: usize,
    /// Sanitized headers of the last batch
    pub headers: HeaderMap,
}

/// Insert `rows` in batches, one request per batch
///
/// With no rows nothing is sent. The SQL travels in the URL and each batch
/// body is NDJSON, gzipped on request. The first failing batch aborts the
/// run; earlier batches stay committed.
#[tracing::instrument(
    skip(client, request, rows),
    fields(table = %request.target.table, rows = rows.len())
)]
pub async fn execute_insert(
    client: &ClickHouseClient,
    request: &InsertRequest,
    rows: &[JsonObject],
) -> Result<InsertSummary> {
    if rows.is_empty() {
        return Ok(InsertSummary::default());
    }

    let query = build_insert_query(&request.target)?;
    let batches = chunk_rows(rows, request.batch_size);
    let mut summary = InsertSummary {
        batches: batches.len(),
        ..InsertSummary::default()
    };

    for (index, batch) in batches.iter().enumerate() {
        let mut options = RequestOptions::new(query.as_str())
            .with_payload(build_ndjson(batch))
            .database(request.target.database.as_deref())
            .compress(request.compress)
            .timeout_ms(request.timeout_ms)
            .wait_end_of_query(true)
            .gzip_request(request.gzip_request);
        if request.ignore_unknown_fields {
            options = options.setting("input_format_skip_unknown_fields", SettingValue::Int(1));
        }

        let response = client.request(&options).await?;
        summary.inserted += batch.len();
        summary.headers = sanitize_headers(&response.headers);
        tracing::debug!(batch = index, rows = batch.len(), "inserted batch");
    }

    Ok(summary)
}

#[cfg(test)]
mod tests;
