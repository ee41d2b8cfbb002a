//! Paginated query execution and output shaping

use crate::ClickHouseJson;
use chnode_core::{DEFAULT_QUERY_LIMIT, DEFAULT_TIMEOUT_MS, JsonObject, Result};
use chnode_transport::{ClickHouseClient, RequestOptions};
use serde::Serialize;
use serde_json::Value;

/// Wrap `sql` as `SELECT * FROM (<sql>) LIMIT <limit>[ OFFSET <offset>]`
///
/// Trailing semicolons are stripped (with any whitespace between them);
/// negative limits and offsets clamp to zero and a zero offset is omitted.
pub fn build_paginated_sql(sql: &str, limit: i64, offset: i64) -> String {
    let cleaned = strip_trailing_semicolons(sql.trim());
    let limit = limit.max(0);
    let offset = offset.max(0);

    let mut paged = format!("SELECT * FROM ({}) LIMIT {}", cleaned, limit);
    if offset > 0 {
        paged.push_str(&format!(" OFFSET {}", offset));
    }
    paged
}

fn strip_trailing_semicolons(sql: &str) -> &str {
    let mut cleaned = sql;
    while let Some(rest) = cleaned.strip_suffix(';') {
        cleaned = rest.trim_end();
    }
    cleaned
}

/// Parameters of one query execution
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub sql: String,
    pub limit: i64,
    pub paginate: bool,
    pub database_override: Option<String>,
    pub timeout_ms: u64,
    pub compress: bool,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            limit: DEFAULT_QUERY_LIMIT,
            paginate: false,
            database_override: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            compress: true,
        }
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn paginate(mut self, paginate: bool) -> Self {
        self.paginate = paginate;
        self
    }

    pub fn database(mut self, database: Option<impl Into<String>>) -> Self {
        self.database_override = database.map(Into::into);
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

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySummary {
    pub row_count: usize,
    pub limit: i64,
    pub pages: usize,
    pub paginated: bool,
}

/// Accumulated result of every page of a query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryExecution {
    pub rows: Vec<JsonObject>,
    /// Column metadata of the first page
    pub meta: Vec<JsonObject>,
    /// Statistics of the last page
    pub statistics: JsonObject,
    pub summary: QuerySummary,
}

impl QueryExecution {
    /// Shape into the single-record output form
    pub fn into_output(self) -> QueryOutput {
        let summary = match serde_json::to_value(&self.summary) {
            Ok(Value::Object(summary)) => Some(summary),
            _ => None,
        };
        shape_query_output(QueryParts {
            rows: Some(self.rows),
            meta: Some(self.meta),
            statistics: Some(self.statistics),
            summary,
        })
    }
}

/// Possibly-missing pieces of a query output
#[derive(Debug, Clone, Default)]
pub struct QueryParts {
    pub rows: Option<Vec<JsonObject>>,
    pub meta: Option<Vec<JsonObject>>,
    pub statistics: Option<JsonObject>,
    pub summary: Option<JsonObject>,
}

/// The `{rows, meta, statistics, summary}` record emitted in single mode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutput {
    pub rows: Vec<JsonObject>,
    pub meta: Vec<JsonObject>,
    pub statistics: JsonObject,
    pub summary: JsonObject,
}

/// Fill in defaults; the summary defaults to `{rowCount}`
pub fn shape_query_output(parts: QueryParts) -> QueryOutput {
    let rows = parts.rows.unwrap_or_default();
    let summary = parts.summary.unwrap_or_else(|| {
        let mut summary = JsonObject::new();
        summary.insert("rowCount".to_string(), Value::from(rows.len()));
        summary
    });

    QueryOutput {
        meta: parts.meta.unwrap_or_default(),
        statistics: parts.statistics.unwrap_or_default(),
        summary,
        rows,
    }
}

/// Run a query, following pages while each one comes back full
///
/// Every page is requested with `default_format=JSON` and
/// `wait_end_of_query=1`. Pagination stops at the first page holding fewer
/// than `limit` rows, so an exact multiple of `limit` costs one empty page.
#[tracing::instrument(
    skip(client, request),
    fields(limit = request.limit, paginate = request.paginate)
)]
pub async fn execute_query(
    client: &ClickHouseClient,
    request: &QueryRequest,
) -> Result<QueryExecution> {
    let limit = request.limit.max(0);
    let paginate = request.paginate && limit > 0;

    let mut rows = Vec::new();
    let mut meta = Vec::new();
    let mut statistics = JsonObject::new();
    let mut pages = 0usize;

    loop {
        let offset = if paginate { pages as i64 * limit } else { 0 };
        let options = RequestOptions::new(build_paginated_sql(&request.sql, limit, offset))
            .database(request.database_override.as_deref())
            .format("JSON")
            .compress(request.compress)
            .timeout_ms(request.timeout_ms)
            .wait_end_of_query(true);

        let response = client.request(&options).await?;
        let page = ClickHouseJson::parse(&response.body, client.redactor())?;
        let page_rows = page.rows.len();
        tracing::debug!(page = pages, offset, rows = page_rows, "fetched query page");

        if pages == 0 {
            meta = page.meta;
        }
        statistics = page.statistics;
        rows.extend(page.rows);
        pages += 1;

        if !paginate || (page_rows as i64) < limit {
            break;
        }
    }

    Ok(QueryExecution {
        summary: QuerySummary {
            row_count: rows.len(),
            limit,
            pages,
            paginated: paginate,
        },
        rows,
        meta,
        statistics,
    })
}

#[cfg(test)]
mod tests;
