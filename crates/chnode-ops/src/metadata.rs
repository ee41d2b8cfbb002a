//! Database, table and column introspection

use crate::ClickHouseJson;
use chnode_core::{Credentials, DEFAULT_TIMEOUT_MS, FALLBACK_DATABASE, JsonObject, Result};
use chnode_transport::{ClickHouseClient, RequestOptions};
use serde::Serialize;
use serde_json::Value;

/// Request options shared by every metadata call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataRequest {
    pub timeout_ms: u64,
    pub compress: bool,
}

impl Default for MetadataRequest {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            compress: true,
        }
    }
}

/// Database used for table and column listings
///
/// The first non-blank of `override_database` and the credentials' default
/// database, falling back to `default`.
pub fn pick_database(credentials: &Credentials, override_database: Option<&str>) -> String {
    [override_database, credentials.default_database.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|database| !database.is_empty())
        .unwrap_or(FALLBACK_DATABASE)
        .to_string()
}

/// Run a metadata statement with ` FORMAT JSON` appended and return its rows
#[tracing::instrument(skip(client, sql, request), fields(sql_len = sql.len()))]
pub async fn fetch_metadata_rows(
    client: &ClickHouseClient,
    sql: &str,
    request: MetadataRequest,
) -> Result<Vec<JsonObject>> {
    let options = RequestOptions::new(format!("{} FORMAT JSON", sql))
        .format("JSON")
        .wait_end_of_query(true)
        .compress(request.compress)
        .timeout_ms(request.timeout_ms);

    let response = client.request(&options).await?;
    let rows = ClickHouseJson::parse(&response.body, client.redactor())?.rows;
    tracing::debug!(rows = rows.len(), "fetched metadata rows");
    Ok(rows)
}

/// `SHOW DATABASES`
pub async fn list_databases(
    client: &ClickHouseClient,
    request: MetadataRequest,
) -> Result<Vec<JsonObject>> {
    fetch_metadata_rows(client, "SHOW DATABASES", request).await
}

/// `SHOW TABLES FROM <database>`
pub async fn list_tables(
    client: &ClickHouseClient,
    database: &str,
    request: MetadataRequest,
) -> Result<Vec<JsonObject>> {
    fetch_metadata_rows(client, &format!("SHOW TABLES FROM {}", database), request).await
}

/// `DESCRIBE TABLE <database>.<table>`; a blank table yields no rows and no request
pub async fn list_columns(
    client: &ClickHouseClient,
    database: &str,
    table: Option<&str>,
    request: MetadataRequest,
) -> Result<Vec<JsonObject>> {
    let Some(table) = table.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(Vec::new());
    };
    fetch_metadata_rows(
        client,
        &format!("DESCRIBE TABLE {}.{}", database, table),
        request,
    )
    .await
}

/// A `{name, value}` entry for a host dropdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadOption {
    pub name: String,
    pub value: String,
}

/// Option from a string value; blank and non-string values yield nothing
pub fn build_option(value: Option<&Value>) -> Option<LoadOption> {
    let trimmed = value?.as_str()?.trim();
    (!trimmed.is_empty()).then(|| LoadOption {
        name: trimmed.to_string(),
        value: trimmed.to_string(),
    })
}

/// Options from the first present of `keys` in each row
pub fn options_from_rows(rows: &[JsonObject], keys: &[&str]) -> Vec<LoadOption> {
    rows.iter()
        .filter_map(|row| build_option(keys.iter().find_map(|key| non_null(row.get(*key)))))
        .collect()
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Database dropdown options from `SHOW DATABASES` rows
pub fn database_options(rows: &[JsonObject]) -> Vec<LoadOption> {
    options_from_rows(rows, &["name", "database", "Database"])
}

/// Table dropdown options from `SHOW TABLES` rows
pub fn table_options(rows: &[JsonObject]) -> Vec<LoadOption> {
    options_from_rows(rows, &["name", "table", "Table"])
}
