//! Statements executed for effect

use chnode_core::{DEFAULT_TIMEOUT_MS, HeaderMap, Result, sanitize_headers};
use chnode_transport::{ClickHouseClient, RequestOptions};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub sql: String,
    pub database_override: Option<String>,
    pub timeout_ms: u64,
    pub compress: bool,
}

impl CommandRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            database_override: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            compress: true,
        }
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

/// Record emitted for an executed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSummary {
    /// `X-ClickHouse-Query-Id`, serialized as `null` when absent
    pub query_id: Option<String>,
    pub headers: HeaderMap,
    /// Trimmed response body, omitted when empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Execute a command with `wait_end_of_query=1` so failures surface as statuses
#[tracing::instrument(
    skip(client, request),
    fields(
        database = request.database_override.as_deref(),
        sql_len = request.sql.len(),
    )
)]
pub async fn execute_command(
    client: &ClickHouseClient,
    request: &CommandRequest,
) -> Result<CommandSummary> {
    let options = RequestOptions::new(request.sql.as_str())
        .database(request.database_override.as_deref())
        .compress(request.compress)
        .timeout_ms(request.timeout_ms)
        .wait_end_of_query(true);

    let response = client.request(&options).await?;
    let body = response.body.trim();

    Ok(CommandSummary {
        query_id: response.query_id().map(str::to_string),
        headers: sanitize_headers(&response.headers),
        body: (!body.is_empty()).then(|| body.to_string()),
    })
}
