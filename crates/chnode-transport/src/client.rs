//! ClickHouse HTTP client

use crate::{
    DelegateExecutor, DirectExecutor, HostHttp, HttpExecutor, HttpRequest, QueryParams,
    RequestOptions, build_base_url, build_query_string, gzip,
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chnode_core::{ChNodeError, ClickHouseResponse, Credentials, HeaderMap, Redactor, Result};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Client for one set of credentials
///
/// Cheap to clone. Holds no connection state; every call to
/// [`ClickHouseClient::request`] is independent.
#[derive(Clone)]
pub struct ClickHouseClient {
    credentials: Credentials,
    executor: Arc<dyn HttpExecutor>,
    redactor: Redactor,
}

impl ClickHouseClient {
    /// Create a client, delegating to the host helper when one is supplied
    pub fn new(credentials: Credentials, host: Option<Arc<dyn HostHttp>>) -> Self {
        let executor: Arc<dyn HttpExecutor> = match host {
            Some(host) => Arc::new(DelegateExecutor::new(host)),
            None => Arc::new(DirectExecutor::new()),
        };
        Self::with_executor(credentials, executor)
    }

    /// Create a client with an explicit executor
    pub fn with_executor(credentials: Credentials, executor: Arc<dyn HttpExecutor>) -> Self {
        let redactor = Redactor::for_credentials(&credentials);
        Self {
            credentials,
            executor,
            redactor,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    /// `{protocol}://{host}:{port}` for these credentials
    pub fn base_url(&self) -> String {
        build_base_url(
            self.credentials.protocol,
            &self.credentials.host,
            self.credentials.port,
        )
    }

    /// Build the POST request for `options` without sending it
    pub fn build_request(&self, options: &RequestOptions) -> Result<HttpRequest> {
        let database = options
            .database_override
            .as_deref()
            .or(self.credentials.default_database.as_deref());

        let query_string = build_query_string(&QueryParams {
            database,
            format: options.format.as_deref(),
            compress: Some(options.compress),
            settings: (!options.settings.is_empty()).then_some(&options.settings),
            wait_end_of_query: options.wait_end_of_query,
            query: options.query_in_url.then_some(options.sql.as_str()),
        });
        let url = format!("{}/{}", self.base_url(), query_string);

        let mut headers = IndexMap::new();
        set_header(&mut headers, "Accept-Encoding", "gzip");
        set_header(&mut headers, "Content-Type", "text/plain; charset=utf-8");
        set_header(&mut headers, "Authorization", &self.basic_auth());
        for (name, value) in &options.request_headers {
            set_header(&mut headers, name, value);
        }

        let mut body = options.payload();
        if options.gzip_request {
            body = gzip(&body)?;
            set_header(&mut headers, "Content-Encoding", "gzip");
        }

        Ok(HttpRequest {
            url,
            headers,
            body,
            timeout: options.timeout(),
            protocol: self.credentials.protocol,
            tls_ignore_ssl: self.credentials.tls_ignore_ssl,
            tls: self.credentials.tls.clone(),
        })
    }

    /// Issue exactly one POST and return the normalized response
    ///
    /// Statuses >= 400 (and a missing status) become
    /// [`ChNodeError::Response`]; a request exceeding its timeout becomes
    /// [`ChNodeError::Timeout`]. Error text never contains credentials.
    #[tracing::instrument(
        skip(self, options),
        fields(
            executor = self.executor.name(),
            format = options.format.as_deref(),
            query_in_url = options.query_in_url,
            gzip_request = options.gzip_request,
        )
    )]
    pub async fn request(&self, options: &RequestOptions) -> Result<ClickHouseResponse> {
        let request = self.build_request(options)?;
        let start = std::time::Instant::now();
        tracing::debug!(body_bytes = request.body.len(), "sending ClickHouse request");

        let outcome = tokio::time::timeout(
            options.timeout(),
            self.executor.execute(&request, &self.redactor),
        )
        .await;

        let response = match outcome {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(timeout_ms = options.timeout_ms, "ClickHouse request timed out");
                return Err(ChNodeError::Timeout {
                    timeout_ms: options.timeout_ms,
                });
            }
        };

        tracing::debug!(
            status = response.status,
            duration_ms = start.elapsed().as_millis() as u64,
            "ClickHouse response received"
        );

        if response.is_error_status() {
            return Err(build_response_error(&response, &self.redactor));
        }
        Ok(response)
    }

    /// Check that the server is reachable and accepts the credentials
    pub async fn ping(&self, timeout_ms: u64) -> Result<()> {
        self.request(&RequestOptions::new("SELECT 1").timeout_ms(timeout_ms))
            .await
            .map(|_| ())
    }

    fn basic_auth(&self) -> String {
        let token = BASE64.encode(format!(
            "{}:{}",
            self.credentials.username, self.credentials.password
        ));
        format!("Basic {}", token)
    }
}

impl std::fmt::Debug for ClickHouseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseClient")
            .field("credentials", &self.credentials)
            .field("executor", &self.executor.name())
            .finish()
    }
}

/// Insert a header, replacing any existing one with the same name in any case
fn set_header(headers: &mut IndexMap<String, String>, name: &str, value: &str) {
    headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
    headers.insert(name.to_string(), value.to_string());
}

/// Convert an error-status response into a redacted [`ChNodeError::Response`]
pub fn build_response_error(response: &ClickHouseResponse, redactor: &Redactor) -> ChNodeError {
    let status_text = http::StatusCode::from_u16(response.status)
        .ok()
        .and_then(|status| status.canonical_reason())
        .map(str::to_string);

    ChNodeError::Response {
        status: response.status,
        status_text,
        detail: build_error_detail(&response.body, &response.headers, redactor),
    }
}

/// `Response JSON: ...` for JSON-looking bodies, `Response: <excerpt>` otherwise
pub fn build_error_detail(body: &str, headers: &HeaderMap, redactor: &Redactor) -> String {
    let content_type = headers.get("content-type").map(String::as_str).unwrap_or("");
    let trimmed = body.trim();
    let looks_json = content_type.contains("application/json")
        || trimmed.starts_with('{')
        || trimmed.starts_with('[');

    if looks_json && let Ok(parsed) = serde_json::from_str::<Value>(body) {
        return format!("Response JSON: {}", redactor.redact(&parsed.to_string()));
    }
    format!("Response: {}", redactor.excerpt(body))
}
