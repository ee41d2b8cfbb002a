//! Request descriptor for a single ClickHouse HTTP call

use crate::Settings;
use chnode_core::DEFAULT_TIMEOUT_MS;
use indexmap::IndexMap;
use std::time::Duration;

/// Everything needed to issue one POST to ClickHouse
///
/// When `query_in_url` is set, `sql` travels in the `query` URL parameter
/// and the POST body carries only `body` (e.g. NDJSON rows). Otherwise the
/// SQL itself is the POST body.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub sql: String,
    /// Overrides the credentials' default database
    pub database_override: Option<String>,
    /// Sent as `default_format`
    pub format: Option<String>,
    pub compress: bool,
    pub settings: Settings,
    pub timeout_ms: u64,
    pub wait_end_of_query: bool,
    pub query_in_url: bool,
    pub body: Option<Vec<u8>>,
    /// Applied over the default headers
    pub request_headers: IndexMap<String, String>,
    pub gzip_request: bool,
}

impl RequestOptions {
    /// Create a request sending `sql` as the POST body with default options
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            database_override: None,
            format: None,
            compress: true,
            settings: Settings::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            wait_end_of_query: false,
            query_in_url: false,
            body: None,
            request_headers: IndexMap::new(),
            gzip_request: false,
        }
    }

    pub fn database(mut self, database: Option<impl Into<String>>) -> Self {
        self.database_override = database.map(Into::into);
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn setting(
        mut self,
        key: impl Into<String>,
        value: impl Into<crate::SettingValue>,
    ) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings.extend(settings);
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn wait_end_of_query(mut self, wait: bool) -> Self {
        self.wait_end_of_query = wait;
        self
    }

    /// Move the SQL into the URL and send `body` as the payload
    pub fn with_payload(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.query_in_url = true;
        self.body = Some(body.into());
        self
    }

    pub fn query_in_url(mut self, query_in_url: bool) -> Self {
        self.query_in_url = query_in_url;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_headers.insert(name.into(), value.into());
        self
    }

    pub fn gzip_request(mut self, gzip: bool) -> Self {
        self.gzip_request = gzip;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Bytes sent as the POST body before optional compression
    pub fn payload(&self) -> Vec<u8> {
        match &self.body {
            Some(body) => body.clone(),
            None if self.query_in_url => Vec::new(),
            None => self.sql.as_bytes().to_vec(),
        }
    }
}
