//! The seam between request construction and the network

use async_trait::async_trait;
use chnode_core::{BoxError, ChNodeError, ClickHouseResponse, Protocol, Redactor, TlsMaterial};
use indexmap::IndexMap;
use std::time::Duration;

/// A fully-built POST request, ready to hand to an executor
#[derive(Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: IndexMap<String, String>,
    pub body: Vec<u8>,
    pub timeout: Duration,
    pub protocol: Protocol,
    pub tls_ignore_ssl: bool,
    pub tls: TlsMaterial,
}

impl HttpRequest {
    /// Case-insensitive lookup of a request header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the body was gzip-compressed before sending
    pub fn is_gzip(&self) -> bool {
        self.header("content-encoding")
            .is_some_and(|v| v.eq_ignore_ascii_case("gzip"))
    }
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header_names: Vec<&str> = self.headers.keys().map(String::as_str).collect();
        f.debug_struct("HttpRequest")
            .field("url", &self.url)
            .field("headers", &header_names)
            .field("body_bytes", &self.body.len())
            .field("timeout", &self.timeout)
            .field("protocol", &self.protocol)
            .field("tls_ignore_ssl", &self.tls_ignore_ssl)
            .finish()
    }
}

/// Performs the network call for a built request
///
/// Implementations return HTTP error statuses as ordinary responses; the
/// client classifies them. Only failures without a response are errors,
/// and their messages must already be redacted.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Short name used in tracing output
    fn name(&self) -> &'static str;

    async fn execute(
        &self,
        request: &HttpRequest,
        redactor: &Redactor,
    ) -> chnode_core::Result<ClickHouseResponse>;
}

/// Wrap a failure that happened before any response arrived
pub fn transport_error<E>(error: E, redactor: &Redactor) -> ChNodeError
where
    E: Into<BoxError>,
{
    let source: BoxError = error.into();
    let message = redactor.redact(&error_chain_message(&*source));
    ChNodeError::Transport { message, source }
}

/// Render an error and its sources as `outer: inner: root`
pub fn error_chain_message(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut current = error.source();
    while let Some(cause) = current {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        current = cause.source();
    }
    message
}
