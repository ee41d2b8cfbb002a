//! Execution through the host's HTTP helper

use crate::{HttpExecutor, HttpRequest, normalize_response, transport_error};
use async_trait::async_trait;
use chnode_core::{BoxError, ClickHouseResponse, Redactor};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Request body handed to the host: text when possible, bytes otherwise
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HostBody {
    Text(String),
    Binary(Vec<u8>),
}

impl HostBody {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            HostBody::Text(text) => text.as_bytes(),
            HostBody::Binary(bytes) => bytes,
        }
    }
}

impl std::fmt::Debug for HostBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostBody::Text(text) => write!(f, "Text({} bytes)", text.len()),
            HostBody::Binary(bytes) => write!(f, "Binary({} bytes)", bytes.len()),
        }
    }
}

/// Options understood by the host's generic HTTP helper
///
/// The helper is asked for the full response without raising on HTTP
/// error statuses, so classification stays with the client.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRequestOptions {
    pub method: String,
    pub url: String,
    pub body: HostBody,
    pub headers: IndexMap<String, String>,
    /// Milliseconds
    pub timeout: u64,
    pub encoding: String,
    pub json: bool,
    pub return_full_response: bool,
    pub ignore_http_status_errors: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_ssl_certificate_validation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
}

impl HostRequestOptions {
    pub fn from_request(request: &HttpRequest) -> Self {
        let body = if request.is_gzip() {
            HostBody::Binary(request.body.clone())
        } else {
            match String::from_utf8(request.body.clone()) {
                Ok(text) => HostBody::Text(text),
                Err(err) => HostBody::Binary(err.into_bytes()),
            }
        };
        let https = request.protocol.is_https();

        Self {
            method: "POST".to_string(),
            url: request.url.clone(),
            body,
            headers: request.headers.clone(),
            timeout: u64::try_from(request.timeout.as_millis()).unwrap_or(u64::MAX),
            encoding: "text".to_string(),
            json: false,
            return_full_response: true,
            ignore_http_status_errors: true,
            skip_ssl_certificate_validation: https.then_some(request.tls_ignore_ssl),
            ca: request.tls.ca.clone().filter(|_| https),
            cert: request.tls.cert.clone().filter(|_| https),
            key: request.tls.key.clone().filter(|_| https),
            passphrase: request.tls.passphrase.clone().filter(|_| https),
        }
    }
}

impl std::fmt::Debug for HostRequestOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header_names: Vec<&str> = self.headers.keys().map(String::as_str).collect();
        f.debug_struct("HostRequestOptions")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("body", &self.body)
            .field("headers", &header_names)
            .field("timeout", &self.timeout)
            .field(
                "skip_ssl_certificate_validation",
                &self.skip_ssl_certificate_validation,
            )
            .finish_non_exhaustive()
    }
}

/// The host's HTTP helper
///
/// Returns the helper's raw result; it is classified and normalized by
/// [`crate::HostResponse`]. Any closure of the right shape implements it.
#[async_trait]
pub trait HostHttp: Send + Sync {
    async fn http_request(&self, options: HostRequestOptions) -> Result<Value, BoxError>;
}

#[async_trait]
impl<F, Fut> HostHttp for F
where
    F: Fn(HostRequestOptions) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    async fn http_request(&self, options: HostRequestOptions) -> Result<Value, BoxError> {
        (self)(options).await
    }
}

/// Executor that delegates the network call to the host
#[derive(Clone)]
pub struct DelegateExecutor {
    host: Arc<dyn HostHttp>,
}

impl DelegateExecutor {
    pub fn new(host: Arc<dyn HostHttp>) -> Self {
        Self { host }
    }
}

impl std::fmt::Debug for DelegateExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegateExecutor").finish_non_exhaustive()
    }
}

#[async_trait]
impl HttpExecutor for DelegateExecutor {
    fn name(&self) -> &'static str {
        "host"
    }

    async fn execute(
        &self,
        request: &HttpRequest,
        redactor: &Redactor,
    ) -> chnode_core::Result<ClickHouseResponse> {
        let options = HostRequestOptions::from_request(request);
        let value = self
            .host
            .http_request(options)
            .await
            .map_err(|err| transport_error(err, redactor))?;

        Ok(normalize_response(value, redactor))
    }
}
