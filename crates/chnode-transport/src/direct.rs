//! Direct execution with `reqwest`, for running outside the host

use crate::{HttpExecutor, HttpRequest, gunzip, transport_error};
use async_trait::async_trait;
use chnode_core::{ChNodeError, ClickHouseResponse, HeaderMap, Redactor, Result};

/// Executor that opens its own connection for every request
///
/// A fresh `reqwest::Client` is built per call with idle pooling disabled,
/// so no connection outlives the request.
#[derive(Debug, Clone, Default)]
pub struct DirectExecutor;

impl DirectExecutor {
    pub fn new() -> Self {
        Self
    }

    fn build_client(&self, request: &HttpRequest, redactor: &Redactor) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(request.timeout)
            .pool_max_idle_per_host(0);

        if request.protocol.is_https() {
            builder = builder.danger_accept_invalid_certs(request.tls_ignore_ssl);

            if let Some(ca) = &request.tls.ca {
                let certs = reqwest::Certificate::from_pem_bundle(ca.as_bytes()).map_err(|e| {
                    ChNodeError::configuration(format!("Invalid CA certificate: {}", e))
                })?;
                for cert in certs {
                    builder = builder.add_root_certificate(cert);
                }
            }

            if request.tls.passphrase.is_some() {
                return Err(ChNodeError::configuration(
                    "Encrypted client keys are not supported; provide an unencrypted PEM key",
                ));
            }

            match (&request.tls.cert, &request.tls.key) {
                (Some(cert), Some(key)) => {
                    let pem = format!("{}\n{}", cert.trim_end(), key.trim_end());
                    let identity = reqwest::Identity::from_pem(pem.as_bytes()).map_err(|e| {
                        ChNodeError::configuration(format!("Invalid client certificate: {}", e))
                    })?;
                    builder = builder.identity(identity);
                }
                (Some(_), None) | (None, Some(_)) => {
                    return Err(ChNodeError::configuration(
                        "Client certificate and client key must be provided together",
                    ));
                }
                (None, None) => {}
            }
        }

        builder
            .build()
            .map_err(|e| transport_error(e, redactor))
    }
}

#[async_trait]
impl HttpExecutor for DirectExecutor {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn execute(
        &self,
        request: &HttpRequest,
        redactor: &Redactor,
    ) -> Result<ClickHouseResponse> {
        let client = self.build_client(request, redactor)?;

        let mut builder = client.post(&request.url).body(request.body.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let timeout_ms = u64::try_from(request.timeout.as_millis()).unwrap_or(u64::MAX);
        let map_err = |err: reqwest::Error| {
            if err.is_timeout() {
                ChNodeError::Timeout { timeout_ms }
            } else {
                transport_error(err, redactor)
            }
        };

        let response = builder.send().await.map_err(map_err)?;
        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let raw = response.bytes().await.map_err(map_err)?;

        let encoding = headers
            .get("content-encoding")
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();
        let bytes = if encoding.contains("gzip") {
            gunzip(&raw).map_err(|e| transport_error(e, redactor))?
        } else {
            raw.to_vec()
        };

        tracing::trace!(status, body_bytes = bytes.len(), "direct response received");
        Ok(ClickHouseResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn collect_headers(headers: &reqwest::header::HeaderMap) -> HeaderMap {
    let mut result = HeaderMap::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        result.insert(name.as_str().to_ascii_lowercase(), joined);
    }
    result
}
