//! Normalized ClickHouse HTTP response envelope

use indexmap::IndexMap;
use serde::Serialize;

/// Response headers keyed by lowercase name, in arrival order
pub type HeaderMap = IndexMap<String, String>;

/// Headers that must never be surfaced to the host
pub const SENSITIVE_HEADERS: [&str; 4] = [
    "authorization",
    "proxy-authorization",
    "set-cookie",
    "cookie",
];

/// Header carrying the server-assigned query id
pub const QUERY_ID_HEADER: &str = "x-clickhouse-query-id";

/// Uniform `{status, headers, body}` triple produced by every execution path
///
/// Header keys are always lowercase, whichever executor produced the
/// response. A status of `0` means no HTTP status was received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClickHouseResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl ClickHouseResponse {
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Look up a header case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// `X-ClickHouse-Query-Id` of the response, if present
    pub fn query_id(&self) -> Option<&str> {
        self.header(QUERY_ID_HEADER)
    }

    /// Status >= 400, or no status at all
    pub fn is_error_status(&self) -> bool {
        self.status >= 400 || self.status == 0
    }
}

/// Drop credential and cookie headers before handing headers to the host
pub fn sanitize_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(key, _)| {
            !SENSITIVE_HEADERS
                .iter()
                .any(|blocked| key.eq_ignore_ascii_case(blocked))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
