//! Normalization of whatever the host HTTP helper returns
//!
//! Hosts are loose about response shapes: a full response object with
//! `statusCode`, an already-normalized `{status, headers, body}` record, or
//! just a body value. [`HostResponse::classify`] decides which one it got,
//! in that order, and [`HostResponse::into_response`] turns it into a
//! [`ClickHouseResponse`] before anything downstream looks at it.

use chnode_core::{ClickHouseResponse, HeaderMap, Redactor};
use serde_json::Value;

/// Shapes a host HTTP helper may return
#[derive(Debug, Clone, PartialEq)]
pub enum HostResponse {
    /// `{statusCode, headers, body}`
    Full {
        status_code: Value,
        headers: Value,
        body: Value,
    },
    /// `{status, headers, body}`
    Envelope {
        status: Value,
        headers: Value,
        body: Value,
    },
    /// Anything else is treated as a bare body without status
    Raw(Value),
}

impl HostResponse {
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Object(mut map)
                if map.contains_key("statusCode") && map.contains_key("headers") =>
            {
                HostResponse::Full {
                    status_code: map.remove("statusCode").unwrap_or_default(),
                    headers: map.remove("headers").unwrap_or_default(),
                    body: map.remove("body").unwrap_or_default(),
                }
            }
            Value::Object(mut map)
                if map.contains_key("status")
                    && map.contains_key("headers")
                    && map.contains_key("body") =>
            {
                HostResponse::Envelope {
                    status: map.remove("status").unwrap_or_default(),
                    headers: map.remove("headers").unwrap_or_default(),
                    body: map.remove("body").unwrap_or_default(),
                }
            }
            other => HostResponse::Raw(other),
        }
    }

    pub fn into_response(self, redactor: &Redactor) -> ClickHouseResponse {
        match self {
            HostResponse::Full {
                status_code: status,
                headers,
                body,
            }
            | HostResponse::Envelope {
                status,
                headers,
                body,
            } => ClickHouseResponse {
                status: normalize_status(&status),
                headers: normalize_headers(&headers),
                body: normalize_body(body, redactor),
            },
            HostResponse::Raw(body) => ClickHouseResponse {
                status: 0,
                headers: HeaderMap::new(),
                body: normalize_body(body, redactor),
            },
        }
    }
}

/// Classify and normalize a host response in one step
pub fn normalize_response(value: Value, redactor: &Redactor) -> ClickHouseResponse {
    HostResponse::classify(value).into_response(redactor)
}

/// Numeric (or numeric-string) status, `0` when missing or unusable
pub fn normalize_status(status: &Value) -> u16 {
    let raw = match status {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    raw.and_then(|s| u16::try_from(s).ok()).unwrap_or(0)
}

/// Lowercase header keys and join multi-valued headers with `", "`
pub fn normalize_headers(headers: &Value) -> HeaderMap {
    let Some(map) = headers.as_object() else {
        return HeaderMap::new();
    };

    let mut result = HeaderMap::new();
    for (key, value) in map {
        if key.is_empty() || value.is_null() {
            continue;
        }
        let value = match value {
            Value::Array(values) => values
                .iter()
                .map(header_scalar)
                .collect::<Vec<_>>()
                .join(", "),
            other => header_scalar(other),
        };
        result.insert(key.to_ascii_lowercase(), value);
    }
    result
}

fn header_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Turn a response body of any shape into text
///
/// Serialized binary buffers (`{"type": "Buffer", "data": [..]}`) are
/// decoded as UTF-8; other structured values are JSON-stringified.
pub fn normalize_body(body: Value, redactor: &Redactor) -> String {
    match body {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => {
            if let Some(bytes) = buffer_bytes(&other) {
                return String::from_utf8_lossy(&bytes).into_owned();
            }
            serde_json::to_string(&other)
                .unwrap_or_else(|_| redactor.excerpt(&format!("{:?}", other)))
        }
    }
}

fn buffer_bytes(value: &Value) -> Option<Vec<u8>> {
    let map = value.as_object()?;
    if map.get("type").and_then(Value::as_str) != Some("Buffer") {
        return None;
    }
    map.get("data")?
        .as_array()?
        .iter()
        .map(|byte| byte.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect()
}
