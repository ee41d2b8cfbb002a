//! Endpoint URL and query string construction

use chnode_core::Protocol;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A ClickHouse setting passed as an extra URL parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(true) => f.write_str("1"),
            SettingValue::Bool(false) => f.write_str("0"),
            SettingValue::Int(i) => write!(f, "{}", i),
            SettingValue::Float(x) => write!(f, "{}", x),
            SettingValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Int(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Float(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::Text(value)
    }
}

/// ClickHouse settings in insertion order
pub type Settings = IndexMap<String, SettingValue>;

/// Inputs of [`build_query_string`]
#[derive(Debug, Clone, Default)]
pub struct QueryParams<'a> {
    pub database: Option<&'a str>,
    pub format: Option<&'a str>,
    /// `None` means compression on
    pub compress: Option<bool>,
    pub settings: Option<&'a Settings>,
    pub wait_end_of_query: bool,
    /// SQL text when it travels in the URL instead of the body
    pub query: Option<&'a str>,
}

/// Build the `?...` suffix of a request URL
///
/// Parameters appear in a fixed order: `database`, `default_format`,
/// `enable_http_compression`, `wait_end_of_query`, `query`, then settings.
/// A setting that repeats an earlier key replaces that value in place.
/// Returns an empty string when there are no parameters.
pub fn build_query_string(params: &QueryParams<'_>) -> String {
    let mut pairs: IndexMap<String, String> = IndexMap::new();

    if let Some(database) = params.database.filter(|d| !d.is_empty()) {
        pairs.insert("database".into(), database.into());
    }

    if let Some(format) = params.format.filter(|f| !f.is_empty()) {
        pairs.insert("default_format".into(), format.into());
    }

    let compress = params.compress.unwrap_or(true);
    pairs.insert(
        "enable_http_compression".into(),
        if compress { "1" } else { "0" }.into(),
    );

    if params.wait_end_of_query {
        pairs.insert("wait_end_of_query".into(), "1".into());
    }

    if let Some(query) = params.query.filter(|q| !q.is_empty()) {
        pairs.insert("query".into(), query.into());
    }

    if let Some(settings) = params.settings {
        for (key, value) in settings {
            pairs.insert(key.clone(), value.to_string());
        }
    }

    if pairs.is_empty() {
        return String::new();
    }

    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter())
        .finish();
    format!("?{}", encoded)
}

/// Strip a leading `http://` / `https://` and trailing slashes from a host
pub fn sanitize_host(host: &str) -> &str {
    let trimmed = host.trim();
    let without_scheme = ["https://", "http://"]
        .iter()
        .find_map(|scheme| {
            trimmed
                .get(..scheme.len())
                .filter(|prefix| prefix.eq_ignore_ascii_case(scheme))
                .map(|_| &trimmed[scheme.len()..])
        })
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/')
}

/// `{protocol}://{host}:{port}` with the host sanitized
pub fn build_base_url(protocol: Protocol, host: &str, port: u16) -> String {
    format!("{}://{}:{}", protocol, sanitize_host(host), port)
}
