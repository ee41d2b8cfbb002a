//! ClickHouse credentials and their normalization
//!
//! The host hands over whatever it decrypted from credential storage, which
//! may be missing fields or carry them with loose types (a port typed as a
//! string, a checkbox stored as `0`). [`RawCredentials::normalize`] turns
//! that into a fully-defaulted [`Credentials`] value and never fails.

use crate::DEFAULT_PORT;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Transport protocol of the ClickHouse HTTP interface
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

impl Protocol {
    /// Resolve a raw protocol value: anything but exactly `"http"` is HTTPS
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some("http") => Protocol::Http,
            _ => Protocol::Https,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    pub fn is_https(&self) -> bool {
        matches!(self, Protocol::Https)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential record as stored by the host, before defaults are applied
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCredentials {
    #[serde(deserialize_with = "loose_optional_string")]
    pub protocol: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub host: String,
    /// Either a JSON number or a numeric string
    pub port: Option<Value>,
    #[serde(deserialize_with = "loose_string")]
    pub username: String,
    #[serde(deserialize_with = "loose_string")]
    pub password: String,
    #[serde(deserialize_with = "loose_optional_string")]
    pub default_database: Option<String>,
    /// Coerced with JavaScript truthiness
    pub tls_ignore_ssl: Option<Value>,
    #[serde(deserialize_with = "loose_optional_string")]
    pub ca: Option<String>,
    #[serde(deserialize_with = "loose_optional_string")]
    pub cert: Option<String>,
    #[serde(deserialize_with = "loose_optional_string")]
    pub key: Option<String>,
    #[serde(deserialize_with = "loose_optional_string")]
    pub passphrase: Option<String>,
}

impl RawCredentials {
    /// Apply protocol, port and TLS defaults
    pub fn normalize(self) -> Credentials {
        let protocol = Protocol::from_raw(self.protocol.as_deref());
        let port = resolve_port(self.port.as_ref());
        let tls_ignore_ssl = self.tls_ignore_ssl.as_ref().is_some_and(is_truthy);

        Credentials {
            protocol,
            host: self.host,
            port,
            username: self.username,
            password: self.password,
            default_database: non_empty(self.default_database),
            tls_ignore_ssl,
            tls: TlsMaterial {
                ca: non_empty(self.ca),
                cert: non_empty(self.cert),
                key: non_empty(self.key),
                passphrase: non_empty(self.passphrase),
            },
        }
    }
}

impl fmt::Debug for RawCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawCredentials")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("default_database", &self.default_database)
            .finish_non_exhaustive()
    }
}

/// PEM material for HTTPS connections
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TlsMaterial {
    /// CA certificate(s) trusted in addition to the system roots
    pub ca: Option<String>,
    /// Client certificate for mutual TLS
    pub cert: Option<String>,
    /// Client private key for mutual TLS
    pub key: Option<String>,
    /// Passphrase of an encrypted client key
    pub passphrase: Option<String>,
}

impl TlsMaterial {
    pub fn is_empty(&self) -> bool {
        self.ca.is_none() && self.cert.is_none() && self.key.is_none() && self.passphrase.is_none()
    }
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("ca", &self.ca.is_some())
            .field("cert", &self.cert.is_some())
            .field("key", &self.key.is_some())
            .field("passphrase", &self.passphrase.is_some())
            .finish()
    }
}

/// Fully-defaulted credentials, built fresh for every node execution
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub protocol: Protocol,
    /// Host as configured; the transport strips scheme and trailing slashes
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub default_database: Option<String>,
    pub tls_ignore_ssl: bool,
    pub tls: TlsMaterial,
}

impl Credentials {
    /// Create credentials with default port and no TLS material
    pub fn new(
        protocol: Protocol,
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            protocol,
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: password.into(),
            default_database: None,
            tls_ignore_ssl: false,
            tls: TlsMaterial::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_default_database(mut self, database: impl Into<String>) -> Self {
        self.default_database = non_empty(Some(database.into()));
        self
    }

    pub fn with_tls_ignore_ssl(mut self, ignore: bool) -> Self {
        self.tls_ignore_ssl = ignore;
        self
    }

    pub fn with_tls(mut self, tls: TlsMaterial) -> Self {
        self.tls = tls;
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("default_database", &self.default_database)
            .field("tls_ignore_ssl", &self.tls_ignore_ssl)
            .field("tls", &self.tls)
            .finish_non_exhaustive()
    }
}

fn resolve_port(raw: Option<&Value>) -> u16 {
    let parsed = match raw {
        None | Some(Value::Null) => return DEFAULT_PORT,
        Some(Value::Number(n)) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Some(Value::String(s)) => s.trim().parse::<u16>().ok(),
        Some(_) => None,
    };

    parsed.unwrap_or_else(|| {
        tracing::warn!(port = ?raw, "unusable port in credentials, using {}", DEFAULT_PORT);
        DEFAULT_PORT
    })
}

/// JavaScript-style truthiness of a JSON value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// String form of a scalar credential field
///
/// Numbers and booleans are stringified; null, arrays and objects carry no
/// usable value. Never fails, so a mistyped field cannot surface its value
/// in a deserialization error.
fn scalar_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn loose_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_string(value).unwrap_or_default())
}

fn loose_optional_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_string(value))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
