//! Error types for chnode

use thiserror::Error;

/// Boxed error used to keep the original cause of a wrapped failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type for chnode operations
///
/// Every message carried here has already been passed through a
/// [`crate::Redactor`]; raw credential values never reach `Display`.
#[derive(Error, Debug)]
pub enum ChNodeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connection, DNS or TLS failure before a response was received
    #[error("ClickHouse request failed: {message}")]
    Transport {
        message: String,
        #[source]
        source: BoxError,
    },

    #[error("ClickHouse request failed: Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// ClickHouse answered with status >= 400, or no status at all
    #[error(
        "ClickHouse request failed with status {status}{}. {detail}",
        status_label(.status_text)
    )]
    Response {
        status: u16,
        status_text: Option<String>,
        detail: String,
    },

    #[error("Failed to parse ClickHouse JSON response. {excerpt}")]
    Parse {
        excerpt: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Compression error: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn status_label(status_text: &Option<String>) -> String {
    match status_text {
        Some(text) if !text.is_empty() => format!(" {}", text),
        _ => String::new(),
    }
}

impl ChNodeError {
    /// Shorthand for a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// HTTP status of a protocol error, if this is one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type alias for chnode operations
pub type Result<T> = std::result::Result<T, ChNodeError>;
