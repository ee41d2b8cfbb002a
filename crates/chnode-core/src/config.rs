//! Explicit defaults for the node's tunables

use serde::{Deserialize, Serialize};

/// Default HTTP interface port
pub const DEFAULT_PORT: u16 = 8123;

/// Default per-request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Default number of rows sent per insert request
pub const DEFAULT_BATCH_SIZE: i64 = 1000;

/// Default page size for queries
pub const DEFAULT_QUERY_LIMIT: i64 = 100;

/// Database used when neither parameters nor credentials name one
pub const FALLBACK_DATABASE: &str = "default";

/// Defaults applied when the host leaves a parameter unset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeDefaults {
    pub timeout_ms: u64,
    pub compress: bool,
    pub batch_size: i64,
    pub limit: i64,
}

impl Default for NodeDefaults {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            compress: true,
            batch_size: DEFAULT_BATCH_SIZE,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}
