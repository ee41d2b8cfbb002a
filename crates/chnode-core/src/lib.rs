//! chnode Core - shared types for the ClickHouse integration node
//!
//! This crate holds everything the transport, operation and orchestrator
//! crates agree on:
//!
//! - `ChNodeError` - the error taxonomy surfaced to the host
//! - `RawCredentials` / `Credentials` - credential normalization
//! - `Redactor` - scrubbing of credentials from error text
//! - `ClickHouseResponse` - the normalized `{status, headers, body}` envelope
//! - `NodeDefaults` - explicit defaults for timeouts, batch sizes and limits

mod config;
mod credentials;
mod error;
mod redact;
mod response;

pub use config::*;
pub use credentials::*;
pub use error::*;
pub use redact::*;
pub use response::*;

/// A JSON object as exchanged with ClickHouse and the host (rows, meta, records)
pub type JsonObject = serde_json::Map<String, serde_json::Value>;
