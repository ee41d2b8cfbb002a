//! chnode - ClickHouse integration node for workflow-automation hosts
//!
//! The host loads the node as a plugin and drives it through an
//! [`ExecutionContext`]: it supplies input items, resolved parameters,
//! decrypted credentials and (optionally) its own HTTP helper.
//! [`ClickHouseNode::execute`] dispatches on the `resource`/`operation`
//! parameters and returns one [`NodeRecord`] per output item.
//!
//! ```ignore
//! let ctx = StaticContext::from_json(serde_json::json!({
//!     "credentials": {"protocol": "http", "host": "localhost", "username": "default"},
//!     "parameters": {"resource": "query", "operation": "executeQuery", "query": "SELECT 1"},
//!     "items": [{}],
//! }))?;
//! let records = ClickHouseNode::default().execute(&ctx).await?;
//! ```

mod context;
mod node;
mod params;
mod record;

pub use context::*;
pub use node::*;
pub use params::*;
pub use record::*;

pub use chnode_core::{ChNodeError, JsonObject, NodeDefaults, RawCredentials, Result};
pub use chnode_ops::LoadOption;
