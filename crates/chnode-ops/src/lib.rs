//! chnode Ops - the operations behind each node resource
//!
//! Every operation takes a [`chnode_transport::ClickHouseClient`] and a
//! plain request struct, issues its requests sequentially, and shapes the
//! responses into records for the host:
//!
//! - [`execute_query`] - paginated `SELECT` via `LIMIT`/`OFFSET` wrapping
//! - [`execute_insert`] - batched NDJSON inserts (`FORMAT JSONEachRow`)
//! - [`execute_command`] - DDL/DML executed for effect
//! - [`list_databases`], [`list_tables`], [`list_columns`] - introspection

mod command;
mod envelope;
mod insert;
mod metadata;
mod query;

#[cfg(test)]
mod testing;

pub use command::*;
pub use envelope::*;
pub use insert::*;
pub use metadata::*;
pub use query::*;
