//! chnode Transport - the ClickHouse HTTP interface
//!
//! One call to [`ClickHouseClient::request`] issues exactly one POST to
//! `{protocol}://{host}:{port}/?{params}` and returns a normalized
//! [`chnode_core::ClickHouseResponse`], or a redacted error.
//!
//! The network call itself goes through an [`HttpExecutor`]:
//!
//! - [`DirectExecutor`] talks to ClickHouse with `reqwest` (standalone use)
//! - [`DelegateExecutor`] hands the request to the host's HTTP helper
//!
//! Both converge on the same response shape and error semantics.

mod client;
mod delegate;
mod direct;
mod endpoint;
mod executor;
mod gzip;
mod normalize;
mod request;

pub use client::*;
pub use delegate::*;
pub use direct::*;
pub use endpoint::*;
pub use executor::*;
pub use gzip::{gunzip, gzip};
pub use normalize::*;
pub use request::*;
