//! Data source module
//!
//! Ordered collections the pagination engine reads from.
//!
//! # Overview
//!
//! - `DataSource` - Trait for fetching one bounded, ordered page after a cursor
//! - `MemorySource` - In-memory JSON collections (also loadable from a file)
//! - `HttpSource` - REST endpoint returning `{ "records": [...] }`

mod http;
mod memory;
mod types;

pub use http::{HttpSource, HttpSourceConfig, HttpSourceConfigBuilder};
pub use memory::{Document, MemorySource};
pub use types::{DataSource, PageRequest};
