// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # scrollpage
//!
//! Incremental, cursor-based retrieval of ordered records for scroll-driven
//! views. A [`Pager`] fetches one bounded page at a time from a
//! [`DataSource`], folds every page into an accumulated sequence and
//! publishes that sequence, plus `loading` / `done` flags, to observers.
//!
//! ## Features
//!
//! - **Cursor Pagination**: Resume strictly after the last fetched record
//! - **Append or Prepend**: Merge new pages at the tail or the head
//! - **Single Flight**: At most one fetch in flight; no fetch after exhaustion
//! - **Observable State**: `tokio::sync::watch` channels and a `Stream` of snapshots
//! - **Session Epochs**: Re-initialising drops results of stale fetches
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use scrollpage::{MemorySource, Pager, QueryOptions, ScrollEvent};
//!
//! #[tokio::main]
//! async fn main() -> scrollpage::Result<()> {
//!     let source = MemorySource::from_json_file("cats.json")?;
//!     let pager = Pager::new(source);
//!
//!     pager.init("cats", "name", QueryOptions::new().reverse(true))?;
//!
//!     let mut items = pager.accumulated_stream();
//!     while let Some(snapshot) = items.next().await {
//!         println!("{} cats", snapshot.len());
//!         // the view reached its bottom edge
//!         pager.on_scroll(ScrollEvent::Bottom);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Pager                               │
//! │  init(path, field, options)   more()   on_scroll(event)      │
//! │  accumulated ◄─ merge ◄─ page     loading     done    errors  │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ PageRequest { after: cursor }
//! ┌──────────────────────────────┴───────────────────────────────┐
//! │                        DataSource                            │
//! ├─────────────────────────────┬────────────────────────────────┤
//! │ MemorySource (JSON docs)    │ HttpSource (REST, reqwest)     │
//! └─────────────────────────────┴────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![warn(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types: records, pages, cursors, directions
pub mod types;

/// Query configuration
pub mod config;

/// Ordered data sources
pub mod source;

/// Pagination engine
pub mod pager;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::{load_query, load_query_from_str, QueryConfig, QueryOptions, QuerySpec};
pub use pager::{FetchFailure, FetchHandle, FetchOutcome, Pager, Snapshot};
pub use source::{DataSource, Document, HttpSource, HttpSourceConfig, MemorySource, PageRequest};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
