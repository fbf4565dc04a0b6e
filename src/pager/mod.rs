//! Pagination engine module
//!
//! Incremental, cursor-based retrieval with an accumulated result set.
//!
//! # Overview
//!
//! The pager module provides:
//! - `Pager` - Session state machine: `init`, `more`, scroll handling
//! - `Accumulator` - Ordered fold of fetched pages (append or prepend)
//! - `FetchHandle` / `FetchOutcome` - Result of a background fetch
//! - `FetchFailure` - Failure published on the error channel
//!
//! # Session lifecycle
//!
//! ```text
//! init ──► fetch #1 ──► merge ──► more ──► fetch #n ──► merge ──► ... ──► empty page ──► done
//!                  ▲                                                         │
//!                  └──────────────── init (new session, epoch + 1) ◄─────────┘
//! ```

mod engine;
mod types;

pub use engine::Pager;
pub use types::{Accumulator, FetchFailure, FetchHandle, FetchOutcome, Snapshot};

#[cfg(test)]
mod tests;
