//! Pager types
//!
//! Accumulation, fetch outcomes and the handles returned for in-flight
//! fetches.

use crate::error::{Error, Result};
use crate::types::{MergeDirection, Record};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Shared, immutable view of a record sequence as published to observers
pub type Snapshot<T> = Arc<Vec<Record<T>>>;

// ============================================================================
// Accumulator
// ============================================================================

/// Ordered fold of every page fetched in a session.
///
/// Pages are merged whole at the configured end; records already merged are
/// never reordered.
#[derive(Debug, Clone)]
pub struct Accumulator<T> {
    records: VecDeque<Record<T>>,
    direction: MergeDirection,
}

impl<T> Accumulator<T> {
    /// Create an empty accumulator merging at `direction`
    pub fn new(direction: MergeDirection) -> Self {
        Self {
            records: VecDeque::new(),
            direction,
        }
    }

    /// Merge direction this accumulator was created with
    pub fn direction(&self) -> MergeDirection {
        self.direction
    }

    /// Merge a page, keeping its internal order
    pub fn merge(&mut self, page: Vec<Record<T>>) {
        match self.direction {
            MergeDirection::Append => self.records.extend(page),
            MergeDirection::Prepend => {
                for record in page.into_iter().rev() {
                    self.records.push_front(record);
                }
            }
        }
    }

    /// Number of accumulated records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been merged yet
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in accumulated order
    pub fn iter(&self) -> impl Iterator<Item = &Record<T>> {
        self.records.iter()
    }
}

impl<T: Clone> Accumulator<T> {
    /// Copy the accumulated records into a publishable snapshot
    pub fn snapshot(&self) -> Snapshot<T> {
        Arc::new(self.records.iter().cloned().collect())
    }
}

// ============================================================================
// Fetch Outcomes
// ============================================================================

/// How a completed fetch affected the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A non-empty page was merged
    Merged {
        /// Records in the fetched page
        fetched: usize,
        /// Accumulated records after the merge
        total: usize,
    },
    /// The source returned an empty page; the session is done
    Exhausted,
    /// The session was replaced before the fetch completed; result dropped
    Stale,
}

impl FetchOutcome {
    /// Check if a page was merged
    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged { .. })
    }

    /// Check if the session is now exhausted
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// Check if the result was discarded
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }
}

/// A failed fetch as published on the error channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    /// Session the fetch belonged to
    pub session: u64,
    /// Collection path that was fetched
    pub path: String,
    /// Error message
    pub message: String,
    /// Whether calling `more()` again may succeed
    pub retryable: bool,
}

impl FetchFailure {
    pub(crate) fn new(session: u64, path: &str, error: &Error) -> Self {
        Self {
            session,
            path: path.to_string(),
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

// ============================================================================
// Fetch Handle
// ============================================================================

/// Handle to a fetch running in the background.
///
/// Dropping the handle does not cancel the fetch; its completion is still
/// applied to the pager.
#[derive(Debug)]
pub struct FetchHandle {
    session: u64,
    handle: JoinHandle<Result<FetchOutcome>>,
}

impl FetchHandle {
    pub(crate) fn new(session: u64, handle: JoinHandle<Result<FetchOutcome>>) -> Self {
        Self { session, handle }
    }

    /// Session this fetch was issued for
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Whether the fetch has completed
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the fetch to complete and return its outcome or error
    pub async fn wait(self) -> Result<FetchOutcome> {
        self.handle
            .await
            .map_err(|e| Error::task(format!("fetch task did not complete: {e}")))?
    }
}
