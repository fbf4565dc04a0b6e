//! Common types used throughout scrollpage
//!
//! This module contains the record/page/cursor vocabulary shared by the
//! pagination engine, the data sources and the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

// ============================================================================
// Cursor
// ============================================================================

/// Opaque handle identifying a record's position in a source's total order.
///
/// Only the data source that produced a cursor knows how to interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Create a cursor from its encoded form
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Encoded form of the cursor
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the cursor, returning its encoded form
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Records and Pages
// ============================================================================

/// A fetched payload together with the cursor needed to resume after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    /// Position of this record in the source order
    pub cursor: Cursor,
    /// The record payload
    pub data: T,
}

impl<T> Record<T> {
    /// Create a new record
    pub fn new(cursor: Cursor, data: T) -> Self {
        Self { cursor, data }
    }
}

/// Records returned by a single fetch, in source order.
///
/// An empty page means the source has nothing left after the requested cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    records: Vec<Record<T>>,
}

impl<T> Page<T> {
    /// Create a page from fetched records
    pub fn new(records: Vec<Record<T>>) -> Self {
        Self { records }
    }

    /// An empty page
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Number of records in the page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the page signals exhaustion
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in fetch order
    pub fn records(&self) -> &[Record<T>] {
        &self.records
    }

    /// Consume the page, returning its records
    pub fn into_records(self) -> Vec<Record<T>> {
        self.records
    }
}

impl<T> From<Vec<Record<T>>> for Page<T> {
    fn from(records: Vec<Record<T>>) -> Self {
        Self::new(records)
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}

// ============================================================================
// Ordering and Merge Direction
// ============================================================================

/// Sort direction requested from the data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest values first
    Ascending,
    /// Largest values first
    #[default]
    Descending,
}

impl SortDirection {
    /// Short query-string form (`asc` / `desc`)
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where newly fetched pages land in the accumulated sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeDirection {
    /// New pages go after everything fetched so far
    #[default]
    Append,
    /// New pages go before everything fetched so far
    Prepend,
}

// ============================================================================
// Scroll Signal
// ============================================================================

/// Scroll position events emitted by a scrollable view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollEvent {
    /// The view reached its top edge
    Top,
    /// The view reached its bottom edge
    Bottom,
}
