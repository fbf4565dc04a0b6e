//! Data source types and traits
//!
//! Defines the request shape and the trait every ordered data source
//! implements.

use crate::config::QueryConfig;
use crate::error::Result;
use crate::types::{Cursor, Page, SortDirection};
use async_trait::async_trait;
use std::sync::Arc;

/// A single bounded, ordered fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Collection path
    pub path: String,
    /// Field to order by
    pub field: String,
    /// Sort direction
    pub direction: SortDirection,
    /// Max records to return
    pub limit: u32,
    /// Resume strictly after this position (None = from the beginning)
    pub after: Option<Cursor>,
}

impl PageRequest {
    /// Build the request for a session config, resuming after `after`
    pub fn from_config(config: &QueryConfig, after: Option<Cursor>) -> Self {
        Self {
            path: config.path().to_string(),
            field: config.field().to_string(),
            direction: config.sort_direction(),
            limit: config.limit(),
            after,
        }
    }

    /// Whether this request starts at the beginning of the ordering
    pub fn is_first(&self) -> bool {
        self.after.is_none()
    }
}

/// An ordered collection that can be read page by page.
///
/// Implementations must provide a stable, resumable order by
/// `request.field`: fetching after a record's cursor yields exactly the
/// records that follow it. An empty page means nothing follows the cursor.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// Payload type of fetched records
    type Item: Clone + Send + Sync + 'static;

    /// Fetch up to `request.limit` records
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<Self::Item>>;
}

#[async_trait]
impl<S: DataSource> DataSource for Arc<S> {
    type Item = S::Item;

    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<Self::Item>> {
        (**self).fetch_page(request).await
    }
}
