//! Query configuration
//!
//! A [`QueryConfig`] describes what a pagination session fetches: the
//! collection, the ordering field and direction, the page size and where new
//! pages are merged. It is built once per session from caller overrides and
//! never mutated afterwards.

use crate::error::{Error, Result, ResultExt};
use crate::types::{MergeDirection, SortDirection};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Page size used when the caller does not override it
pub const DEFAULT_LIMIT: u32 = 2;

// ============================================================================
// Overrides
// ============================================================================

/// Caller overrides merged onto the query defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Max records per fetch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Order ascending instead of the default descending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse: Option<bool>,

    /// Merge new pages at the head of the accumulation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepend: Option<bool>,
}

impl QueryOptions {
    /// Create empty overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the page size
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Override the sort direction flag
    #[must_use]
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = Some(reverse);
        self
    }

    /// Override the merge direction flag
    #[must_use]
    pub fn prepend(mut self, prepend: bool) -> Self {
        self.prepend = Some(prepend);
        self
    }
}

// ============================================================================
// QueryConfig
// ============================================================================

/// Validated, immutable description of a pagination session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryConfig {
    path: String,
    field: String,
    limit: u32,
    reverse: bool,
    prepend: bool,
}

impl QueryConfig {
    /// Merge `options` onto the defaults and validate the result.
    ///
    /// Fails with [`Error::MissingConfigField`] for an empty `path` or `field`
    /// and [`Error::InvalidConfigValue`] for a zero `limit`.
    pub fn build(
        path: impl Into<String>,
        field: impl Into<String>,
        options: QueryOptions,
    ) -> Result<Self> {
        let path = path.into();
        let field = field.into();

        if path.trim().is_empty() {
            return Err(Error::missing_field("path"));
        }
        if field.trim().is_empty() {
            return Err(Error::missing_field("field"));
        }

        let limit = options.limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 {
            return Err(Error::invalid_value("limit", "must be greater than zero"));
        }

        Ok(Self {
            path,
            field,
            limit,
            reverse: options.reverse.unwrap_or(false),
            prepend: options.prepend.unwrap_or(false),
        })
    }

    /// Identifier of the target collection
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Attribute used for ordering
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Max records per fetch
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Whether ascending order replaces the default descending order
    pub fn reverse(&self) -> bool {
        self.reverse
    }

    /// Whether new pages are merged at the head
    pub fn prepend(&self) -> bool {
        self.prepend
    }

    /// Order requested from the data source
    pub fn sort_direction(&self) -> SortDirection {
        if self.reverse {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }

    /// End of the accumulation new pages are merged at
    pub fn merge_direction(&self) -> MergeDirection {
        if self.prepend {
            MergeDirection::Prepend
        } else {
            MergeDirection::Append
        }
    }
}

// ============================================================================
// Query Files
// ============================================================================

/// Query definition as written in a YAML or JSON file
///
/// ```yaml
/// path: cats
/// field: name
/// limit: 10
/// reverse: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Collection path
    pub path: String,

    /// Ordering field
    pub field: String,

    /// Optional overrides
    #[serde(flatten)]
    pub options: QueryOptions,
}

impl QuerySpec {
    /// Validate into a [`QueryConfig`]
    pub fn into_config(self) -> Result<QueryConfig> {
        QueryConfig::build(self.path, self.field, self.options)
    }

    /// Read a query definition from a YAML or JSON file without validating it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            read => read.with_context(|| {
                format!("Failed to read query file '{}'", path.display())
            })?,
        };
        Self::parse(&content)
    }

    /// Parse a query definition.
    ///
    /// YAML is a superset of JSON, so both formats are accepted.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Load and validate a query definition from a YAML or JSON file
pub fn load_query(path: impl AsRef<Path>) -> Result<QueryConfig> {
    QuerySpec::from_file(path)?.into_config()
}

/// Parse and validate a query definition
pub fn load_query_from_str(content: &str) -> Result<QueryConfig> {
    QuerySpec::parse(content)?.into_config()
}
