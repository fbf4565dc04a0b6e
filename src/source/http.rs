//! REST data source
//!
//! Reads ordered pages from an HTTP endpoint:
//!
//! ```text
//! GET {base_url}/{path}?order_by={field}&direction=asc|desc&limit={n}[&start_after={cursor}]
//!
//! { "records": [ { "cursor": "...", "data": { ... } } ] }
//! ```
//!
//! Parameter names are configurable. Retries are left to the caller.

use super::types::{DataSource, PageRequest};
use crate::error::{Error, Result};
use crate::types::{JsonValue, Page, Record};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration for the HTTP data source
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Base URL collection paths are appended to
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Headers sent with every request
    pub default_headers: HashMap<String, String>,
    /// Query parameter carrying the ordering field
    pub order_by_param: String,
    /// Query parameter carrying `asc` / `desc`
    pub direction_param: String,
    /// Query parameter carrying the page size
    pub limit_param: String,
    /// Query parameter carrying the resume cursor
    pub cursor_param: String,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(30),
            user_agent: format!("scrollpage/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
            order_by_param: "order_by".to_string(),
            direction_param: "direction".to_string(),
            limit_param: "limit".to_string(),
            cursor_param: "start_after".to_string(),
        }
    }
}

impl HttpSourceConfig {
    /// Create a new config builder
    pub fn builder(base_url: impl Into<String>) -> HttpSourceConfigBuilder {
        HttpSourceConfigBuilder {
            config: Self {
                base_url: base_url.into(),
                ..Self::default()
            },
        }
    }
}

/// Builder for HTTP source config
#[derive(Debug)]
pub struct HttpSourceConfigBuilder {
    config: HttpSourceConfig,
}

impl HttpSourceConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Rename the cursor query parameter
    pub fn cursor_param(mut self, name: impl Into<String>) -> Self {
        self.config.cursor_param = name.into();
        self
    }

    /// Rename the page size query parameter
    pub fn limit_param(mut self, name: impl Into<String>) -> Self {
        self.config.limit_param = name.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpSourceConfig {
        self.config
    }
}

#[derive(Debug, Deserialize)]
struct PageBody {
    #[serde(default)]
    records: Vec<Record<JsonValue>>,
}

/// Data source reading pages from a REST endpoint
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    config: HttpSourceConfig,
}

impl HttpSource {
    /// Create a source with default settings for `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(HttpSourceConfig::builder(base_url).build())
    }

    /// Create a source with custom configuration
    pub fn with_config(config: HttpSourceConfig) -> Result<Self> {
        // Fail on a malformed base URL before any fetch is issued
        Url::parse(&config.base_url)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the source configuration
    pub fn config(&self) -> &HttpSourceConfig {
        &self.config
    }

    /// Build the request URL for a page request
    pub fn page_url(&self, request: &PageRequest) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            request.path.trim_start_matches('/')
        ))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair(&self.config.order_by_param, &request.field);
            query.append_pair(&self.config.direction_param, request.direction.as_str());
            query.append_pair(&self.config.limit_param, &request.limit.to_string());
            if let Some(cursor) = &request.after {
                query.append_pair(&self.config.cursor_param, cursor.as_str());
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl DataSource for HttpSource {
    type Item = JsonValue;

    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<JsonValue>> {
        let url = self.page_url(request)?;
        debug!("Fetching page: GET {}", url);

        let mut req = self.client.get(url.clone());
        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_ms: self.config.timeout.as_millis() as u64,
                }
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Page request failed: GET {} -> {}", url, status);
            return Err(Error::http_status(status.as_u16(), body));
        }

        let body: PageBody = response.json().await?;
        debug!("Fetched {} records from {}", body.records.len(), request.path);
        Ok(Page::new(body.records))
    }
}
