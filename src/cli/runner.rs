//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, QueryArgs};
use crate::config::{QueryConfig, QuerySpec};
use crate::error::{Error, Result};
use crate::pager::{FetchOutcome, Pager};
use crate::source::{DataSource, HttpSource, HttpSourceConfig, MemorySource};
use crate::types::{JsonValue, ScrollEvent};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command, writing results to stdout
    pub async fn run(&self) -> Result<()> {
        let mut stdout = std::io::stdout();
        self.run_with_output(&mut stdout).await
    }

    /// Run the CLI command, writing results to `out`
    pub async fn run_with_output(&self, out: &mut (dyn Write + Send)) -> Result<()> {
        match &self.cli.command {
            Commands::Browse {
                query,
                data,
                url,
                headers,
                pages,
            } => {
                let config = resolve_query(query)?;
                match (data, url) {
                    (Some(data), _) => {
                        let source = MemorySource::from_json_file(data)?;
                        self.browse(source, config, *pages, out).await
                    }
                    (None, Some(url)) => {
                        let source = build_http_source(url, headers)?;
                        self.browse(source, config, *pages, out).await
                    }
                    (None, None) => Err(Error::config(
                        "No data source specified (use --data or --url)",
                    )),
                }
            }
            Commands::Validate { query } => self.validate(query, out),
        }
    }

    /// Drive a session: first page, then one reached-bottom signal per page
    async fn browse<S>(
        &self,
        source: S,
        config: QueryConfig,
        pages: Option<usize>,
        out: &mut (dyn Write + Send),
    ) -> Result<()>
    where
        S: DataSource<Item = JsonValue>,
    {
        let start = Instant::now();
        let pager = Pager::new(source);

        let mut page_count = 0;
        if let FetchOutcome::Merged { fetched, total } = pager.start(config).wait().await? {
            page_count += 1;
            self.write_page(out, &pager, page_count, fetched, total)?;
        }

        let mut signals = 0;
        loop {
            if pages.is_some_and(|max| signals >= max) {
                break;
            }
            let Some(handle) = pager.on_scroll(ScrollEvent::Bottom) else {
                break;
            };
            signals += 1;

            if let FetchOutcome::Merged { fetched, total } = handle.wait().await? {
                page_count += 1;
                self.write_page(out, &pager, page_count, fetched, total)?;
            }
        }

        let total = pager.accumulated().len();
        let done = pager.is_done();
        info!(
            pages = page_count,
            total,
            done,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Browse finished"
        );

        match self.cli.format {
            OutputFormat::Json => {
                writeln!(
                    out,
                    "{}",
                    json!({ "pages": page_count, "total": total, "done": done })
                )?;
            }
            OutputFormat::Pretty => {
                let state = if done { "exhausted" } else { "more available" };
                writeln!(out, "{total} records in {page_count} pages ({state})")?;
            }
        }
        Ok(())
    }

    fn write_page<S>(
        &self,
        out: &mut (dyn Write + Send),
        pager: &Pager<S>,
        page: usize,
        fetched: usize,
        total: usize,
    ) -> Result<()>
    where
        S: DataSource<Item = JsonValue>,
    {
        let records = pager.items();
        match self.cli.format {
            OutputFormat::Json => {
                let line = json!({
                    "page": page,
                    "fetched": fetched,
                    "total": total,
                    "records": records,
                });
                writeln!(out, "{line}")?;
            }
            OutputFormat::Pretty => {
                writeln!(out, "── page {page}: +{fetched} ({total} total)")?;
                for record in &records {
                    writeln!(out, "  {record}")?;
                }
            }
        }
        Ok(())
    }

    /// Load a query file and print the resolved configuration
    fn validate(&self, path: &Path, out: &mut (dyn Write + Send)) -> Result<()> {
        let config = QuerySpec::from_file(path)?.into_config()?;
        match self.cli.format {
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&config)?)?,
            OutputFormat::Pretty => {
                writeln!(out, "✓ Query is valid")?;
                writeln!(out, "  path:    {}", config.path())?;
                writeln!(out, "  field:   {} ({})", config.field(), config.sort_direction())?;
                writeln!(out, "  limit:   {}", config.limit())?;
                writeln!(out, "  prepend: {}", config.prepend())?;
            }
        }
        Ok(())
    }
}

/// Merge a query file with command-line flags; flags take precedence
pub(crate) fn resolve_query(args: &QueryArgs) -> Result<QueryConfig> {
    let mut spec = match &args.query {
        Some(path) => QuerySpec::from_file(path)?,
        None => QuerySpec {
            path: String::new(),
            field: String::new(),
            options: Default::default(),
        },
    };

    if let Some(path) = &args.path {
        spec.path.clone_from(path);
    }
    if let Some(field) = &args.field {
        spec.field.clone_from(field);
    }
    if let Some(limit) = args.limit {
        spec.options.limit = Some(limit);
    }
    if args.reverse.is_some() {
        spec.options.reverse = args.reverse;
    }
    if args.prepend.is_some() {
        spec.options.prepend = args.prepend;
    }

    spec.into_config()
}

pub(crate) fn build_http_source(url: &str, headers: &[String]) -> Result<HttpSource> {
    let mut builder = HttpSourceConfig::builder(url);
    for header in headers {
        let (key, value) = header.split_once(':').ok_or_else(|| {
            Error::invalid_value("header", format!("expected KEY:VALUE, got '{header}'"))
        })?;
        builder = builder.header(key.trim(), value.trim());
    }
    HttpSource::with_config(builder.build())
}
