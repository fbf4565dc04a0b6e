//! CLI commands and argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Page through ordered collections the way a scrolling view would
#[derive(Parser, Debug)]
#[command(name = "scrollpage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a session and keep requesting pages until the source is exhausted
    Browse {
        /// Query selection
        #[command(flatten)]
        query: QueryArgs,

        /// JSON data file mapping collection paths to document arrays
        #[arg(long, conflicts_with = "url", required_unless_present = "url")]
        data: Option<PathBuf>,

        /// Base URL of a REST source
        #[arg(long)]
        url: Option<String>,

        /// Extra request header for the REST source (KEY:VALUE, repeatable)
        #[arg(long = "header", requires = "url")]
        headers: Vec<String>,

        /// Stop after this many reached-bottom signals (default: until done)
        #[arg(long)]
        pages: Option<usize>,
    },

    /// Load a query file and print the resolved configuration
    Validate {
        /// Query file (YAML or JSON)
        query: PathBuf,
    },
}

/// Query selection: a query file, flags, or both (flags win)
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Query file (YAML or JSON)
    #[arg(short, long)]
    pub query: Option<PathBuf>,

    /// Collection path
    #[arg(long, required_unless_present = "query")]
    pub path: Option<String>,

    /// Field to order by
    #[arg(long, required_unless_present = "query")]
    pub field: Option<String>,

    /// Records per page
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Order ascending instead of descending (`--reverse=false` to turn off)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub reverse: Option<bool>,

    /// Merge new pages at the head instead of the tail (`--prepend=false` to turn off)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub prepend: Option<bool>,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one snapshot per line)
    Json,
    /// Human-readable output
    Pretty,
}
