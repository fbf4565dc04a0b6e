//! CLI module
//!
//! Command-line driver for the pagination engine.
//!
//! # Commands
//!
//! - `browse` - Page through a JSON data file or a REST source
//! - `validate` - Check a query file

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, QueryArgs};
pub use runner::Runner;
