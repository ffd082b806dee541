//! CLI module
//!
//! Command-line interface for running the pipeline flows.
//!
//! # Commands
//!
//! - `web-to-store` - Download, convert and upload the dataset
//! - `load-albums` - Load album files into the warehouse
//! - `load-trips` - Load monthly trip files into the warehouse
//! - `dedup` - Rewrite an album table to its distinct rows
//! - `show-config` - Print the effective configuration

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{build_warehouse, Runner};
