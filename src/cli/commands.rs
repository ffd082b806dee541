//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Bandcamp dataset ETL pipeline
#[derive(Parser, Debug)]
#[command(name = "bandcamp-etl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for reports
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the dataset, convert each file to Parquet and upload it
    WebToStore {
        /// Dataset URL (zip archive or single JSON file)
        #[arg(long)]
        url: Option<String>,

        /// Destination URL
        /// Supports: /path, s3://bucket/path, r2://bucket/path, gs://bucket/path, az://container/path
        #[arg(short, long)]
        store: Option<String>,

        /// Directory for intermediate Parquet files
        #[arg(long)]
        local_dir: Option<PathBuf>,
    },

    /// Load album files into the warehouse
    LoadAlbums {
        /// File numbers (comma-separated); configured defaults when omitted
        #[arg(long, value_delimiter = ',')]
        files: Option<Vec<u32>>,

        /// Deduplicate each table after loading it
        #[arg(long)]
        dedup: bool,
    },

    /// Load monthly trip files into the warehouse
    LoadTrips {
        /// Years (comma-separated); configured defaults when omitted
        #[arg(long, value_delimiter = ',')]
        years: Option<Vec<i32>>,

        /// Months (comma-separated, 1-12); configured defaults when omitted
        #[arg(long, value_delimiter = ',')]
        months: Option<Vec<u32>>,

        /// Deduplicate each table after loading it
        #[arg(long)]
        dedup: bool,
    },

    /// Rewrite an album table to its distinct rows
    Dedup {
        /// Album file number
        #[arg(long)]
        file: u32,
    },

    /// Print the effective configuration as YAML
    ShowConfig,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
