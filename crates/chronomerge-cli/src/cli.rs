//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chronomerge: normalize and merge time-series files by date
#[derive(Parser)]
#[command(name = "chronomerge")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse and check files without importing them
    Inspect {
        /// Data files (CSV/JSON)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import files and write the merged, date-keyed JSON
    Import {
        /// Data files (CSV/JSON), imported in this order
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Rename a file's key in the output (OLD=NEW)
        #[arg(long, value_name = "OLD=NEW")]
        rename: Vec<String>,

        /// Pivot a long-format file (FILE=INDEX,CATEGORY,VALUE or FILE=auto)
        #[arg(long, value_name = "SPEC")]
        pivot: Vec<String>,

        /// Add or fill a value group (NAME=FILE:COLUMN,FILE:COLUMN)
        #[arg(long, value_name = "SPEC")]
        group: Vec<String>,

        /// Override a file's date column (FILE:COLUMN)
        #[arg(long, value_name = "FILE:COLUMN")]
        date: Vec<String>,

        /// Pivot in-process instead of calling the pivot service
        #[arg(long)]
        local_pivot: bool,

        /// Base URL of the pivot service (default: $CHRONOMERGE_API_URL or http://localhost:5000)
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,

        /// Keep only dates at or after this instant
        #[arg(long, value_name = "ISO")]
        start: Option<String>,

        /// Keep only dates at or before this instant
        #[arg(long, value_name = "ISO")]
        end: Option<String>,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
