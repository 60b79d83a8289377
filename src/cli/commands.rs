//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// File-based source CDK CLI
#[derive(Parser, Debug)]
#[command(name = "filesource-cdk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source definition file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Store to read from: a local directory or an object store URL
    /// (s3://bucket/..., gs://bucket/..., az://container/...)
    #[arg(short, long, global = true)]
    pub files: Option<String>,

    /// State file (JSON) from a previous sync
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the source specification
    Spec,

    /// Test that every configured stream is readable
    Check,

    /// Discover streams and their schemas
    Discover,

    /// Read records from the configured streams
    Read {
        /// Streams to read (comma-separated, empty = all)
        #[arg(long)]
        streams: Option<String>,

        /// Read incrementally from the supplied state
        #[arg(long)]
        incremental: bool,

        /// Stop after this many records (0 = unlimited)
        #[arg(long, default_value = "0")]
        max_records: usize,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
