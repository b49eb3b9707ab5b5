//! CLI argument parsing for tfhfs-perf

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// One JSON document at the end of the run
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "tfhfs-perf")]
#[command(version)]
#[command(
    about = "Measure tfhfs write and read-back throughput across storage backends",
    long_about = None
)]
pub struct Cli {
    /// Run single test (-1 = all)
    #[arg(
        short = 't',
        long = "test",
        value_name = "INDEX",
        default_value_t = -1,
        allow_negative_numbers = true
    )]
    pub test: i64,

    /// Load test cases, workloads and paths from a TOML file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Mount the filesystem here (overrides the config file)
    #[arg(long = "mountpoint", value_name = "DIR")]
    pub mountpoint: Option<PathBuf>,

    /// Keep backend state here (overrides the config file)
    #[arg(long = "storage-dir", value_name = "DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Filesystem binary to launch (overrides the config file)
    #[arg(long = "fs-binary", value_name = "PATH")]
    pub fs_binary: Option<PathBuf>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// List test cases with their indices and exit
    #[arg(long = "list")]
    pub list: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
