//! CLI argument parsing for Balanza

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for audit results
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text report (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "balanza")]
#[command(version)]
#[command(about = "Audit web asset sizes against budgets and diff them across builds", long_about = None)]
pub struct Cli {
    /// Path to the audit configuration file
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: PathBuf,

    /// Directory holding captured trace files (overrides traceDir in the config)
    #[arg(long = "trace-dir", value_name = "DIR")]
    pub trace_dir: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
