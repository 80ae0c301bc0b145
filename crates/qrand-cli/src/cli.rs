//! CLI argument definitions for qrand.
//!
//! # Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `text` | Output format (text, json) |
//! | `--db` | `$QRAND_HOME/audit.duckdb` | Audit store path |
//! | `--no-audit` | `false` | Skip the audit store |
//! | `--max-attempts` | `5` | Attempts per source |
//! | `--retry-delay-ms` | `5000` | Delay between attempts |
//! | `--connect-timeout-ms` | `5000` | Connection timeout |
//! | `--read-timeout-ms` | `10000` | Response timeout |
//! | `--skip` / `--only` | | Narrow the source catalog |
//! | `--no-quarantine` | `false` | Ignore failure history |
//! | `--list-sources` | `false` | Print the catalog and exit |
//!
//! # Examples
//!
//! ```bash
//! qrand 10
//! qrand 16 --format json --only "QRandom.io"
//! qrand --list-sources
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use qrand_core::FetchConfig;

/// Fetch true random numbers from quantum random number generators.
#[derive(Debug, Parser)]
#[command(
    name = "qrand",
    version,
    about = "Fetch random integers from quantum random number sources",
    long_about = "qrand requests COUNT random integers from a prioritized list of public \
quantum random number APIs. Each source is retried a bounded number of times before the \
next one is tried; the first source that answers wins. Every source attempt is recorded \
in a local DuckDB audit store unless --no-audit is given."
)]
pub struct Cli {
    /// Number of random integers to request (positive base-10 integer).
    #[arg(value_name = "COUNT", allow_negative_numbers = true)]
    pub count: Option<String>,

    /// Output format for the numbers.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Audit store location.
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Do not open or write the audit store.
    #[arg(long, default_value_t = false)]
    pub no_audit: bool,

    /// Attempts per source, including the first one.
    #[arg(long, default_value_t = 5)]
    pub max_attempts: u32,

    /// Delay between attempts against the same source, in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    pub retry_delay_ms: u64,

    /// Connection establishment timeout in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    pub connect_timeout_ms: u64,

    /// Response read timeout in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    pub read_timeout_ms: u64,

    /// Leave a source out of this run (repeatable).
    #[arg(long = "skip", value_name = "SOURCE")]
    pub skip: Vec<String>,

    /// Only try these sources (repeatable).
    #[arg(long = "only", value_name = "SOURCE", conflicts_with = "skip")]
    pub only: Vec<String>,

    /// Try sources even if recent runs quarantined them.
    #[arg(long, default_value_t = false)]
    pub no_quarantine: bool,

    /// Print the source catalog with its health state and exit.
    #[arg(long, default_value_t = false)]
    pub list_sources: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig::default()
            .with_max_attempts(self.max_attempts)
            .with_fixed_delay(Duration::from_millis(self.retry_delay_ms))
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_read_timeout(Duration::from_millis(self.read_timeout_ms))
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Comma-separated integers.
    Text,
    /// Single JSON object with numbers and source details.
    Json,
}
