//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use calsweep_core::{OutputFormat, TracingOutputFormat};

/// calsweep - sweep calendar events into a table or a database
#[derive(Debug, Parser)]
#[command(name = "calsweep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "CALSWEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output (takes precedence over RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Log line format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch events and print them as a table
    Fetch {
        #[command(flatten)]
        run: RunArgs,

        /// Output rows as JSON instead of a text table
        #[arg(long)]
        json: bool,
    },

    /// Fetch events and upsert them into the database
    Collect {
        #[command(flatten)]
        run: RunArgs,

        /// SQLite database file (overrides [store].database)
        #[arg(long, env = "CALSWEEP_DATABASE")]
        database: Option<PathBuf>,

        /// Rows per transaction (overrides [store].batch_size)
        #[arg(long, value_parser = parse_batch_size)]
        batch_size: Option<usize>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

impl Command {
    /// Returns the table format for `fetch`.
    pub fn output_format(&self) -> OutputFormat {
        match self {
            Self::Fetch { json: true, .. } => OutputFormat::Json,
            _ => OutputFormat::Table,
        }
    }
}

fn parse_batch_size(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be greater than zero".to_string()),
        Ok(size) => Ok(size),
        Err(e) => Err(e.to_string()),
    }
}

/// Options shared by `fetch` and `collect`.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Calendar id to fetch (can be repeated; replaces calendar_ids from config)
    #[arg(long = "calendar", action = clap::ArgAction::Append)]
    pub calendars: Vec<String>,

    /// Inclusive lower time bound (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<String>,

    /// Exclusive upper time bound (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<String>,

    /// Google credentials JSON file (overrides [google].credentials_file)
    #[arg(long, env = "CALSWEEP_CREDENTIALS")]
    pub credentials: Option<PathBuf>,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
            LogFormat::Json => Self::Json,
        }
    }
}
