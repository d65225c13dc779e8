//! Subcommand implementations.

pub mod collect;
pub mod config;
pub mod fetch;

use std::process::ExitCode;

use calsweep_providers::{EventSource, FetchReport};

use crate::cli::RunArgs;
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// How a `fetch` or `collect` run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every calendar was retrieved.
    Complete,
    /// At least one calendar failed and was skipped.
    PartialFailure,
}

impl RunStatus {
    pub fn from_report(report: &FetchReport) -> Self {
        if report.has_failures() {
            Self::PartialFailure
        } else {
            Self::Complete
        }
    }

    /// Process status: 0 when complete, 2 after a partial failure.
    pub fn code(self) -> u8 {
        match self {
            Self::Complete => 0,
            Self::PartialFailure => 2,
        }
    }

    pub fn exit_code(self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

/// Lines describing the calendars that failed, one per calendar. Failures
/// that a later run may get past are marked `(retryable)`.
pub fn failure_lines(report: &FetchReport) -> Vec<String> {
    report
        .failures()
        .filter_map(|outcome| {
            outcome.error.as_ref().map(|error| {
                let hint = if error.is_retryable() { " (retryable)" } else { "" };
                format!(
                    "calendar {} skipped: {}: {}{}",
                    outcome.calendar_id,
                    error.code().as_str(),
                    error.message(),
                    hint
                )
            })
        })
        .collect()
}

pub(crate) fn print_failures(report: &FetchReport) {
    for line in failure_lines(report) {
        eprintln!("{}", line);
    }
}

/// Connects to the configured calendar provider.
#[cfg(feature = "google")]
pub async fn connect(config: &ClientConfig, args: &RunArgs) -> ClientResult<Box<dyn EventSource>> {
    use calsweep_providers::google::GoogleProvider;

    let google = config.google_config(args)?;
    let provider = GoogleProvider::connect(google).await?;
    Ok(Box::new(provider))
}

#[cfg(not(feature = "google"))]
pub async fn connect(
    _config: &ClientConfig,
    _args: &RunArgs,
) -> ClientResult<Box<dyn EventSource>> {
    Err(crate::error::ClientError::Config(
        "calsweep was built without a calendar provider; enable the `google` feature".to_string(),
    ))
}
