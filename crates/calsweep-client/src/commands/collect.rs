//! `calsweep collect`: upsert events into the database.

use std::path::{Path, PathBuf};

use calsweep_store::EventStore;
use tracing::info;

use crate::cli::RunArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::pipeline::{self, CollectOutcome};

use super::{RunStatus, connect, print_failures};

/// Fetches every configured calendar and writes the rows to SQLite.
///
/// `database` and `batch_size` override the `[store]` section.
pub async fn run(
    config: &ClientConfig,
    args: &RunArgs,
    database: Option<PathBuf>,
    batch_size: Option<usize>,
) -> ClientResult<RunStatus> {
    let calendar_ids = config.calendar_ids(args)?;
    let query = config.event_query(args)?;
    let database = database.unwrap_or_else(|| config.store.database_path());
    let batch_size = resolve_batch_size(config, batch_size)?;

    let source = connect(config, args).await?;
    let mut store = EventStore::open(&database)?;
    info!(database = %database.display(), "opened event store");

    let outcome =
        pipeline::collect(source.as_ref(), &calendar_ids, &query, &mut store, batch_size).await?;
    println!("{}", summary_line(&outcome, &database));
    print_failures(&outcome.report);

    Ok(RunStatus::from_report(&outcome.report))
}

/// The `--batch-size` override or the configured size; zero is refused.
pub fn resolve_batch_size(config: &ClientConfig, batch_size: Option<usize>) -> ClientResult<usize> {
    match batch_size.unwrap_or(config.store.batch_size) {
        0 => Err(ClientError::Config(
            "batch size must be greater than zero".to_string(),
        )),
        size => Ok(size),
    }
}

/// One-line summary printed after a collect run.
pub fn summary_line(outcome: &CollectOutcome, database: &Path) -> String {
    let calendars = outcome.report.outcomes.len();
    let failed = outcome.report.failures().count();

    let mut line = format!(
        "upserted {} events ({} new, {} updated) from {} calendars into {}",
        outcome.summary.written,
        outcome.summary.inserted,
        outcome.summary.updated,
        calendars - failed,
        database.display()
    );
    if outcome.summary.merged > 0 {
        line.push_str(&format!(
            ", {} shared between calendars",
            outcome.summary.merged
        ));
    }
    if outcome.summary.rejected > 0 {
        line.push_str(&format!(", {} without id skipped", outcome.summary.rejected));
    }
    if failed > 0 {
        line.push_str(&format!(", {} calendars failed", failed));
    }
    line
}
