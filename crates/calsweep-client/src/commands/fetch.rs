//! `calsweep fetch`: print events as a table.

use calsweep_core::OutputFormat;

use crate::cli::RunArgs;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::pipeline;

use super::{RunStatus, connect, print_failures};

/// Fetches every configured calendar and prints the rows to stdout.
pub async fn run(config: &ClientConfig, args: &RunArgs, format: OutputFormat) -> ClientResult<RunStatus> {
    let calendar_ids = config.calendar_ids(args)?;
    let query = config.event_query(args)?;
    let source = connect(config, args).await?;

    let outcome = pipeline::fetch(source.as_ref(), &calendar_ids, &query).await?;
    println!("{}", outcome.table.render(format)?);
    print_failures(&outcome.report);

    Ok(RunStatus::from_report(&outcome.report))
}
