//! calsweep CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use calsweep_client::cli::{Cli, Command, ConfigAction};
use calsweep_client::commands::{self, RunStatus};
use calsweep_client::config::ClientConfig;
use calsweep_client::error::ClientResult;
use calsweep_core::{TracingConfig, init_tracing};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = TracingConfig::for_verbosity(cli.verbose).with_format(cli.log_format.into());
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(status) => status.exit_code(),
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<RunStatus> {
    let config_path = ClientConfig::resolve_path(cli.config.as_deref());
    let config = ClientConfig::load(cli.config.as_deref())?;
    let format = cli.command.output_format();

    match cli.command {
        Command::Fetch { run, .. } => commands::fetch::run(&config, &run, format).await,
        Command::Collect {
            run,
            database,
            batch_size,
        } => commands::collect::run(&config, &run, database, batch_size).await,
        Command::Config { action } => {
            match action {
                ConfigAction::Dump => commands::config::dump(&config, &config_path)?,
                ConfigAction::Validate => commands::config::validate(&config)?,
                ConfigAction::Path => commands::config::path(&config, &config_path)?,
            }
            Ok(RunStatus::Complete)
        }
    }
}
