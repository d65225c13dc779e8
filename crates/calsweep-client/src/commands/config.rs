//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout. `config_path` is the file the
/// configuration was loaded from.
pub fn dump(config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    println!("# {}", describe_config_file(config_path));
    println!("{}", render(config)?);
    Ok(())
}

/// Renders the configuration as TOML.
pub fn render(config: &ClientConfig) -> ClientResult<String> {
    toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate()?;

    #[cfg(feature = "google")]
    if config.google.credentials_file.is_some() {
        use calsweep_providers::google::CredentialsFile;

        let google = config.google_config(&crate::cli::RunArgs::default())?;
        let credentials = CredentialsFile::from_file(&google.credentials_file).map_err(|e| {
            ClientError::Config(format!("invalid Google credentials: {}", e))
        })?;
        println!("Google credentials are valid ({}).", credentials.kind());
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration and database paths.
pub fn path(config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    println!("{}", path_report(config, config_path));
    Ok(())
}

pub fn path_report(config: &ClientConfig, config_path: &Path) -> String {
    format!(
        "config: {}\ndatabase: {}",
        describe_config_file(config_path),
        config.store.database_path().display()
    )
}

fn describe_config_file(config_path: &Path) -> String {
    if config_path.exists() {
        config_path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", config_path.display())
    }
}
