//! CLI, configuration, and the fetch and collect pipelines
//!
//! This crate provides the `calsweep` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
