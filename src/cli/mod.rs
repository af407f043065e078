//! CLI module for the transfer history service
//!
//! Provides command-line interface for:
//! - start: Load config, open a replica and serve HTTP
//! - check-config: Validate a configuration file and exit

mod args;
mod commands;
mod config;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check_config, run, run_command, start};
pub use config::{DbEntry, EnvConfig, Environment};
pub use errors::{CliError, CliErrorCode, CliResult};
