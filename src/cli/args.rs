//! CLI argument definitions using clap
//!
//! Commands:
//! - transfer-history start --config <path> --env <dev|test|pro>
//! - transfer-history check-config --config <path> --env <dev|test|pro>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::config::Environment;

/// Transfer history service for a blockchain ledger
#[derive(Parser, Debug)]
#[command(name = "transfer-history")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the transfer history service
    Start {
        /// Path to configuration file
        #[arg(long, default_value = "./transfer_history.json")]
        config: PathBuf,

        /// Configuration section to use
        #[arg(long, short, value_enum, default_value_t = Environment::Pro)]
        env: Environment,
    },

    /// Load and validate the configuration, then exit
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./transfer_history.json")]
        config: PathBuf,

        /// Configuration section to use
        #[arg(long, short, value_enum, default_value_t = Environment::Pro)]
        env: Environment,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
