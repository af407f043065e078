//! transfer-history CLI entry point
//!
//! Parses arguments, dispatches to the CLI, prints any error to stderr and
//! exits non-zero on failure. All logic lives in the library.

use transfer_history::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
