//! CLI module for classkv
//!
//! Provides command-line interface for:
//! - serve: Open the engine and serve the record service
//! - list: One-shot dump of every stored record

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, ServeArgs};
pub use commands::{list, run_command, serve, Config};
pub use errors::{CliError, CliResult};

/// Parse process arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}
