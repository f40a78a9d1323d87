//! CLI argument definitions using clap
//!
//! Commands:
//! - classkv serve [--config <path>] [--data-dir <dir>] [--host <host>] [--port <port>]
//!   [--http-port <port>] [--error-policy <policy>]
//! - classkv list --data-dir <dir>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::rpc::ErrorPolicy;

/// classkv - class record service over an embedded key-value engine
#[derive(Parser, Debug)]
#[command(name = "classkv")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the engine and serve the record service until interrupted
    Serve(ServeArgs),

    /// Print every stored record as JSON and exit
    List {
        /// Data directory of a previously served engine
        #[arg(long)]
        data_dir: PathBuf,
    },
}

/// Options for `serve`. Flags override values from the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Path to JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Data directory (a temporary directory is used when unset)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// gRPC port
    #[arg(long)]
    pub port: Option<u16>,

    /// Also serve the JSON gateway on this port
    #[arg(long)]
    pub http_port: Option<u16>,

    /// What callers see when the store reports an error: suppress | surface
    #[arg(long)]
    pub error_policy: Option<ErrorPolicy>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
