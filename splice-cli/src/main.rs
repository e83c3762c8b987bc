//! Splice CLI
//!
//! Command-line interface for the splice server.

mod commands;
mod config;
mod id_resolver;
mod input;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "splice")]
#[command(about = "Self-healing API integration CLI", long_about = None)]
struct Cli {
    /// Server URL
    #[arg(long, env = "SPLICE_SERVER_URL", default_value = "http://localhost:8080")]
    server_url: String,

    /// Request timeout in seconds; oracle repairs can take a while
    #[arg(long, env = "SPLICE_TIMEOUT_SECS", default_value = "300")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        server_url: cli.server_url,
        timeout_secs: cli.timeout,
    };

    handle_command(cli.command, &config).await
}
