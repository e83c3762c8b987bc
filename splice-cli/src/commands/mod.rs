//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod config;
mod execute;
mod run;

pub use config::ConfigCommands;
pub use run::RunCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;
use crate::input::parse_key_val;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Stored config management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Run pipelines and inspect run history
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// Execute an API call config
    Call {
        /// Config id, or @file with an inline config
        config: String,

        /// Payload as JSON or @file
        #[arg(short, long)]
        payload: Option<String>,

        /// Credentials as key=value pairs
        #[arg(short, long, value_parser = parse_key_val)]
        credential: Vec<(String, String)>,
    },
    /// Execute an extract config against a JSON input
    Extract {
        /// Config id, or @file with an inline config
        config: String,

        /// Input document as JSON or @file
        #[arg(short, long)]
        input: String,
    },
    /// Execute a transform config against a JSON input
    Transform {
        /// Config id, or @file with an inline config
        config: String,

        /// Input document as JSON or @file
        #[arg(short, long)]
        input: String,
    },
    /// Infer a JSON Schema for a sample document
    Schema {
        /// What the data is meant to represent
        instruction: String,

        /// Sample document as JSON or @file
        #[arg(short, long)]
        sample: String,
    },
    /// Check that the server is reachable
    Health,
}

/// Routes the command to the appropriate handler module
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let client = config.client()?;

    match command {
        Commands::Config { command } => config::handle_config_command(command, &client).await,
        Commands::Run { command } => run::handle_run_command(command, &client).await,
        Commands::Call {
            config,
            payload,
            credential,
        } => execute::call(&client, &config, payload.as_deref(), credential).await,
        Commands::Extract { config, input } => execute::extract(&client, &config, &input).await,
        Commands::Transform { config, input } => {
            execute::transform(&client, &config, &input).await
        }
        Commands::Schema {
            instruction,
            sample,
        } => execute::schema(&client, &instruction, &sample).await,
        Commands::Health => execute::health(&client).await,
    }
}
