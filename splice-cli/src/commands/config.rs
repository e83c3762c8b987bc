//! Config command handlers
//!
//! Storing, listing, viewing and deleting integration configs.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use splice_client::SpliceClient;
use splice_core::domain::config::{Config, ConfigKind};
use splice_core::dto::config::ConfigSummary;

use crate::input::json_arg;

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Store a config from a JSON file as a new revision
    Put {
        /// Path to the config JSON file
        file: String,
    },
    /// List stored configs
    List {
        /// Only list configs of this kind (api, extract, transform)
        #[arg(short, long)]
        kind: Option<ConfigKind>,
    },
    /// Show the latest revision of a config
    Get { id: String },
    /// Delete a config and all its revisions
    Delete { id: String },
}

pub async fn handle_config_command(command: ConfigCommands, client: &SpliceClient) -> Result<()> {
    match command {
        ConfigCommands::Put { file } => put_config(client, &file).await,
        ConfigCommands::List { kind } => list_configs(client, kind).await,
        ConfigCommands::Get { id } => get_config(client, &id).await,
        ConfigCommands::Delete { id } => delete_config(client, &id).await,
    }
}

async fn put_config(client: &SpliceClient, file: &str) -> Result<()> {
    let config: Config = serde_json::from_value(json_arg(&format!("@{}", file))?)
        .with_context(|| format!("Failed to parse config file: {}", file))?;

    let upserted = client.upsert_config(&config).await?;

    println!("{}", "✓ Config stored successfully!".green().bold());
    println!("  ID:       {}", upserted.id.cyan());
    println!("  Kind:     {}", config.kind().to_string().dimmed());
    println!("  Revision: {}", upserted.revision.to_string().yellow());

    Ok(())
}

async fn list_configs(client: &SpliceClient, kind: Option<ConfigKind>) -> Result<()> {
    let configs = client.list_configs(kind).await?;

    if configs.is_empty() {
        println!("{}", "No configs found.".yellow());
    } else {
        println!("{}", format!("Found {} config(s):", configs.len()).bold());
        println!();
        for config in &configs {
            print_config_summary(config);
        }
    }

    Ok(())
}

async fn get_config(client: &SpliceClient, id: &str) -> Result<()> {
    let config = client.get_config(id).await?;
    let meta = config.meta();

    println!("{}", "Config Details:".bold());
    println!("  ID:          {}", meta.id.cyan());
    println!("  Kind:        {}", config.kind());
    println!("  Revision:    {}", meta.revision);
    println!("  Instruction: {}", meta.instruction);
    println!("  Updated:     {}", meta.updated_at.format("%Y-%m-%d %H:%M:%S"));

    println!("\n{}", "Body:".bold());
    println!("{}", "─".repeat(80).dimmed());
    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("{}", "─".repeat(80).dimmed());

    Ok(())
}

async fn delete_config(client: &SpliceClient, id: &str) -> Result<()> {
    client.delete_config(id).await?;

    println!(
        "{}",
        format!("✓ Config {} deleted successfully!", id).green().bold()
    );

    Ok(())
}

fn print_config_summary(config: &ConfigSummary) {
    println!("  {} {}", "▸".cyan(), config.id.bold());
    println!(
        "    Kind:     {} (rev {})",
        config.kind.to_string().dimmed(),
        config.revision
    );
    if !config.instruction.is_empty() {
        println!("    Does:     {}", config.instruction.dimmed());
    }
    println!(
        "    Updated:  {}",
        config
            .updated_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}
