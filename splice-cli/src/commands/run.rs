//! Run command handlers
//!
//! Launching pipelines and browsing run history.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use splice_client::SpliceClient;
use splice_core::domain::run::{Run, RunStatus, StepStatus};

use crate::id_resolver::resolve_run_id;
use crate::input::{call_input, config_ref, parse_key_val};
use crate::types::IdOrPrefix;

/// Run subcommands
#[derive(Subcommand)]
pub enum RunCommands {
    /// Run a pipeline of steps in call, extract, transform order
    Start {
        /// Steps as config ids or @file inline configs
        #[arg(required = true)]
        steps: Vec<String>,

        /// Payload as JSON or @file
        #[arg(short, long)]
        payload: Option<String>,

        /// Credentials as key=value pairs
        #[arg(short, long, value_parser = parse_key_val)]
        credential: Vec<(String, String)>,
    },
    /// List recorded runs
    List,
    /// Show a run with its step trace
    Get {
        /// Run ID or unambiguous prefix
        id: String,
    },
}

pub async fn handle_run_command(command: RunCommands, client: &SpliceClient) -> Result<()> {
    match command {
        RunCommands::Start {
            steps,
            payload,
            credential,
        } => start_run(client, &steps, payload.as_deref(), credential).await,
        RunCommands::List => list_runs(client).await,
        RunCommands::Get { id } => get_run(client, &id).await,
    }
}

async fn start_run(
    client: &SpliceClient,
    steps: &[String],
    payload: Option<&str>,
    credentials: Vec<(String, String)>,
) -> Result<()> {
    let steps = steps
        .iter()
        .map(|s| config_ref(s))
        .collect::<Result<Vec<_>>>()?;
    let input = call_input(payload, credentials)?;

    let run = client.run_pipeline(steps, input).await?;
    print_run_details(&run);

    if run.status != RunStatus::Success {
        anyhow::bail!("Run {} finished as {}", run.id, run.status.as_str());
    }
    Ok(())
}

async fn list_runs(client: &SpliceClient) -> Result<()> {
    let runs = client.list_runs().await?;

    if runs.is_empty() {
        println!("{}", "No runs found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} run(s):", runs.len()).bold());
    println!();
    for run in &runs {
        println!(
            "  {} {} {} ({} step(s))",
            "▸".cyan(),
            run.id.to_string().dimmed(),
            colored_status(run.status),
            run.steps.len()
        );
        println!(
            "    Started: {}",
            run.started_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }

    Ok(())
}

async fn get_run(client: &SpliceClient, id: &str) -> Result<()> {
    let uuid = resolve_run_id(client, &IdOrPrefix::parse(id)).await?;
    let run = client.get_run(uuid).await?;

    print_run_details(&run);
    Ok(())
}

fn colored_status(status: RunStatus) -> ColoredString {
    match status {
        RunStatus::Success => status.as_str().green(),
        RunStatus::Failed => status.as_str().red(),
        RunStatus::Partial => status.as_str().yellow(),
        _ => status.as_str().blue(),
    }
}

fn print_run_details(run: &Run) {
    println!("{}", "Run Details:".bold());
    println!("  ID:      {}", run.id.to_string().cyan());
    println!("  Status:  {}", colored_status(run.status));
    println!("  Started: {}", run.started_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(completed) = run.completed_at {
        println!("  Ended:   {}", completed.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(error) = &run.error {
        println!("  Error:   {}", error.red());
    }

    if !run.steps.is_empty() {
        println!("\n{}", "Steps:".bold());
        for (i, step) in run.steps.iter().enumerate() {
            let mark = match step.status {
                StepStatus::Success => "✓".green(),
                StepStatus::Failed => "✗".red(),
            };
            println!(
                "  {} {}. {} {} (rev {}, {} ms, {} retries)",
                mark,
                i + 1,
                step.kind,
                step.config_id.bold(),
                step.revision,
                step.duration_ms,
                step.retries
            );
            if let Some(error) = &step.error {
                println!("       {}", error.message.dimmed());
            }
        }
    }

    if let Some(output) = &run.output {
        println!("\n{}", "Output:".bold());
        println!(
            "{}",
            serde_json::to_string_pretty(output).unwrap_or_else(|_| output.to_string())
        );
    }
}
