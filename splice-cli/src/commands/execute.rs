//! Single-executor command handlers

use anyhow::Result;
use colored::*;
use serde::Serialize;
use splice_client::SpliceClient;

use crate::input::{call_input, config_ref, json_arg};

pub async fn call(
    client: &SpliceClient,
    config: &str,
    payload: Option<&str>,
    credentials: Vec<(String, String)>,
) -> Result<()> {
    let result = client
        .execute_call(config_ref(config)?, call_input(payload, credentials)?)
        .await?;

    println!(
        "{} {} ({} page(s), {} ms)",
        "✓".green().bold(),
        result.url.cyan(),
        result.pages,
        result.duration_ms
    );
    report_retries(result.retries, result.config.meta.revision);
    print_json(&result.data)
}

pub async fn extract(client: &SpliceClient, config: &str, input: &str) -> Result<()> {
    let result = client
        .execute_extract(config_ref(config)?, json_arg(input)?)
        .await?;

    println!(
        "{} selector {}",
        "✓".green().bold(),
        result.config.selector.cyan()
    );
    report_retries(result.retries, result.config.meta.revision);
    print_json(&result.data)
}

pub async fn transform(client: &SpliceClient, config: &str, input: &str) -> Result<()> {
    let result = client
        .execute_transform(config_ref(config)?, json_arg(input)?)
        .await?;

    println!("{} expression:", "✓".green().bold());
    println!("  {}", result.config.expression.dimmed());
    report_retries(result.retries, result.config.meta.revision);
    print_json(&result.data)
}

pub async fn schema(client: &SpliceClient, instruction: &str, sample: &str) -> Result<()> {
    let schema = client.generate_schema(instruction, json_arg(sample)?).await?;
    print_json(&schema)
}

pub async fn health(client: &SpliceClient) -> Result<()> {
    client.health().await?;
    println!("{} {}", "✓ Server is up at".green().bold(), client.base_url());
    Ok(())
}

fn report_retries(retries: u32, revision: u32) {
    if retries > 0 {
        println!(
            "  {}",
            format!("Config repaired after {} oracle attempt(s), now revision {}", retries, revision)
                .yellow()
        );
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
