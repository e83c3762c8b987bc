//! Command-line input parsing
//!
//! JSON arguments are given inline or as `@path` to read a file.

use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use splice_core::domain::config::Config;
use splice_core::dto::config::ConfigRef;
use splice_core::dto::execute::CallInput;

/// Parse a JSON argument, reading `@file` arguments from disk
pub fn json_arg(raw: &str) -> Result<Value> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read JSON file: {}", path))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in '{}'", raw))
}

/// A stored config id, or `@file` holding an inline config
pub fn config_ref(raw: &str) -> Result<ConfigRef> {
    if raw.starts_with('@') {
        let config: Config = serde_json::from_value(json_arg(raw)?)
            .with_context(|| format!("'{}' is not a valid config", raw))?;
        Ok(ConfigRef::Inline(config))
    } else {
        Ok(ConfigRef::Stored(raw.to_string()))
    }
}

/// Parse a single key=value pair
pub fn parse_key_val(s: &str) -> Result<(String, String)> {
    let pos = s
        .find('=')
        .ok_or_else(|| anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

pub fn call_input(payload: Option<&str>, credentials: Vec<(String, String)>) -> Result<CallInput> {
    let payload = payload.map(json_arg).transpose()?.unwrap_or(Value::Null);
    Ok(CallInput {
        payload,
        credentials: credentials.into_iter().collect::<BTreeMap<_, _>>(),
    })
}
