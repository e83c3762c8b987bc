use std::collections::BTreeMap;
use std::time::Instant;

use reqwest::Url;
use serde_json::{Map, Value, json};
use splice_core::domain::config::{ApiConfig, HttpMethod, Pagination, PaginationKind};
use splice_core::dto::execute::{CallInput, CallResult};
use tracing::{debug, info, warn};

use super::Engine;
use crate::error::{CallFailureKind, EngineError, Result};
use crate::http::{HttpError, HttpRequest};
use crate::prompts;
use crate::schema::validate;
use crate::select::select;
use crate::template::{Bindings, render, render_json};

/// Longest response excerpt kept in a call failure
const ERROR_BODY_LIMIT: usize = 500;

struct CallOutcome {
    data: Value,
    status: u16,
    url: String,
    pages: u32,
}

pub(super) async fn execute(engine: &Engine, config: ApiConfig, input: &CallInput) -> Result<CallResult> {
    let started = Instant::now();

    let failure = match perform(engine, &config, input).await {
        Ok(outcome) => return Ok(into_result(outcome, config, 0, started)),
        Err(e) if e.is_repairable() => e,
        Err(e) => return Err(e),
    };

    warn!("Call {} failed, repairing request: {}", config.meta.id, failure);

    let task = engine.task(
        format!("call {}", config.meta.id),
        prompts::CALL_REPAIR.to_string(),
        &config.meta.instruction,
        json!({
            "request": request_fields(&config),
            "error": failure.to_string(),
            "documentation_url": config.documentation_url,
        }),
    );

    let repaired = engine
        .repair_loop()
        .repair(&task, &failure, |artifact| {
            let candidate = apply_patch(&config, &artifact);
            async move {
                let candidate = candidate?;
                let outcome = perform(engine, &candidate, input).await?;
                Ok((candidate, outcome))
            }
        })
        .await?;

    let (config, outcome) = repaired.artifact;
    info!("Call {} repaired ({} {})", config.meta.id, config.method, outcome.url);
    Ok(into_result(outcome, config, repaired.attempts, started))
}

fn into_result(outcome: CallOutcome, config: ApiConfig, retries: u32, started: Instant) -> CallResult {
    CallResult {
        data: outcome.data,
        status: outcome.status,
        url: outcome.url,
        pages: outcome.pages,
        duration_ms: started.elapsed().as_millis() as u64,
        config,
        retries,
    }
}

// ============================================================================
// Execution
// ============================================================================

async fn perform(engine: &Engine, config: &ApiConfig, input: &CallInput) -> Result<CallOutcome> {
    let mut bindings = Bindings::new(&input.credentials, &input.payload);

    let outcome = match &config.pagination {
        None => {
            let (status, url, body) = fetch(engine, config, &bindings).await?;
            CallOutcome {
                data: payload(config, body)?,
                status,
                url,
                pages: 1,
            }
        }
        Some(pagination) => {
            let limit = pagination.page_size.max(1);
            let mut collected: Vec<Value> = Vec::new();
            let mut previous: Option<Vec<Value>> = None;
            let mut first: Option<(u16, String)> = None;
            let mut pages = 0;

            for index in 0..engine.max_pages {
                bind_page(&mut bindings, pagination, index);

                let (status, url, body) = fetch(engine, config, &bindings).await?;
                pages += 1;
                let first = first.get_or_insert((status, url));

                let items = match payload(config, body)? {
                    Value::Array(items) => items,
                    // Not a list: nothing to paginate
                    other if pages == 1 => {
                        return validated(config, CallOutcome {
                            data: other,
                            status: first.0,
                            url: first.1.clone(),
                            pages,
                        });
                    }
                    _ => break,
                };

                if items.is_empty() || previous.as_ref() == Some(&items) {
                    break;
                }
                let short = items.len() < limit as usize;
                collected.extend(items.iter().cloned());
                previous = Some(items);
                if short {
                    break;
                }
                if index + 1 == engine.max_pages {
                    warn!("Call {} stopped at the {} page limit", config.meta.id, engine.max_pages);
                }
            }

            let (status, url) = first.unwrap_or_default();
            CallOutcome {
                data: Value::Array(collected),
                status,
                url,
                pages,
            }
        }
    };

    validated(config, outcome)
}

/// Binds the variables for the zero-based request `index`; only the
/// variable matching the pagination kind is defined
fn bind_page(bindings: &mut Bindings<'_>, pagination: &Pagination, index: u32) {
    let limit = pagination.page_size.max(1);
    match pagination.kind {
        PaginationKind::PageBased => bindings.set_var("page", index + 1),
        PaginationKind::OffsetBased => bindings.set_var("offset", index * limit),
    }
    bindings.set_var("limit", limit);
}

fn validated(config: &ApiConfig, outcome: CallOutcome) -> Result<CallOutcome> {
    if let Some(schema) = &config.response_schema {
        let result = validate(&outcome.data, schema);
        if !result.valid {
            return Err(EngineError::ValidationFailure(result.violations));
        }
    }
    Ok(outcome)
}

/// Narrows a response body to `data_path`
fn payload(config: &ApiConfig, body: Value) -> Result<Value> {
    match config.data_path.as_deref().map(str::trim) {
        Some(path) if !path.is_empty() => select(path, &body, false),
        _ => Ok(body),
    }
}

async fn fetch(engine: &Engine, config: &ApiConfig, bindings: &Bindings<'_>) -> Result<(u16, String, Value)> {
    let request = build_request(config, bindings)?;
    let url = request.url.clone();
    debug!("{} {}", request.method, url);

    let response = engine.http.request(request).await.map_err(|e| {
        let kind = match e {
            HttpError::Timeout => CallFailureKind::Timeout,
            HttpError::Network(_) => CallFailureKind::Network,
            HttpError::InvalidRequest(_) => CallFailureKind::InvalidRequest,
        };
        EngineError::call(kind, &url, e.to_string())
    })?;

    if !response.is_success() {
        let excerpt: String = response.body.chars().take(ERROR_BODY_LIMIT).collect();
        return Err(EngineError::call(
            CallFailureKind::Status(response.status),
            &url,
            excerpt,
        ));
    }

    let body = response
        .json()
        .map_err(|e| EngineError::call(CallFailureKind::Decode, &url, e.to_string()))?;

    Ok((response.status, url, body))
}

fn build_request(config: &ApiConfig, bindings: &Bindings<'_>) -> Result<HttpRequest> {
    let fill = |template: &str| {
        render(template, bindings).map_err(|name| {
            EngineError::call(
                CallFailureKind::UnresolvedTemplate,
                &config.url_host,
                format!("no value for placeholder {{{}}}", name),
            )
        })
    };

    let host = fill(&config.url_host)?;
    let host = if host.contains("://") {
        host
    } else {
        format!("https://{}", host)
    };
    let path = fill(&config.url_path)?;
    let raw = match path.trim() {
        "" => host,
        p if p.starts_with('/') => format!("{}{}", host.trim_end_matches('/'), p),
        p => format!("{}/{}", host.trim_end_matches('/'), p),
    };

    let mut url = Url::parse(&raw)
        .map_err(|e| EngineError::call(CallFailureKind::InvalidRequest, &raw, e.to_string()))?;
    if !config.query_params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in &config.query_params {
            pairs.append_pair(&fill(name)?, &fill(value)?);
        }
    }

    let mut headers = BTreeMap::new();
    for (name, value) in &config.headers {
        headers.insert(fill(name)?, fill(value)?);
    }

    let body = config
        .body
        .as_deref()
        .map(|template| {
            render_json(template, bindings).map_err(|name| {
                EngineError::call(
                    CallFailureKind::UnresolvedTemplate,
                    &config.url_host,
                    format!("no value for placeholder {{{}}}", name),
                )
            })
        })
        .transpose()?;
    if body.is_some() && !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
        headers.insert("content-type".to_string(), "application/json".to_string());
    }

    Ok(HttpRequest {
        method: config.method,
        url: url.to_string(),
        headers,
        body,
    })
}

// ============================================================================
// Repair
// ============================================================================

/// Request fields shown to the oracle
fn request_fields(config: &ApiConfig) -> Value {
    json!({
        "url_host": config.url_host,
        "url_path": config.url_path,
        "method": config.method,
        "headers": config.headers,
        "query_params": config.query_params,
        "body": config.body,
        "data_path": config.data_path,
    })
}

/// Applies the fields of a generated patch to a copy of `config`
fn apply_patch(config: &ApiConfig, artifact: &Value) -> Result<ApiConfig> {
    let malformed = |msg: String| EngineError::MalformedOutput(msg);
    let patch: &Map<String, Value> = artifact
        .as_object()
        .ok_or_else(|| malformed("expected a JSON object of request fields".into()))?;

    let mut next = config.clone();
    let mut touched = false;

    for (field, value) in patch {
        touched |= match field.as_str() {
            "url_host" => {
                next.url_host = string_field(field, value)?;
                true
            }
            "url_path" => {
                next.url_path = string_field(field, value)?;
                true
            }
            "method" => {
                next.method = serde_json::from_value::<HttpMethod>(value.clone())
                    .map_err(|e| malformed(format!("invalid method: {}", e)))?;
                true
            }
            "headers" => {
                next.headers = string_map(field, value)?;
                true
            }
            "query_params" => {
                next.query_params = string_map(field, value)?;
                true
            }
            "body" => {
                next.body = match value {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                };
                true
            }
            "data_path" => {
                next.data_path = match value {
                    Value::Null => None,
                    other => Some(string_field(field, other)?),
                };
                true
            }
            _ => false,
        };
    }

    if !touched {
        return Err(malformed("no request fields in the answer".into()));
    }
    Ok(next)
}

fn string_field(field: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| EngineError::MalformedOutput(format!("'{}' must be a string", field)))
}

fn string_map(field: &str, value: &Value) -> Result<BTreeMap<String, String>> {
    let Value::Object(entries) = value else {
        return Err(EngineError::MalformedOutput(format!("'{}' must be an object", field)));
    };
    Ok(entries
        .iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), v)
        })
        .collect())
}
