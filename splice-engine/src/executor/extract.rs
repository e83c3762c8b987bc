use std::collections::BTreeMap;

use serde_json::{Value, json};
use splice_core::domain::config::{ExtractConfig, ExtractSource};
use splice_core::dto::execute::ExtractResult;
use tracing::{debug, info, warn};

use super::{Engine, SAMPLE_ITEMS};
use crate::error::{CallFailureKind, EngineError, Result};
use crate::http::{HttpError, HttpRequest};
use crate::prompts;
use crate::repair::artifact_str;
use crate::schema::validate;
use crate::select::select;
use crate::template::{Bindings, render};

pub(super) async fn execute(
    engine: &Engine,
    config: ExtractConfig,
    input: &Value,
) -> Result<ExtractResult> {
    let document = load_document(engine, &config, input).await?;

    let failure = if config.selector.trim().is_empty() {
        debug!("Extract {} has no selector yet, generating one", config.meta.id);
        None
    } else {
        match apply(&config.selector, &document, &config.schema) {
            Ok(data) => {
                return Ok(ExtractResult {
                    data,
                    config,
                    retries: 0,
                });
            }
            Err(e) if e.is_repairable() => Some(e),
            Err(e) => return Err(e),
        }
    };

    let task = engine.task(
        format!("extract {}", config.meta.id),
        prompts::EXTRACT.to_string(),
        &config.meta.instruction,
        json!({
            "document": prompts::sample(&document, SAMPLE_ITEMS),
            "schema": config.schema,
            "current_selector": config.selector,
        }),
    );

    let accept = |artifact: Value| {
        let selected = artifact_str(&artifact, "selector")
            .and_then(|selector| Ok((apply(&selector, &document, &config.schema)?, selector)));
        async move { selected }
    };

    let repair = engine.repair_loop();
    let repaired = match &failure {
        Some(failure) => {
            warn!("Extract {} failed, repairing selector: {}", config.meta.id, failure);
            repair.repair(&task, failure, accept).await?
        }
        None => repair.generate(&task, accept).await?,
    };
    let retries = repaired.attempts;

    let (data, selector) = repaired.artifact;
    info!("Extract {} now uses selector {}", config.meta.id, selector);

    Ok(ExtractResult {
        data,
        config: ExtractConfig { selector, ..config },
        retries,
    })
}

/// Selects and validates
fn apply(selector: &str, document: &Value, schema: &Value) -> Result<Value> {
    let wants_array = schema.get("type").and_then(Value::as_str) == Some("array");
    let data = select(selector.trim(), document, wants_array)?;

    let result = validate(&data, schema);
    if !result.valid {
        return Err(EngineError::ValidationFailure(result.violations));
    }
    Ok(data)
}

/// Resolves the document the selector runs against
async fn load_document(engine: &Engine, config: &ExtractConfig, input: &Value) -> Result<Value> {
    let (url, headers) = match &config.source {
        ExtractSource::Input => return Ok(input.clone()),
        ExtractSource::Http { url, headers } => (url, headers),
    };

    let credentials = BTreeMap::new();
    let bindings = Bindings::new(&credentials, input);
    let fill = |template: &str| {
        render(template, &bindings).map_err(|name| {
            EngineError::call(
                CallFailureKind::UnresolvedTemplate,
                url,
                format!("no value for placeholder {{{}}}", name),
            )
        })
    };

    let mut request = HttpRequest::get(fill(url)?);
    for (name, value) in headers {
        request.headers.insert(fill(name)?, fill(value)?);
    }

    let target = request.url.clone();
    let response = engine.http.request(request).await.map_err(|e| {
        let kind = match e {
            HttpError::Timeout => CallFailureKind::Timeout,
            HttpError::Network(_) => CallFailureKind::Network,
            HttpError::InvalidRequest(_) => CallFailureKind::InvalidRequest,
        };
        EngineError::call(kind, &target, e.to_string())
    })?;

    if !response.is_success() {
        return Err(EngineError::call(
            CallFailureKind::Status(response.status),
            &target,
            "source document unavailable",
        ));
    }

    response
        .json()
        .map_err(|e| EngineError::call(CallFailureKind::Decode, &target, e.to_string()))
}
