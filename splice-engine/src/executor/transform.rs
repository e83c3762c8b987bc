use serde_json::{Value, json};
use splice_core::domain::config::TransformConfig;
use splice_core::dto::execute::TransformResult;
use splice_lua::Limits;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Engine, SAMPLE_ITEMS};
use crate::error::{EngineError, Result};
use crate::prompts;
use crate::repair::artifact_str;
use crate::schema::validate;

pub(super) async fn execute(
    engine: &Engine,
    config: TransformConfig,
    input: &Value,
) -> Result<TransformResult> {
    let failure = if config.expression.trim().is_empty() {
        debug!("Transform {} has no expression yet, generating one", config.meta.id);
        None
    } else {
        match apply(engine, &config.expression, input, &config.schema).await {
            Ok(data) => {
                return Ok(TransformResult {
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
        format!("transform {}", config.meta.id),
        prompts::transform(&engine.modules.describe()),
        &config.meta.instruction,
        json!({
            "input": prompts::sample(input, SAMPLE_ITEMS),
            "schema": config.schema,
            "current_expression": config.expression,
        }),
    );

    let schema = &config.schema;
    let accept = |artifact: Value| async move {
        let expression = artifact_str(&artifact, "expression")?;
        let data = apply(engine, &expression, input, schema).await?;
        Ok((data, expression))
    };

    let repair = engine.repair_loop();
    let repaired = match &failure {
        Some(failure) => {
            warn!("Transform {} failed, repairing expression: {}", config.meta.id, failure);
            repair.repair(&task, failure, accept).await?
        }
        None => repair.generate(&task, accept).await?,
    };
    let retries = repaired.attempts;

    let (data, expression) = repaired.artifact;
    info!("Transform {} now uses a new expression", config.meta.id);

    Ok(TransformResult {
        data,
        config: TransformConfig {
            expression,
            ..config
        },
        retries,
    })
}

/// Slack given to the Lua hook before the outer timeout abandons the evaluation
const NATIVE_GRACE: Duration = Duration::from_secs(1);

/// Evaluates off the async workers, bounded by the expression timeout, then validates.
/// The Lua hook stops runaway scripts; the outer timeout covers long native calls.
async fn apply(engine: &Engine, expression: &str, input: &Value, schema: &Value) -> Result<Value> {
    let modules = engine.modules.clone();
    let source = expression.to_string();
    let bound = input.clone();
    let limits = Limits {
        time: engine.expression_timeout,
        ..Limits::default()
    };

    let evaluation = tokio::task::spawn_blocking(move || {
        splice_lua::evaluate_limited(&modules, &source, &bound, limits)
    });

    let data = match tokio::time::timeout(engine.expression_timeout + NATIVE_GRACE, evaluation).await {
        Ok(Ok(Ok(data))) => data,
        Ok(Ok(Err(e))) => return Err(EngineError::Expression(e.to_string())),
        Ok(Err(e)) => return Err(EngineError::Expression(format!("evaluation aborted: {}", e))),
        Err(_) => {
            return Err(EngineError::Expression(format!(
                "evaluation exceeded {:?}",
                engine.expression_timeout
            )));
        }
    };

    let result = validate(&data, schema);
    if !result.valid {
        return Err(EngineError::ValidationFailure(result.violations));
    }
    Ok(data)
}
