//! One-shot JSON Schema generation from an instruction and sample data

use serde_json::{Value, json};
use tracing::info;

use crate::error::{EngineError, Result};
use crate::executor::Engine;
use crate::oracle::ResponseFormat;
use crate::prompts;
use crate::repair::GenerationTask;
use crate::schema::check_schema_shape;

impl Engine {
    /// Asks the oracle for a schema describing what `instruction` should produce
    ///
    /// Follows the repair loop's retry discipline; the only acceptance check is
    /// the structural shape of the returned schema.
    pub async fn generate_schema(&self, instruction: &str, sample: &Value) -> Result<Value> {
        let task = GenerationTask {
            label: "schema generation".to_string(),
            system: prompts::SCHEMA.to_string(),
            instruction: instruction.to_string(),
            subject: Some(prompts::sample(sample, 5)),
            model: self.schema_model().to_string(),
            response_format: ResponseFormat::JsonSchema {
                name: "schema_response".to_string(),
                schema: json!({
                    "type": "object",
                    "properties": { "jsonSchema": { "type": "object" } },
                    "required": ["jsonSchema"]
                }),
            },
        };

        let repaired = self
            .repair_loop()
            .generate(&task, |artifact| async move {
                let schema = artifact.get("jsonSchema").cloned().ok_or_else(|| {
                    EngineError::MalformedOutput("expected an object with 'jsonSchema'".into())
                })?;
                let shape = check_schema_shape(&schema);
                if !shape.valid {
                    return Err(EngineError::ValidationFailure(shape.violations));
                }
                Ok(schema)
            })
            .await?;

        info!("Generated schema after {} attempt(s)", repaired.attempts);
        Ok(repaired.artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use crate::testing::{ScriptedOracle, engine, reply};

    #[tokio::test]
    async fn test_generates_schema() {
        let schema = json!({
            "type": "object",
            "properties": {"tempC": {"type": "number"}}
        });
        let oracle = ScriptedOracle::new(vec![reply(json!({ "jsonSchema": schema }))]);

        let generated = engine(oracle.clone(), 3)
            .generate_schema("get weather for Paris", &json!({"temp_f": 72}))
            .await
            .unwrap();

        assert_eq!(generated, schema);
        let prompt = &oracle.messages(0)[1].content;
        assert!(prompt.contains("get weather for Paris"));
        assert!(prompt.contains("temp_f"));
    }

    #[tokio::test]
    async fn test_retries_on_bad_shape() {
        let oracle = ScriptedOracle::new(vec![
            Err(OracleError::Timeout),
            reply(json!({"jsonSchema": {"type": "weird"}})),
            reply(json!({"jsonSchema": {"type": "array", "items": {"type": "string"}}})),
        ]);

        let generated = engine(oracle.clone(), 3)
            .generate_schema("list city names", &Value::Null)
            .await
            .unwrap();

        assert_eq!(generated["type"], "array");
        assert_eq!(oracle.calls(), 3);
        assert!(oracle.messages(2).iter().any(|m| m.content.contains("unknown type")));
    }

    #[tokio::test]
    async fn test_exhausts() {
        let oracle = ScriptedOracle::new(vec![reply(json!({"schema": {}})), reply(json!({}))]);
        let err = engine(oracle, 1)
            .generate_schema("anything", &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::GenerationExhausted { attempts: 2, .. }));
    }
}
