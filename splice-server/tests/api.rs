use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use splice_core::domain::config::{Config, ConfigMeta, TransformConfig};
use splice_core::domain::run::{Run, RunStatus};
use splice_core::dto::config::{ConfigRef, ConfigSummary, UpsertedConfig};
use splice_core::dto::execute::{
    CallInput, ExecuteTransform, GenerateSchema, GeneratedSchema, RunPipeline, TransformResult,
};
use splice_engine::http::ReqwestHttpClient;
use splice_engine::{
    CompletionOptions, Engine, EngineConfig, MemoryStore, Message, Oracle, OracleError,
    SpliceService,
};
use splice_server::api::create_router;
use splice_server::state::AppState;
use tokio::sync::Mutex;

struct CannedOracle {
    replies: Mutex<VecDeque<Value>>,
}

#[async_trait]
impl Oracle for CannedOracle {
    async fn complete(
        &self,
        _messages: &[Message],
        _options: &CompletionOptions,
    ) -> Result<String, OracleError> {
        self.replies
            .lock()
            .await
            .pop_front()
            .map(|v| v.to_string())
            .ok_or(OracleError::EmptyResponse)
    }

    fn supports_temperature(&self, _model: &str) -> bool {
        false
    }
}

/// Serves the router on an ephemeral port and returns its base url
async fn spawn_server(replies: Vec<Value>) -> String {
    let oracle = Arc::new(CannedOracle {
        replies: Mutex::new(replies.into()),
    });
    let mut config = EngineConfig::new("sk-test");
    config.max_retries = 1;
    let http = ReqwestHttpClient::new(config.http_timeout).unwrap();
    let engine = Engine::new(oracle, Arc::new(http), &config);
    let service = SpliceService::new(Arc::new(engine), Arc::new(MemoryStore::new()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(AppState::new(service)))
            .await
            .unwrap();
    });
    format!("http://{}", addr)
}

fn doubler(expression: &str) -> Config {
    Config::Transform(TransformConfig {
        meta: ConfigMeta::new("doubler", "double the value"),
        expression: expression.to_string(),
        schema: json!({
            "type": "object",
            "properties": { "doubled": { "type": "number" } },
            "required": ["doubled"]
        }),
    })
}

#[tokio::test]
async fn health_returns_ok() {
    let base = spawn_server(vec![]).await;
    let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn config_lifecycle() {
    let base = spawn_server(vec![]).await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{}/api/configs", base))
        .json(&doubler("{ doubled = input.value * 2 }"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let first: UpsertedConfig = resp.json().await.unwrap();
    assert_eq!(first.revision, 1);

    let resp = client
        .put(format!("{}/api/configs", base))
        .json(&doubler("{ doubled = 2 * input.value }"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let second: UpsertedConfig = resp.json().await.unwrap();
    assert_eq!(second.revision, 2);

    let listed: Vec<ConfigSummary> = client
        .get(format!("{}/api/configs?kind=transform", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].revision, 2);

    let fetched: Config = client
        .get(format!("{}/api/configs/doubler", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched.revision(), 2);

    let resp = client
        .delete(format!("{}/api/configs/doubler", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(format!("{}/api/configs/doubler", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("doubler"));
}

#[tokio::test]
async fn unknown_kind_filter_is_rejected() {
    let base = spawn_server(vec![]).await;
    let resp = reqwest::get(format!("{}/api/configs?kind=widget", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn transform_generates_and_persists_expression() {
    let base = spawn_server(vec![json!({ "expression": "{ doubled = input.value * 2 }" })]).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/transform", base))
        .json(&ExecuteTransform {
            config: ConfigRef::Inline(doubler("")),
            input: json!({ "value": 21 }),
        })
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let result: TransformResult = resp.json().await.unwrap();
    assert_eq!(result.data["doubled"].as_f64(), Some(42.0));
    assert_eq!(result.retries, 1);

    let stored: Config = client
        .get(format!("{}/api/configs/doubler", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    match stored {
        Config::Transform(t) => assert_eq!(t.expression, "{ doubled = input.value * 2 }"),
        other => panic!("unexpected kind {}", other.kind()),
    }
}

#[tokio::test]
async fn exhausted_transform_is_unprocessable() {
    let base = spawn_server(vec![json!({ "answer": "no" }), json!({ "answer": "still no" })]).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/transform", base))
        .json(&ExecuteTransform {
            config: ConfigRef::Inline(doubler("")),
            input: json!({ "value": 21 }),
        })
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn pipeline_run_is_recorded() {
    let base = spawn_server(vec![]).await;
    let client = reqwest::Client::new();

    let run: Run = client
        .post(format!("{}/api/pipeline/run", base))
        .json(&RunPipeline {
            steps: vec![ConfigRef::Inline(doubler("{ doubled = input.value * 2 }"))],
            input: CallInput::from_payload(json!({ "value": 4 })),
        })
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(run.steps.len(), 1);

    let fetched: Run = client
        .get(format!("{}/api/runs/{}", base, run.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched.id, run.id);
    assert_eq!(fetched.status, RunStatus::Success);

    let runs: Vec<Run> = client
        .get(format!("{}/api/runs", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(runs.len(), 1);
}

#[tokio::test]
async fn missing_stored_step_fails_the_run() {
    let base = spawn_server(vec![]).await;
    let run: Run = reqwest::Client::new()
        .post(format!("{}/api/pipeline/run", base))
        .json(&RunPipeline {
            steps: vec![ConfigRef::Stored("nope".into())],
            input: CallInput::default(),
        })
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.steps.is_empty());
    assert!(run.error.is_some());
}

#[tokio::test]
async fn unknown_run_is_not_found() {
    let base = spawn_server(vec![]).await;
    let resp = reqwest::get(format!("{}/api/runs/{}", base, uuid::Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn schema_generation_returns_schema() {
    let schema = json!({
        "type": "object",
        "properties": { "name": { "type": "string" } },
        "required": ["name"]
    });
    let base = spawn_server(vec![json!({ "jsonSchema": schema.clone() })]).await;

    let generated: GeneratedSchema = reqwest::Client::new()
        .post(format!("{}/api/schema/generate", base))
        .json(&GenerateSchema {
            instruction: "list user names".to_string(),
            sample: json!({ "name": "Ada" }),
        })
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(generated.schema, schema);
}
