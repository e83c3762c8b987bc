use serde_json::json;
use splice_client::SpliceClient;
use splice_core::domain::config::{Config, ConfigKind, ConfigMeta, TransformConfig};
use splice_core::domain::run::{Run, RunStatus};
use splice_core::dto::config::ConfigRef;
use splice_core::dto::execute::CallInput;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn doubler() -> Config {
    Config::Transform(TransformConfig {
        meta: ConfigMeta::new("doubler", "double the value"),
        expression: "{ doubled = input.value * 2 }".to_string(),
        schema: json!({ "type": "object" }),
    })
}

#[tokio::test]
async fn upsert_sends_config_and_reads_revision() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/configs"))
        .and(body_partial_json(json!({ "kind": "transform", "id": "doubler" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "doubler", "revision": 3 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = SpliceClient::new(server.uri());
    let upserted = client.upsert_config(&doubler()).await.unwrap();
    assert_eq!(upserted.revision, 3);
}

#[tokio::test]
async fn list_configs_passes_kind_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/configs"))
        .and(query_param("kind", "extract"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = SpliceClient::new(server.uri());
    let configs = client.list_configs(Some(ConfigKind::Extract)).await.unwrap();
    assert!(configs.is_empty());
}

#[tokio::test]
async fn server_error_message_is_unwrapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/configs/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": "Config not found: missing" })),
        )
        .mount(&server)
        .await;

    let client = SpliceClient::new(server.uri());
    let err = client.get_config("missing").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        err.to_string(),
        "API error (status 404): Config not found: missing"
    );
}

#[tokio::test]
async fn run_pipeline_returns_failed_run_as_value() {
    let server = MockServer::start().await;
    let run = Run {
        error: Some("Config not found: nope".to_string()),
        ..Run::new()
    };
    let mut failed = run.clone();
    failed.status = RunStatus::Failed;

    Mock::given(method("POST"))
        .and(path("/api/pipeline/run"))
        .and(body_partial_json(json!({ "steps": [{ "stored": "nope" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&failed))
        .mount(&server)
        .await;

    let client = SpliceClient::new(server.uri());
    let returned = client
        .run_pipeline(vec![ConfigRef::Stored("nope".into())], CallInput::default())
        .await
        .unwrap();
    assert_eq!(returned.status, RunStatus::Failed);
    assert_eq!(returned.id, failed.id);
}

#[tokio::test]
async fn generate_schema_unwraps_schema() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/schema/generate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "schema": { "type": "array" } })),
        )
        .mount(&server)
        .await;

    let client = SpliceClient::new(server.uri());
    let schema = client
        .generate_schema("list names", json!(["Ada"]))
        .await
        .unwrap();
    assert_eq!(schema, json!({ "type": "array" }));
}
