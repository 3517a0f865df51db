//! Wire-level tests for the network providers against a local fake upstream.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use habit_service::services::planner;
use habit_service::services::providers::{
    AnthropicConfig, AnthropicProvider, BedrockConfig, BedrockProvider, FinishReason,
    ProviderError, TextProvider,
};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_bedrockruntime::config::{Credentials, SharedCredentialsProvider};
use secrecy::Secret;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone, Debug)]
struct Captured {
    uri: String,
    headers: HeaderMap,
    body: serde_json::Value,
}

#[derive(Clone)]
struct FakeUpstream {
    status: StatusCode,
    reply: serde_json::Value,
    captured: Arc<Mutex<Vec<Captured>>>,
}

async fn record(
    State(upstream): State<FakeUpstream>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    upstream.captured.lock().unwrap().push(Captured {
        uri: uri.to_string(),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    });
    (upstream.status, axum::Json(upstream.reply.clone()))
}

/// Serve `reply` with `status` for every request; returns the base URL.
async fn spawn_upstream(
    status: StatusCode,
    reply: serde_json::Value,
) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().fallback(record).with_state(FakeUpstream {
        status,
        reply,
        captured: captured.clone(),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (format!("http://127.0.0.1:{}", port), captured)
}

fn envelope(text: &str) -> serde_json::Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": text }],
        "stop_reason": "end_turn",
        "usage": { "input_tokens": 120, "output_tokens": 340 }
    })
}

fn bedrock(endpoint: String) -> BedrockProvider {
    let shared = SdkConfig::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(SharedCredentialsProvider::new(Credentials::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            None,
            None,
            "providers-test",
        )))
        .build();

    BedrockProvider::from_sdk_config(
        &shared,
        BedrockConfig {
            region: "us-east-1".to_string(),
            endpoint: Some(endpoint),
            model_id: "anthropic.claude-3-sonnet-20240229-v1:0".to_string(),
            timeout: Duration::from_secs(5),
            max_attempts: 1,
        },
    )
}

async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
    drop(listener);
    base
}

fn anthropic(base_url: String) -> AnthropicProvider {
    AnthropicProvider::new(AnthropicConfig {
        api_key: Secret::new("sk-test".to_string()),
        base_url,
        model: "claude-3-sonnet-20240229".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn bedrock_sends_invoke_model_request() {
    let (base, captured) = spawn_upstream(StatusCode::OK, envelope(r#"{"goal":"x"}"#)).await;
    let provider = bedrock(base);

    let response = provider
        .generate(&planner::build_request("drink more water"))
        .await
        .unwrap();

    assert_eq!(response.text, r#"{"goal":"x"}"#);
    assert_eq!(response.input_tokens, 120);
    assert_eq!(response.output_tokens, 340);
    assert_eq!(response.finish_reason, FinishReason::Complete);

    let captured = captured.lock().unwrap();
    assert_eq!(captured.len(), 1);
    let request = &captured[0];

    assert!(request
        .uri
        .starts_with("/model/anthropic.claude-3-sonnet-20240229-v1"));
    assert!(request.uri.ends_with("/invoke"));
    assert_eq!(request.headers["content-type"], "application/json");
    assert_eq!(request.headers["accept"], "application/json");

    let authorization = request.headers["authorization"].to_str().unwrap();
    assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
    assert!(authorization.contains("/us-east-1/bedrock/aws4_request"));
    assert!(request.headers.contains_key("x-amz-date"));

    assert_eq!(request.body["anthropic_version"], "bedrock-2023-05-31");
    assert_eq!(request.body["max_tokens"], 600);
    assert_eq!(request.body["temperature"], 0.5);
    assert!(request.body.get("model").is_none());
    assert_eq!(request.body["messages"][0]["role"], "user");
    assert!(request.body["messages"][0]["content"]
        .as_str()
        .unwrap()
        .contains("drink more water"));
    assert!(request.body["system"]
        .as_str()
        .unwrap()
        .contains("habit-building coach"));
}

#[tokio::test]
async fn bedrock_throttling_is_rate_limited() {
    let (base, _) = spawn_upstream(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "message": "Too many requests" }),
    )
    .await;

    let err = bedrock(base)
        .generate(&planner::build_request("x"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::RateLimited));
}

#[tokio::test]
async fn bedrock_server_error_is_api_error() {
    let (base, _) = spawn_upstream(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "message": "boom" }),
    )
    .await;

    let err = bedrock(base)
        .generate(&planner::build_request("x"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::ApiError(_)));
}

#[tokio::test]
async fn bedrock_unreachable_endpoint_is_sdk_error() {
    let err = bedrock(closed_port_url().await)
        .generate(&planner::build_request("x"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Sdk(_)));
}

#[tokio::test]
async fn anthropic_sends_api_key_and_model() {
    let (base, captured) = spawn_upstream(StatusCode::OK, envelope("hello")).await;
    let provider = anthropic(base);

    let response = provider
        .generate(&planner::build_request("read more"))
        .await
        .unwrap();
    assert_eq!(response.text, "hello");

    let captured = captured.lock().unwrap();
    let request = &captured[0];
    assert_eq!(request.uri, "/v1/messages");
    assert_eq!(request.headers["x-api-key"], "sk-test");
    assert_eq!(request.headers["anthropic-version"], "2023-06-01");
    assert_eq!(request.body["model"], "claude-3-sonnet-20240229");
    assert_eq!(request.body["max_tokens"], 600);
    assert!(request.body.get("anthropic_version").is_none());
}

#[tokio::test]
async fn envelope_without_text_is_missing_content() {
    let (base, _) = spawn_upstream(
        StatusCode::OK,
        json!({ "content": [], "usage": { "input_tokens": 1, "output_tokens": 0 } }),
    )
    .await;

    let err = anthropic(base)
        .generate(&planner::build_request("x"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::MissingContent));
}

#[tokio::test]
async fn anthropic_unreachable_upstream_is_network_error() {
    let err = anthropic(closed_port_url().await)
        .generate(&planner::build_request("x"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::NetworkError(_)));
}
