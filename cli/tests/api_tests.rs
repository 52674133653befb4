// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP API tests against an in-memory runtime

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use pattern_memory::daemon::{router, AppState};
use pattern_memory_cortex::application::CortexRuntime;
use pattern_memory_cortex::domain::config::PatternMemoryConfig;
use pattern_memory_cortex::domain::llm::GenerationOptions;
use pattern_memory_cortex::infrastructure::llm::OllamaProvider;
use pattern_memory_cortex::infrastructure::{InMemoryPatternRepository, LlmClassificationStrategy};

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn app() -> Router {
    router(AppState::new(CortexRuntime::in_memory()))
}

/// Runtime whose classifier calls an Ollama endpoint at `url`
fn llm_runtime(url: String) -> CortexRuntime {
    let provider = Arc::new(OllamaProvider::new(url, "llama3.2"));
    CortexRuntime::with_components(
        PatternMemoryConfig::default(),
        Arc::new(InMemoryPatternRepository::new()),
        Arc::new(LlmClassificationStrategy::new(provider, GenerationOptions::default())),
    )
}

#[tokio::test]
async fn health_reports_uptime() {
    let (status, body) = call(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn learn_then_query_round() {
    let app = app();

    let (status, failed) = call(
        &app,
        post(
            "/api/learn",
            json!({"task": "scrape company filings", "output": "403", "quality_score": 0.1, "metadata": {"domain": "osint"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(failed["classification"]["classification"], "FAILURE");
    assert_eq!(failed["occurrences"], 1);

    let (_, fixed) = call(
        &app,
        post(
            "/api/learn",
            json!({"task": "scrape company filings", "output": "200", "quality_score": 0.95, "metadata": {"domain": "osint"}}),
        ),
    )
    .await;
    assert_eq!(fixed["linked_to"], failed["pattern_name"]);

    let (status, practices) = call(&app, get("/api/best-practices?domain=osint&classification=SUCCESS&limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(practices.as_array().unwrap().len(), 1);
    assert_eq!(practices[0]["name"], fixed["pattern_name"]);

    let failure_name = failed["pattern_name"].as_str().unwrap();
    let (status, remedies) = call(&app, get(&format!("/api/patterns/{}/remedies", failure_name))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(remedies[0]["pattern"]["name"], fixed["pattern_name"]);

    let (_, stats) = call(&app, get("/api/stats")).await;
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["link_count"], 1);
}

#[tokio::test]
async fn invalid_input_is_400_with_error_envelope() {
    let (status, body) = call(&app(), post("/api/learn", json!({"task": "", "quality_score": 0.5}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_argument");
    assert_eq!(body["error"]["retryable"], false);

    let (status, body) = call(&app(), post("/api/learn", json!({"quality_score": 0.5}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_argument");

    let (status, _) = call(&app(), get("/api/best-practices?limit=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app(), get("/api/best-practices?classification=MAYBE")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_query_string_keeps_error_envelope() {
    let (status, body) = call(&app(), get("/api/best-practices?limit=-1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_argument");
    assert_eq!(body["error"]["retryable"], false);

    let (status, body) = call(&app(), get("/api/patterns/failure:x:00000000/remedies?limit=many")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_argument");
}

#[tokio::test]
async fn missing_pattern_is_404() {
    let (status, body) = call(&app(), get("/api/patterns/failure:nothing:00000000")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "pattern_not_found");
}

#[tokio::test]
async fn wrong_link_direction_is_422() {
    let app = app();
    let (_, failed) = call(&app, post("/api/learn", json!({"task": "a", "quality_score": 0.1}))).await;
    let (_, other) = call(&app, post("/api/learn", json!({"task": "b", "quality_score": 0.1}))).await;

    let (status, body) = call(
        &app,
        post(
            "/api/links",
            json!({"success": failed["pattern_name"], "failure": other["pattern_name"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "invalid_link_direction");
}

#[tokio::test]
async fn explicit_link_reinforces() {
    let app = app();
    let (_, failed) = call(&app, post("/api/learn", json!({"task": "x", "quality_score": 0.1}))).await;
    let (_, fixed) = call(
        &app,
        post("/api/learn", json!({"task": "y", "quality_score": 0.9, "metadata": {"link_with": failed["pattern_name"]}})),
    )
    .await;
    assert_eq!(fixed["linked_to"], failed["pattern_name"]);

    let (status, link) = call(
        &app,
        post(
            "/api/links",
            json!({"success": fixed["pattern_name"], "failure": failed["pattern_name"], "reinforcement": 0.5}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!((link["strength"].as_f64().unwrap() - 0.6).abs() < 1e-9);
}

#[tokio::test]
async fn decay_accepts_empty_and_humantime_bodies() {
    let app = app();
    call(&app, post("/api/learn", json!({"task": "old task", "quality_score": 0.9}))).await;

    let request = Request::builder().method("POST").uri("/api/decay").body(Body::empty()).unwrap();
    let (status, report) = call(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["patterns_decayed"], 0);

    let future = (chrono::Utc::now() + chrono::Duration::days(2)).to_rfc3339();
    let (status, report) = call(&app, post("/api/decay", json!({"now": future, "decay_after": "1day"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["patterns_decayed"], 1);
    assert_eq!(report["newly_dormant"], 1);

    let (status, _) = call(&app, post("/api/decay", json!({"decay_after": "soon"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unavailable_classifier_is_503_and_records_nothing() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/api/generate")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let app = router(AppState::new(llm_runtime(server.url())));

    let (status, body) = call(&app, post("/api/learn", json!({"task": "t", "quality_score": 0.9}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["message"], "learning disabled, pattern not recorded");
    assert_eq!(body["error"]["retryable"], true);

    let (_, stats) = call(&app, get("/api/stats")).await;
    assert_eq!(stats["total"], 0);
}

#[tokio::test]
async fn shutdown_cancels_learning_with_499() {
    let server = mockito::Server::new_async().await;
    let token = CancellationToken::new();
    token.cancel();
    let app = router(AppState::new(llm_runtime(server.url())).with_shutdown(token));

    let (status, body) = call(&app, post("/api/learn", json!({"task": "t", "quality_score": 0.9}))).await;
    assert_eq!(status.as_u16(), 499);
    assert_eq!(body["error"]["kind"], "cancelled");
    assert_eq!(body["error"]["retryable"], false);
}

#[tokio::test]
async fn metrics_disabled_without_recorder() {
    let (status, _) = call(&app(), get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
