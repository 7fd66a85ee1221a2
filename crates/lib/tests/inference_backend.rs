//! Integration test: InferenceHttpBackend against a local axum stand-in for the inference endpoint.
//! Does not require network access.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use lib::backend::{AnswerBackend, FailureKind, InferenceHttpBackend, PROCESSING_PLACEHOLDER};
use lib::dispatch::{ask_with_fallback, TRY_AGAIN_REPLY};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Seen {
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    seen: Arc<Mutex<Vec<Seen>>>,
}

async fn generate(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    state.seen.lock().unwrap().push(Seen {
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });
    tokio::time::sleep(state.delay).await;
    (state.status, state.body.to_string())
}

/// Start a mock endpoint; returns its URL and the shared state.
async fn start_mock(status: StatusCode, body: &'static str, delay: Duration) -> (String, MockState) {
    let state = MockState {
        status,
        body,
        delay,
        seen: Arc::new(Mutex::new(Vec::new())),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock endpoint");
    let addr = listener.local_addr().expect("local_addr");
    let app = Router::new()
        .route("/models/test", post(generate))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}/models/test", addr), state)
}

fn backend(endpoint: &str, token: Option<&str>, timeout: Duration) -> InferenceHttpBackend {
    InferenceHttpBackend::new(endpoint, token.map(str::to_string), timeout, 64, 0.5)
}

#[tokio::test]
async fn success_returns_first_generated_text() {
    let (url, state) = start_mock(
        StatusCode::OK,
        r#"[{"generated_text":"4"}]"#,
        Duration::ZERO,
    )
    .await;
    let answer = backend(&url, Some("hf_test"), Duration::from_secs(5))
        .ask("What is 2+2?")
        .await
        .unwrap();
    assert_eq!(answer, "4");

    let seen = state.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer hf_test"));
    assert_eq!(
        seen[0].body,
        json!({ "inputs": "What is 2+2?", "parameters": { "max_length": 64, "temperature": 0.5 } })
    );
}

#[tokio::test]
async fn non_200_is_upstream_error() {
    let (url, _) = start_mock(
        StatusCode::SERVICE_UNAVAILABLE,
        r#"{"error":"Model is currently loading"}"#,
        Duration::ZERO,
    )
    .await;
    let err = backend(&url, Some("hf_test"), Duration::from_secs(5))
        .ask("hi")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::UpstreamError);
    assert!(err.to_string().contains("503"));
    assert!(err.to_string().contains("loading"));
}

#[tokio::test]
async fn unexpected_success_shape_is_placeholder() {
    let (url, _) = start_mock(StatusCode::OK, r#"{"error":"odd"}"#, Duration::ZERO).await;
    let answer = backend(&url, Some("hf_test"), Duration::from_secs(5))
        .ask("hi")
        .await
        .unwrap();
    assert_eq!(answer, PROCESSING_PLACEHOLDER);
}

#[tokio::test]
async fn slow_endpoint_is_unavailable() {
    let (url, _) = start_mock(
        StatusCode::OK,
        r#"[{"generated_text":"late"}]"#,
        Duration::from_secs(3),
    )
    .await;
    let err = backend(&url, Some("hf_test"), Duration::from_millis(200))
        .ask("hi")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Unavailable);
}

#[tokio::test]
async fn refused_connection_is_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local_addr").port();
    drop(listener);
    let url = format!("http://127.0.0.1:{}/models/test", port);
    let err = backend(&url, Some("hf_test"), Duration::from_secs(2))
        .ask("hi")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Unavailable);
}

#[tokio::test]
async fn missing_token_makes_no_request() {
    let (url, state) = start_mock(
        StatusCode::OK,
        r#"[{"generated_text":"4"}]"#,
        Duration::ZERO,
    )
    .await;
    let b = backend(&url, None, Duration::from_secs(5));
    for q in ["hi", "What is 2+2?"] {
        let err = b.ask(q).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotConfigured);
    }
    assert!(state.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn upstream_failure_maps_to_try_again() {
    let (url, _) = start_mock(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal details",
        Duration::ZERO,
    )
    .await;
    let b = backend(&url, Some("hf_test"), Duration::from_secs(5));
    let reply = ask_with_fallback(&b, "hi", Duration::from_secs(5)).await;
    assert_eq!(reply, TRY_AGAIN_REPLY);
}
