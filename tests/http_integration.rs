//! Integration tests for the `POST /query` endpoint.

mod common;

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::MemoryClient;
use coto::query::{Broker, BrokerConfig};
use coto::server::{drain_on, router};

fn basic(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

fn target() -> Value {
    json!({ "host": "localhost", "database": "shop", "collection": "products" })
}

async fn post(
    broker: &Arc<Broker<MemoryClient>>,
    auth: Option<String>,
    body: Value,
) -> (StatusCode, Value) {
    let mut request = Request::post("/query").header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        request = request.header(header::AUTHORIZATION, auth);
    }
    let request = request.body(Body::from(body.to_string())).unwrap();

    let response = router(Arc::clone(broker)).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn broker() -> Arc<Broker<MemoryClient>> {
    Arc::new(Broker::init(MemoryClient::with_products(), BrokerConfig::default()).unwrap())
}

#[tokio::test]
async fn test_find_returns_result_array() {
    let broker = broker();

    let (status, body) = post(
        &broker,
        Some(basic("grafana", "secret")),
        json!({
            "type": "find",
            "query": "{\"qty\": {\"$gt\": 15}}",
            "sort": "{\"qty\": 1}",
            "limit": 2,
            "db": target(),
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let result = body["result"].as_array().unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result[0]["qty"], json!(20));
    assert_eq!(result[1]["qty"], json!(30));
    assert_eq!(result[0]["createdAt"], json!("2024-02-01T00:00:00.000Z"));
    assert_eq!(result[0]["_id"], json!("507f1f77bcf86cd799439012"));

    broker.shutdown().await;
}

#[tokio::test]
async fn test_aggregate_with_inline_pipeline() {
    let broker = broker();

    let (status, body) = post(
        &broker,
        Some(basic("grafana", "secret")),
        json!({
            "type": "aggregate",
            "query": [{ "$match": { "qty": { "$lte": 20 } } }, { "$count": "n" }],
            "db": target(),
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "result": [{ "n": 2 }] }));
    broker.shutdown().await;
}

#[tokio::test]
async fn test_requests_share_a_pooled_connection() {
    let broker = broker();
    let request = json!({ "type": "find", "query": "{}", "db": target() });

    for _ in 0..3 {
        let (status, _) = post(&broker, Some(basic("grafana", "secret")), request.clone()).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(broker.pool().client().opens(), 1);
    assert_eq!(broker.pool().stats().reuses, 2);
    broker.shutdown().await;
}

#[tokio::test]
async fn test_missing_credentials_is_unauthorized() {
    let broker = broker();

    let (status, body) = post(
        &broker,
        None,
        json!({ "type": "find", "query": "{}", "db": target() }),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("C7004"));
    assert_eq!(broker.pool().client().opens(), 0);
    broker.shutdown().await;
}

#[tokio::test]
async fn test_rejected_credentials_are_unauthorized_and_redacted() {
    let broker = broker();
    broker.pool().client().reject_auth(true);

    let (status, body) = post(
        &broker,
        Some(basic("grafana", "hunter2")),
        json!({ "type": "find", "query": "{}", "db": target() }),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!body.to_string().contains("hunter2"));
    assert_eq!(body["suggestions"].as_array().map(Vec::len), Some(4));
    broker.shutdown().await;
}

#[tokio::test]
async fn test_unsupported_kind_is_bad_request() {
    let broker = broker();

    let (status, body) = post(
        &broker,
        Some(basic("grafana", "secret")),
        json!({ "type": "delete", "query": "{}", "db": target() }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("delete"));
    assert_eq!(broker.pool().client().opens(), 0);
    broker.shutdown().await;
}

#[tokio::test]
async fn test_malformed_query_is_bad_request() {
    let broker = broker();

    let (status, _) = post(
        &broker,
        Some(basic("grafana", "secret")),
        json!({ "type": "find", "query": "{\"qty\": ", "db": target() }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    broker.shutdown().await;
}

#[tokio::test]
async fn test_missing_target_field_is_bad_request() {
    let broker = broker();

    let (status, body) = post(
        &broker,
        Some(basic("grafana", "secret")),
        json!({
            "type": "find",
            "query": "{}",
            "db": { "host": "localhost", "database": "shop" },
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("collection"));
    broker.shutdown().await;
}

#[tokio::test]
async fn test_remote_failure_is_bad_gateway() {
    let broker = broker();

    let (status, _) = post(
        &broker,
        Some(basic("grafana", "secret")),
        json!({ "type": "aggregate", "query": "[{\"$bogus\": 1}]", "db": target() }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    broker.shutdown().await;
}

#[tokio::test]
async fn test_pool_drains_when_shutdown_signal_fires() {
    let broker = broker();
    let (status, _) = post(
        &broker,
        Some(basic("grafana", "secret")),
        json!({ "type": "find", "query": "{}", "db": target() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (fire, signal) = tokio::sync::oneshot::channel::<()>();
    let drain = tokio::spawn(drain_on(Arc::clone(&broker), async move {
        let _ = signal.await;
    }));

    tokio::task::yield_now().await;
    assert_eq!(broker.pool().len(), 1);

    fire.send(()).unwrap();
    drain.await.unwrap();

    assert!(broker.pool().is_empty());
    assert_eq!(broker.pool().client().closed(), vec![1]);
}
