//! Integration tests for the service, health and lookup endpoints

mod common;

use africanite_payment_hub::api::{build_app, router, AppState};
use africanite_payment_hub::config::ServerConfig;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::*;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn default_app() -> axum::Router {
    test_app(
        Arc::new(InMemoryStore::default()),
        Arc::new(ScriptedGateway::replying(json!({"Status": "Success"}))),
    )
}

#[tokio::test]
async fn test_root_reports_forwarded_client_ip() {
    let request = Request::builder()
        .uri("/")
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(default_app(), request).await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "online");
    assert_eq!(body["service"], "Africanite Payment Hub");
    assert_eq!(body["ip"], "203.0.113.9");
}

#[tokio::test]
async fn test_check_ip_returns_outbound_address() {
    let (status, body) = send(default_app(), get("/check-ip")).await;

    assert_eq!(status, 200);
    assert_eq!(body["outbound_ip"], "198.51.100.20");
}

#[tokio::test]
async fn test_check_ip_lookup_failure_is_500() {
    let app = router(AppState::new(
        Arc::new(InMemoryStore::default()),
        Arc::new(ScriptedGateway::replying(json!({}))),
        Arc::new(FixedIp(None)),
        configured_freshpay(),
        None,
    ));

    let (status, body) = send(app, get("/check-ip")).await;

    assert_eq!(status, 500);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_transaction_lookup() {
    let store = Arc::new(InMemoryStore::default());
    store.seed("AFLOOKUP01", Some("FP-1"));
    let app = test_app(
        store,
        Arc::new(ScriptedGateway::replying(json!({"Status": "Success"}))),
    );

    let (status, body) = send(app.clone(), get("/transactions/AFLOOKUP01")).await;
    assert_eq!(status, 200);
    assert_eq!(body["moko_reference"], "AFLOOKUP01");
    assert_eq!(body["freshpay_ref"], "FP-1");
    assert_eq!(body["status"], "PENDING");

    let (status, body) = send(app, get("/transactions/AFMISSING")).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "TRANSACTION_NOT_FOUND");
}

#[tokio::test]
async fn test_health_reports_database_down_as_unavailable() {
    let app = test_app(
        Arc::new(InMemoryStore::failing()),
        Arc::new(ScriptedGateway::replying(json!({}))),
    );

    let (status, body) = send(app, get("/health")).await;

    assert_eq!(status, 503);
    assert_eq!(body["status"], "Unhealthy");
    assert_eq!(body["checks"]["database"]["status"], "Down");
}

#[tokio::test]
async fn test_health_degraded_without_credentials() {
    let app = test_app_with(
        Arc::new(InMemoryStore::default()),
        Arc::new(ScriptedGateway::replying(json!({}))),
        Default::default(),
    );

    let (status, body) = send(app, get("/health")).await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "Degraded");
    assert_eq!(body["checks"]["freshpay"]["status"], "Warning");
}

#[tokio::test]
async fn test_full_app_propagates_request_id() {
    let state = AppState::new(
        Arc::new(InMemoryStore::default()),
        Arc::new(ScriptedGateway::replying(json!({}))),
        Arc::new(FixedIp(Some("198.51.100.20"))),
        configured_freshpay(),
        None,
    );
    let server = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 3000,
        cors_allowed_origins: vec!["*".to_string()],
        public_base_url: None,
    };
    let app = build_app(state, &server);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/live")
                .header("x-request-id", "req-abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-abc"
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"OK");
}
