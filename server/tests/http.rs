//! HTTP routes next to the WebSocket endpoint.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::*;
use server::ServerConfig;
use tower::ServiceExt;

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_metrics_reports_counters() {
    let (app, metrics) = relay_router(test_config());
    metrics.session_opened();
    metrics.record_message(true, true);
    metrics.record_stream(3, 3000, false);

    let (status, json) = get(app.clone(), "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sessions_opened"], 1);
    assert_eq!(json["sessions_active"], 1);
    assert_eq!(json["messages"], 1);
    assert_eq!(json["decode_fallbacks"], 1);
    assert_eq!(json["fallback_replies"], 1);
    assert_eq!(json["chunks_sent"], 3);
    assert_eq!(json["bytes_sent"], 3000);
    assert_eq!(json["partial_streams"], 1);
    assert!(json["timestamp"].is_string());
    assert!(json["turn_latency"]["p95_ms"].is_number());

    let (status, api_json) = get(app, "/api/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(api_json["messages"], 1);
}

#[tokio::test]
async fn test_unknown_route_error_body() {
    let (app, _) = relay_router(test_config());
    let (status, json) = get(app, "/api/voices").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], 404);
    assert!(json["error"].as_str().unwrap().contains("/api/voices"));
}

#[tokio::test]
async fn test_configured_cors_origin_is_echoed() {
    let config = ServerConfig {
        cors_allowed_origins: Some(vec!["http://localhost:3000".to_string()]),
        ..test_config()
    };
    let (app, _) = relay_router(config);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn test_rate_limit_rejects_burst_overflow() {
    let config = ServerConfig {
        rate_limit_per_minute: 2,
        ..test_config()
    };
    let (app, _) = relay_router(config);

    let mut statuses = Vec::new();
    for _ in 0..4 {
        let (status, _) = get(app.clone(), "/health").await;
        statuses.push(status);
    }
    assert_eq!(&statuses[..2], &[StatusCode::OK, StatusCode::OK]);
    assert!(statuses[2..].contains(&StatusCode::TOO_MANY_REQUESTS));
}
