//! HTTP-level tests for the points gateway
//!
//! Requests go through the full router (extractors, error mapping, JSON
//! encoding) against an in-memory ledger.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use points_gateway::{router, AppState};
use points_ledger::{AllocationPolicy, Ledger, MemoryStorage};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let ledger = Ledger::with_store(
        Arc::new(MemoryStorage::new()),
        AllocationPolicy::Faithful,
        64,
    )
    .unwrap();
    router(AppState::new(ledger, "points-gateway-test"))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(body)
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn add(app: &Router, payload: Value) -> (StatusCode, Value) {
    send(app, "POST", "/add", Some(payload.to_string())).await
}

async fn seed_reference(app: &Router) {
    let credits = [
        ("DANNON", 300, "2020-10-31T10:00:00Z"),
        ("UNILEVER", 200, "2020-10-31T11:00:00Z"),
        ("DANNON", -200, "2020-10-31T15:00:00Z"),
        ("MILLER COORS", 10000, "2020-11-01T14:00:00Z"),
        ("DANNON", 1000, "2020-11-02T14:00:00Z"),
    ];

    // Submitted out of timestamp order on purpose
    for idx in [4, 0, 3, 1, 2] {
        let (payer, points, timestamp) = credits[idx];
        let (status, _) = add(
            app,
            json!({ "payer": payer, "points": points, "timestamp": timestamp }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_reference_scenario_over_http() {
    let app = app();
    seed_reference(&app).await;

    let (status, body) = send(&app, "POST", "/spend", Some(json!({ "points": 5000 }).to_string())).await;
    assert_eq!(status, StatusCode::OK);

    let mut deltas = body.as_array().unwrap().clone();
    deltas.sort_by(|a, b| a["payer"].as_str().cmp(&b["payer"].as_str()));
    assert_eq!(
        Value::Array(deltas),
        json!([
            { "payer": "DANNON", "points": -100 },
            { "payer": "MILLER COORS", "points": -4700 },
            { "payer": "UNILEVER", "points": -200 },
        ])
    );

    let (status, body) = send(&app, "GET", "/balance", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "DANNON": 1000, "UNILEVER": 0, "MILLER COORS": 5300 })
    );
}

#[tokio::test]
async fn test_empty_ledger_balance() {
    let app = app();
    let (status, body) = send(&app, "GET", "/balance", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_add_rejects_invalid_input() {
    let app = app();
    let cases = [
        json!({ "points": 100, "timestamp": "2020-11-02T14:00:00Z" }),
        json!({ "payer": "", "points": 100, "timestamp": "2020-11-02T14:00:00Z" }),
        json!({ "payer": "DANNON", "points": 0, "timestamp": "2020-11-02T14:00:00Z" }),
        json!({ "payer": "DANNON", "timestamp": "2020-11-02T14:00:00Z" }),
        json!({ "payer": "DANNON", "points": 100 }),
    ];

    for payload in cases {
        let (status, body) = add(&app, payload.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {}", payload);
        assert!(body["error"].is_string(), "payload: {}", payload);
    }

    // Nothing was stored
    let (_, body) = send(&app, "GET", "/balance", None).await;
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_add_rejects_malformed_json() {
    let app = app();
    let (status, body) = send(&app, "POST", "/add", Some("{ not json".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_negative_credit_is_accepted() {
    let app = app();
    let (status, _) = add(
        &app,
        json!({ "payer": "DANNON", "points": -200, "timestamp": "2020-10-31T15:00:00Z" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/balance", None).await;
    assert_eq!(body, json!({ "DANNON": -200 }));
}

#[tokio::test]
async fn test_spend_rejects_non_positive_amount() {
    let app = app();
    seed_reference(&app).await;

    for payload in [json!({ "points": 0 }), json!({ "points": -10 }), json!({})] {
        let (status, body) = send(&app, "POST", "/spend", Some(payload.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {}", payload);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_overspend_returns_not_enough_points() {
    let app = app();
    seed_reference(&app).await;

    let (status, body) = send(&app, "POST", "/spend", Some(json!({ "points": 11301 }).to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Not enough points" }));

    // Ledger unchanged
    let (_, body) = send(&app, "GET", "/balance", None).await;
    assert_eq!(
        body,
        json!({ "DANNON": 1100, "UNILEVER": 200, "MILLER COORS": 10000 })
    );
}

#[tokio::test]
async fn test_add_refuses_totals_out_of_range() {
    let app = app();
    let (status, _) = add(
        &app,
        json!({ "payer": "DANNON", "points": i64::MAX, "timestamp": "2020-10-31T10:00:00Z" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = add(
        &app,
        json!({ "payer": "UNILEVER", "points": 1, "timestamp": "2020-10-31T11:00:00Z" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // Service still answers and the refused credit left no trace
    let (status, body) = send(&app, "GET", "/balance", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "DANNON": i64::MAX }));

    let (status, _) = send(&app, "POST", "/spend", Some(json!({ "points": 100 }).to_string())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "points-gateway-test");
}

#[tokio::test]
async fn test_metrics_reflect_operations() {
    let app = app();
    seed_reference(&app).await;
    send(&app, "POST", "/spend", Some(json!({ "points": 5000 }).to_string())).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("points_credits_total 5"));
    assert!(text.contains("points_spends_total 1"));
}
