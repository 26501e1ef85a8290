//! HTTP transport: routes, status mapping, SSE streaming, timeouts and
//! client disconnects.

#![cfg(feature = "http")]

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use sasya_arogya_mcp::transport::http::{router, HttpConfig};

use common::{fixture_dispatcher, test_dispatcher, wait_until, Probe};

fn app(probe: &Probe, config: HttpConfig) -> Router {
    router(test_dispatcher(probe), &config)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Parse every `data:` payload of an SSE body.
fn sse_events(text: &str) -> Vec<Value> {
    text.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim_start()).unwrap())
        .collect()
}

async fn stream_events(response: axum::response::Response) -> Vec<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    sse_events(&String::from_utf8_lossy(&bytes))
}

// ═══════════════════════════════════════════════════════
// METADATA ROUTES
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_health() {
    let app = router(fixture_dispatcher(), &HttpConfig::default());
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_root_and_tool_listing() {
    let app = router(fixture_dispatcher(), &HttpConfig::default());

    let root = json_body(app.clone().oneshot(get("/")).await.unwrap()).await;
    assert_eq!(root["status"], "running");
    assert_eq!(root["tools"], 4);

    let response = app.oneshot(get("/tools")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let names: Vec<&str> = body["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "calculate_crop_premium",
            "get_insurance_companies",
            "generate_insurance_certificate",
            "recommend_insurance",
        ]
    );
    assert!(body["tools"][0]["summary"].is_string());
    assert_eq!(body["tools"][1]["inputSchema"]["type"], "object");
}

// ═══════════════════════════════════════════════════════
// SYNC CALLS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_call_success() {
    let app = router(fixture_dispatcher(), &HttpConfig::default());
    let response = app
        .oneshot(post(
            "/tools/call",
            json!({
                "name": "calculate_crop_premium",
                "arguments": { "crop": "Wheat", "area_hectare": 2.5, "state": "Karnataka" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["type"], "success");
    assert!(body["payload"]["total_premium"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_call_status_mapping() {
    let app = router(fixture_dispatcher(), &HttpConfig::default());
    let cases = [
        (json!({ "name": "nope", "arguments": {} }), 404, "unknown_tool"),
        (
            json!({ "name": "calculate_crop_premium", "arguments": { "crop": "Wheat" } }),
            400,
            "invalid_arguments",
        ),
        (
            json!({
                "name": "calculate_crop_premium",
                "arguments": { "crop": "Saffron", "area_hectare": 1, "state": "Goa" }
            }),
            404,
            "not_found",
        ),
        (json!({ "arguments": {} }), 400, "decode_error"),
    ];

    for (body, status, kind) in cases {
        let response = app.clone().oneshot(post("/tools/call", body)).await.unwrap();
        assert_eq!(response.status().as_u16(), status);
        let body = json_body(response).await;
        assert_eq!(body["type"], "failure");
        assert_eq!(body["kind"], kind);
    }
}

#[tokio::test]
async fn test_call_malformed_body_is_decode_error() {
    let app = router(fixture_dispatcher(), &HttpConfig::default());
    let request = Request::post("/tools/call")
        .header("content-type", "application/json")
        .body(Body::from("{\"name\":"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["kind"], "decode_error");
}

#[tokio::test]
async fn test_call_panic_is_internal_error() {
    let probe = Probe::default();
    let app = app(&probe, HttpConfig::default());
    let response = app
        .oneshot(post("/tools/call", json!({ "name": "panicky", "arguments": {} })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "internal_error");
    assert!(!body["message"].as_str().unwrap().contains("secret"));
}

#[tokio::test]
async fn test_call_timeout() {
    let probe = Probe::default();
    let config = HttpConfig {
        timeout: Some(Duration::from_millis(100)),
        ..HttpConfig::default()
    };
    let response = app(&probe, config)
        .oneshot(post(
            "/tools/call",
            json!({ "name": "slow", "arguments": { "millis": 5000 } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json_body(response).await["kind"], "timeout");
    assert!(wait_until(Duration::from_secs(2), || probe.dropped()).await);
}

// ═══════════════════════════════════════════════════════
// STREAMING
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_stream_events_end_with_done() {
    let probe = Probe::default();
    let response = app(&probe, HttpConfig::default())
        .oneshot(post(
            "/tools/call/stream",
            json!({ "name": "countdown", "arguments": { "count": 3 } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let events = stream_events(response).await;
    assert_eq!(events.len(), 4);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event["sequence"], i);
        assert_eq!(event["done"], i == 3);
    }
    assert_eq!(events[3]["partial"], json!({ "emitted": 3 }));
}

#[tokio::test]
async fn test_stream_early_failure_is_single_event() {
    let probe = Probe::default();
    let app = app(&probe, HttpConfig::default());

    let request = Request::post("/tools/call/stream")
        .body(Body::from("not json"))
        .unwrap();
    let events = stream_events(app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["sequence"], 0);
    assert_eq!(events[0]["done"], true);
    assert_eq!(events[0]["failure"]["kind"], "decode_error");

    let events = stream_events(
        app.oneshot(post("/tools/call/stream", json!({ "name": "nope" })))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["failure"]["kind"], "unknown_tool");
}

#[tokio::test]
async fn test_stream_timeout_is_terminal_event() {
    let probe = Probe::default();
    let config = HttpConfig {
        timeout: Some(Duration::from_millis(150)),
        ..HttpConfig::default()
    };
    let response = app(&probe, config)
        .oneshot(post("/tools/call/stream", json!({ "name": "chatty" })))
        .await
        .unwrap();

    let events = stream_events(response).await;
    let last = events.last().unwrap();
    assert_eq!(last["done"], true);
    assert_eq!(last["failure"]["kind"], "timeout");
    assert_eq!(last["sequence"], events.len() - 1);
    assert!(wait_until(Duration::from_secs(2), || probe.dropped()).await);
}

#[tokio::test]
async fn test_client_disconnect_stops_production() {
    let probe = Probe::default();
    let response = app(&probe, HttpConfig::default())
        .oneshot(post("/tools/call/stream", json!({ "name": "chatty" })))
        .await
        .unwrap();

    let mut body = response.into_body().into_data_stream();
    let mut seen = 0;
    while seen < 2 {
        let frame = body.next().await.unwrap().unwrap();
        seen += sse_events(&String::from_utf8_lossy(&frame)).len();
    }
    drop(body);

    assert!(wait_until(Duration::from_secs(2), || probe.dropped()).await);
    let settled = probe.emitted();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(probe.emitted(), settled);
}

// ═══════════════════════════════════════════════════════
// CONCURRENCY
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_health_bypasses_saturated_tool_routes() {
    let probe = Probe::default();
    let config = HttpConfig {
        max_concurrent: 1,
        ..HttpConfig::default()
    };
    let app = app(&probe, config);

    let busy = tokio::spawn(app.clone().oneshot(post(
        "/tools/call",
        json!({ "name": "slow", "arguments": { "millis": 500 } }),
    )));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let health = tokio::time::timeout(Duration::from_millis(200), app.oneshot(get("/health")))
        .await
        .expect("health must not wait for the tool limit")
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let busy = busy.await.unwrap().unwrap();
    assert_eq!(busy.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_calls_share_the_limit() {
    let probe = Probe::default();
    let config = HttpConfig {
        max_concurrent: 1,
        ..HttpConfig::default()
    };
    let app = app(&probe, config);

    let started = std::time::Instant::now();
    let calls = (0..3).map(|_| {
        app.clone().oneshot(post(
            "/tools/call",
            json!({ "name": "slow", "arguments": { "millis": 100 } }),
        ))
    });
    for response in futures::future::join_all(calls).await {
        assert_eq!(response.unwrap().status(), StatusCode::OK);
    }
    // Serialized by the limit of one.
    assert!(started.elapsed() >= Duration::from_millis(280));
}

#[tokio::test]
async fn test_open_stream_holds_its_slot() {
    let probe = Probe::default();
    let config = HttpConfig {
        max_concurrent: 1,
        ..HttpConfig::default()
    };
    let app = app(&probe, config);

    let response = app
        .clone()
        .oneshot(post("/tools/call/stream", json!({ "name": "chatty" })))
        .await
        .unwrap();
    let mut body = response.into_body().into_data_stream();
    let first = body.next().await.unwrap().unwrap();
    assert!(!sse_events(&String::from_utf8_lossy(&first)).is_empty());

    let waiting = tokio::spawn(app.clone().oneshot(post(
        "/tools/call",
        json!({ "name": "slow", "arguments": { "millis": 10 } }),
    )));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!waiting.is_finished(), "call admitted while the stream runs");

    // Listing is a read and never waits for an invocation slot.
    let listing = tokio::time::timeout(Duration::from_millis(200), app.oneshot(get("/tools")))
        .await
        .expect("listing must not wait for the invocation limit")
        .unwrap();
    assert_eq!(listing.status(), StatusCode::OK);

    drop(body);
    let admitted = tokio::time::timeout(Duration::from_secs(2), waiting)
        .await
        .expect("call must run once the stream is gone")
        .unwrap()
        .unwrap();
    assert_eq!(admitted.status(), StatusCode::OK);
    assert_eq!(json_body(admitted).await["payload"], json!({ "slept_ms": 10 }));
}
