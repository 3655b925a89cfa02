//! Router-level tests against a mock robot

use super::*;
use crate::device::EndpointConfig;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

fn state_for(server: &mockito::ServerGuard) -> Arc<ApiState> {
    let addr = server.host_with_port();
    let (host, port) = addr.rsplit_once(':').unwrap();
    let endpoint = EndpointConfig::new(DeviceEndpoint::new(host, port.parse().unwrap()));
    Arc::new(ApiState::new(DeviceClient::new(endpoint)))
}

/// State pointed at a dead port, for unreachable-device cases
fn offline_state() -> Arc<ApiState> {
    let endpoint = EndpointConfig::new(DeviceEndpoint::new("127.0.0.1", 1));
    Arc::new(ApiState::new(DeviceClient::new(endpoint)))
}

async fn send(router: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_config_roundtrip() {
    let server = mockito::Server::new_async().await;
    let state = state_for(&server);

    let (status, body) = send(
        build_router(state.clone()),
        "POST",
        "/api/config",
        Some(json!({ "esp32_ip": "10.1.2.3" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["esp32_ip"], "10.1.2.3");

    let (status, body) = send(build_router(state), "GET", "/api/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["esp32_ip"], "10.1.2.3");
}

#[tokio::test]
async fn test_config_missing_ip_is_bad_request() {
    let server = mockito::Server::new_async().await;
    let state = state_for(&server);

    let (status, body) = send(
        build_router(state),
        "POST",
        "/api/config",
        Some(json!({ "port": 80 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing esp32_ip");
}

#[tokio::test]
async fn test_status_proxies_and_caches() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/status")
        .with_body(r#"{"mode":"balance","angle":1.25}"#)
        .create_async()
        .await;
    let state = state_for(&server);

    let (status, body) = send(build_router(state.clone()), "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "balance");

    let cached = state.telemetry.current();
    assert!(cached.connected);
    assert_eq!(cached.angle, 1.25);
}

#[tokio::test]
async fn test_status_unreachable_returns_503_with_connected_false() {
    let state = offline_state();

    let (status, body) = send(build_router(state.clone()), "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["connected"], false);
    assert!(body["error"].is_string());
    assert!(!state.telemetry.current().connected);
}

#[tokio::test]
async fn test_command_forwarded_with_default_speed() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/command")
        .match_body(mockito::Matcher::Json(
            json!({ "command": "forward", "speed": 200 }),
        ))
        .with_body(r#"{"status":"ok"}"#)
        .create_async()
        .await;
    let state = state_for(&server);

    let (status, body) = send(
        build_router(state),
        "POST",
        "/api/command",
        Some(json!({ "command": "forward" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_pid_set_proxied() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/pid")
        .match_body(mockito::Matcher::Json(json!({ "kp": 20.0, "ki": 0.5 })))
        .with_body(r#"{"kp":20.0,"ki":0.5,"kd":1.2,"setpoint":190.0}"#)
        .create_async()
        .await;
    let state = state_for(&server);

    let (status, body) = send(
        build_router(state),
        "POST",
        "/api/pid",
        Some(json!({ "kp": 20.0, "ki": 0.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kd"], 1.2);
}

#[tokio::test]
async fn test_path_replace_append_clear() {
    let server = mockito::Server::new_async().await;
    let state = state_for(&server);

    // Array body replaces wholesale.
    let (status, body) = send(
        build_router(state.clone()),
        "POST",
        "/api/path",
        Some(json!([
            { "cmd": "forward", "duration": 100 },
            { "cmd": "left", "duration": 50 }
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    // Object body appends.
    let (status, body) = send(
        build_router(state.clone()),
        "POST",
        "/api/path",
        Some(json!({ "cmd": "stop", "duration": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);

    let (status, body) = send(build_router(state.clone()), "GET", "/api/path", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
    assert_eq!(body[2]["cmd"], "stop");

    let (status, _) = send(build_router(state.clone()), "DELETE", "/api/path", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(state.paths.is_empty());
}

#[tokio::test]
async fn test_record_start_clears_store() {
    let server = mockito::Server::new_async().await;
    let state = state_for(&server);
    state.paths.append(PathPoint::new(Command::Forward, 100));

    let (status, body) = send(
        build_router(state.clone()),
        "POST",
        "/api/path/record",
        Some(json!({ "action": "start" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "recording");
    assert!(state.paths.is_empty());

    state.paths.append(PathPoint::new(Command::Left, 50));
    let (_, body) = send(
        build_router(state),
        "POST",
        "/api/path/record",
        Some(json!({ "action": "stop" })),
    )
    .await;
    assert_eq!(body["status"], "stopped");
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_play_empty_path_is_bad_request() {
    let server = mockito::Server::new_async().await;
    let state = state_for(&server);

    let (status, body) = send(build_router(state), "POST", "/api/path/play", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No path recorded");
}

#[tokio::test]
async fn test_play_acknowledges_immediately_with_count() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/command")
        .with_body(r#"{"status":"ok"}"#)
        .expect_at_least(1)
        .create_async()
        .await;
    let state = state_for(&server);
    state.paths.replace(vec![
        PathPoint::new(Command::Forward, 5_000),
        PathPoint::new(Command::Left, 5_000),
    ]);

    // The ack must come back long before the 10 s of recorded delays elapse.
    let started = std::time::Instant::now();
    let (status, body) = send(build_router(state.clone()), "POST", "/api/path/play", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "playing");
    assert_eq!(body["count"], 2);
    assert!(started.elapsed() < std::time::Duration::from_secs(3));

    state.sequencer.cancel();
}

#[tokio::test]
async fn test_path_stop_cancels_and_sends_stop() {
    let mut server = mockito::Server::new_async().await;
    let stop_mock = server
        .mock("POST", "/command")
        .match_body(mockito::Matcher::Json(
            json!({ "command": "stop", "speed": 200 }),
        ))
        .with_body(r#"{"status":"ok"}"#)
        .expect_at_least(1)
        .create_async()
        .await;
    let state = state_for(&server);

    let (status, body) = send(build_router(state), "POST", "/api/path/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "stopped");
    stop_mock.assert_async().await;
}

#[tokio::test]
async fn test_pages_served() {
    let server = mockito::Server::new_async().await;
    let state = state_for(&server);

    for uri in ["/", "/control", "/path", "/settings"] {
        let response = build_router(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "page {}", uri);
    }
}
