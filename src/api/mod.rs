//! Browser-facing REST API
//!
//! Thin mapping from the web UI's endpoints onto the device client, path
//! store, sequencer, and telemetry cache. Device failures never crash a
//! handler; they become structured JSON error bodies with a non-2xx status.
//! Default port: 5000

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_embed::RustEmbed;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::device::{CommandSink, DeviceClient, DeviceEndpoint, PidParams, DEFAULT_SPEED};
use crate::path::{Command, PathPoint, PathStore, PlaybackError, Sequencer};
use crate::telemetry::TelemetryCache;

#[cfg(test)]
mod tests;

/// Default gateway port
pub const DEFAULT_API_PORT: u16 = 5000;

/// Embedded web UI pages
#[derive(RustEmbed)]
#[folder = "assets/web"]
struct WebAssets;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    /// HTTP client for the robot (carries the endpoint config)
    pub device: DeviceClient,
    /// Recorded path points
    pub paths: PathStore,
    /// Playback session manager
    pub sequencer: Sequencer,
    /// Last-known status/telemetry values
    pub telemetry: TelemetryCache,
}

impl ApiState {
    pub fn new(device: DeviceClient) -> Self {
        Self {
            device,
            paths: PathStore::new(),
            sequencer: Sequencer::new(),
            telemetry: TelemetryCache::new(),
        }
    }
}

/// API error response
#[derive(Debug)]
enum ApiError {
    /// Missing or malformed request fields
    InvalidRequest(String),
    /// The robot could not be reached; `connected:false` is included where
    /// the endpoint reports connection state
    DeviceUnreachable { error: String, flag_connected: bool },
    /// Play requested with no recorded points
    EmptyPath,
}

impl ApiError {
    fn unreachable(err: impl std::fmt::Display) -> Self {
        ApiError::DeviceUnreachable {
            error: err.to_string(),
            flag_connected: false,
        }
    }

    fn not_connected(err: impl std::fmt::Display) -> Self {
        ApiError::DeviceUnreachable {
            error: err.to_string(),
            flag_connected: true,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidRequest(error) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": error }))).into_response()
            }
            ApiError::DeviceUnreachable {
                error,
                flag_connected,
            } => {
                let body = if flag_connected {
                    json!({ "error": error, "connected": false })
                } else {
                    json!({ "error": error })
                };
                (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
            }
            ApiError::EmptyPath => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "No path recorded" })),
            )
                .into_response(),
        }
    }
}

impl From<PlaybackError> for ApiError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::EmptyPath => ApiError::EmptyPath,
        }
    }
}

/// Build the API router
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(|| page("index.html")))
        .route("/control", get(|| page("control.html")))
        .route("/path", get(|| page("path_memory.html")))
        .route("/settings", get(|| page("settings.html")))
        .route("/api/config", get(get_config).post(set_config))
        .route("/api/status", get(api_status))
        .route("/api/command", post(api_command))
        .route("/api/telemetry", get(api_telemetry))
        .route("/api/pid", get(get_pid).post(set_pid))
        .route(
            "/api/path",
            get(get_path).post(post_path).delete(delete_path),
        )
        .route("/api/path/record", post(path_record))
        .route("/api/path/play", post(path_play))
        .route("/api/path/stop", post(path_stop))
        .with_state(state)
}

/// Serve an embedded UI page
async fn page(name: &'static str) -> Response {
    match WebAssets::get(name) {
        Some(file) => {
            let mime = mime_guess::from_path(name).first_or_text_plain();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                file.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "page not found").into_response(),
    }
}

/// GET /api/config - current robot address
async fn get_config(State(state): State<Arc<ApiState>>) -> Json<Value> {
    let endpoint = state.device.endpoint().get();
    Json(json!({ "esp32_ip": endpoint.host, "esp32_port": endpoint.port }))
}

/// POST /api/config - point the gateway at a different robot address
///
/// Takes effect for subsequent device calls; in-flight requests keep the
/// address they started with.
async fn set_config(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let host = body
        .get("esp32_ip")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::InvalidRequest("Missing esp32_ip".to_string()))?;

    let port = match body.get("esp32_port") {
        None => state.device.endpoint().get().port,
        Some(v) => v
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .ok_or_else(|| ApiError::InvalidRequest("Invalid esp32_port".to_string()))?,
    };

    state.device.endpoint().set(DeviceEndpoint::new(host, port));
    info!("Robot endpoint set to {}:{}", host, port);

    Ok(Json(
        json!({ "status": "ok", "esp32_ip": host, "esp32_port": port }),
    ))
}

/// GET /api/status - proxy device status, refreshing the telemetry cache
async fn api_status(State(state): State<Arc<ApiState>>) -> Result<Json<Value>, ApiError> {
    let body = state
        .telemetry
        .refresh_from_status(&state.device)
        .await
        .map_err(ApiError::not_connected)?;
    Ok(Json(body))
}

/// Request body for POST /api/command
#[derive(Debug, Deserialize)]
struct CommandRequest {
    command: Command,
    speed: Option<u16>,
}

/// POST /api/command - forward one movement command to the robot
async fn api_command(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<Value>, ApiError> {
    let speed = req.speed.unwrap_or(DEFAULT_SPEED);
    let ack = state
        .device
        .send_command(req.command, speed)
        .await
        .map_err(ApiError::unreachable)?;
    Ok(Json(ack))
}

/// GET /api/telemetry - proxy live telemetry, refreshing the cache
async fn api_telemetry(State(state): State<Arc<ApiState>>) -> Result<Json<Value>, ApiError> {
    let body = state
        .telemetry
        .refresh_from_telemetry(&state.device)
        .await
        .map_err(ApiError::not_connected)?;
    Ok(Json(body))
}

/// GET /api/pid - proxy current PID tunings
async fn get_pid(State(state): State<Arc<ApiState>>) -> Result<Json<Value>, ApiError> {
    let body = state.device.get_pid().await.map_err(ApiError::unreachable)?;
    Ok(Json(body))
}

/// POST /api/pid - proxy a PID tuning update
async fn set_pid(
    State(state): State<Arc<ApiState>>,
    Json(params): Json<PidParams>,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .device
        .set_pid(&params)
        .await
        .map_err(ApiError::unreachable)?;
    Ok(Json(body))
}

/// GET /api/path - full recorded path
async fn get_path(State(state): State<Arc<ApiState>>) -> Json<Vec<PathPoint>> {
    Json(state.paths.all())
}

/// POST /api/path - replace the path (array body) or append a point
/// (object body)
async fn post_path(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    match body {
        Value::Array(_) => {
            let points: Vec<PathPoint> = serde_json::from_value(body)
                .map_err(|e| ApiError::InvalidRequest(format!("Invalid path: {}", e)))?;
            state.paths.replace(points);
        }
        Value::Object(_) => {
            let point: PathPoint = serde_json::from_value(body)
                .map_err(|e| ApiError::InvalidRequest(format!("Invalid path point: {}", e)))?;
            state.paths.append(point);
        }
        _ => {
            return Err(ApiError::InvalidRequest(
                "Expected a path point or an array of points".to_string(),
            ))
        }
    }
    Ok(Json(json!({ "status": "ok", "count": state.paths.len() })))
}

/// DELETE /api/path - clear all recorded points
async fn delete_path(State(state): State<Arc<ApiState>>) -> Json<Value> {
    state.paths.clear();
    Json(json!({ "status": "ok" }))
}

/// Request body for POST /api/path/record
#[derive(Debug, Deserialize)]
struct RecordRequest {
    action: RecordAction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RecordAction {
    Start,
    Stop,
}

/// POST /api/path/record - start (clearing the store) or stop recording
async fn path_record(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<RecordRequest>,
) -> Json<Value> {
    match req.action {
        RecordAction::Start => {
            state.paths.clear();
            info!("Path recording started");
            Json(json!({ "status": "recording" }))
        }
        RecordAction::Stop => {
            let count = state.paths.len();
            info!("Path recording stopped ({} points)", count);
            Json(json!({ "status": "stopped", "count": count }))
        }
    }
}

/// POST /api/path/play - start detached playback of the recorded path
///
/// Acknowledges immediately with the point count; the sequencer keeps
/// running after this handler returns.
async fn path_play(State(state): State<Arc<ApiState>>) -> Result<Json<Value>, ApiError> {
    let snapshot = state.paths.all();
    let count = state
        .sequencer
        .play(snapshot, Arc::new(state.device.clone()))?;
    Ok(Json(json!({ "status": "playing", "count": count })))
}

/// POST /api/path/stop - cancel playback and send one immediate stop
async fn path_stop(State(state): State<Arc<ApiState>>) -> Result<Json<Value>, ApiError> {
    state.sequencer.cancel();
    state
        .device
        .send_command(Command::Stop, DEFAULT_SPEED)
        .await
        .map_err(ApiError::unreachable)?;
    Ok(Json(json!({ "status": "stopped" })))
}

/// Start the API server
pub async fn start_server(state: Arc<ApiState>, port: u16) -> Result<()> {
    let router = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting gateway on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind API server")?;

    axum::serve(listener, router)
        .await
        .context("API server error")?;

    Ok(())
}
