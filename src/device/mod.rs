//! HTTP client for the robot
//!
//! Every call is one request against the configured endpoint with a short
//! timeout. Any network error, timeout, or undecodable body collapses into
//! [`DeviceError::Unreachable`]; callers treat that as expected and
//! recoverable. This layer never retries - retry policy, where one exists,
//! belongs to the caller.

pub mod endpoint;

pub use endpoint::{DeviceEndpoint, EndpointConfig};

use crate::path::Command;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Per-request timeout for device calls
pub const DEVICE_TIMEOUT: Duration = Duration::from_secs(2);

/// Speed sent with movement commands when the browser does not specify one
pub const DEFAULT_SPEED: u16 = 200;

/// Error talking to the robot
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The robot could not be reached or answered with an undecodable body
    #[error("device unreachable: {0}")]
    Unreachable(String),
}

impl From<reqwest::Error> for DeviceError {
    fn from(err: reqwest::Error) -> Self {
        DeviceError::Unreachable(err.to_string())
    }
}

/// PID parameters as exchanged with the firmware
///
/// All fields are optional on set; the device echoes the effective values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PidParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ki: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setpoint: Option<f64>,
}

/// Anything that can accept a movement command
///
/// Seam between the playback sequencer and the real HTTP client, so playback
/// logic is testable without a robot on the network.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn send_command(&self, command: Command, speed: u16) -> Result<Value, DeviceError>;
}

/// HTTP client for the robot's REST surface
///
/// Holds a pooled [`reqwest::Client`] and reads the endpoint configuration
/// on every call, so address changes apply to subsequent requests.
#[derive(Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    endpoint: EndpointConfig,
}

impl DeviceClient {
    pub fn new(endpoint: EndpointConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEVICE_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http, endpoint }
    }

    /// Endpoint configuration handle shared with this client
    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.get().base_url(), path)
    }

    async fn get_json(&self, path: &str) -> Result<Value, DeviceError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let body = self.http.get(&url).send().await?.json().await?;
        Ok(body)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, DeviceError> {
        let url = self.url(path);
        debug!("POST {}", url);
        let body = self.http.post(&url).json(body).send().await?.json().await?;
        Ok(body)
    }

    /// GET /status - mode, uptime, angle, PID values
    pub async fn status(&self) -> Result<Value, DeviceError> {
        self.get_json("/status").await
    }

    /// GET /telemetry - live angle/output/setpoint sample
    pub async fn telemetry(&self) -> Result<Value, DeviceError> {
        self.get_json("/telemetry").await
    }

    /// GET /pid - current PID tunings
    pub async fn get_pid(&self) -> Result<Value, DeviceError> {
        self.get_json("/pid").await
    }

    /// POST /pid - update PID tunings, returns the effective values
    pub async fn set_pid(&self, params: &PidParams) -> Result<Value, DeviceError> {
        let body = serde_json::to_value(params)
            .map_err(|e| DeviceError::Unreachable(e.to_string()))?;
        self.post_json("/pid", &body).await
    }
}

#[async_trait]
impl CommandSink for DeviceClient {
    /// POST /command - one movement command at the given speed
    async fn send_command(&self, command: Command, speed: u16) -> Result<Value, DeviceError> {
        let body = serde_json::json!({ "command": command, "speed": speed });
        self.post_json("/command", &body).await
    }
}
