//! Telemetry cache - last-known robot status
//!
//! Refreshed opportunistically whenever a status or telemetry proxy call
//! succeeds; on failure only the `connected` flag flips, all other fields
//! keep their last successful values. Single shared instance,
//! last-write-wins. The device call always completes before the lock is
//! taken, so the lock is never held across network I/O.

use crate::device::{DeviceClient, DeviceError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Firmware default balance setpoint
const DEFAULT_SETPOINT: f64 = 190.0;

/// Last-known status/telemetry values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub angle: f64,
    pub output: f64,
    pub setpoint: f64,
    /// Unix seconds of the last successful telemetry refresh
    pub timestamp: f64,
    pub connected: bool,
    /// Any other fields the device reported (mode, uptime, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            angle: 0.0,
            output: 0.0,
            setpoint: DEFAULT_SETPOINT,
            timestamp: 0.0,
            connected: false,
            extra: Map::new(),
        }
    }
}

/// Shared cache of the latest [`TelemetrySnapshot`]
#[derive(Clone, Default)]
pub struct TelemetryCache {
    inner: Arc<RwLock<TelemetrySnapshot>>,
}

impl TelemetryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest snapshot (copy, never blocks on I/O)
    pub fn current(&self) -> TelemetrySnapshot {
        self.inner.read().clone()
    }

    /// Poll `GET /status` and merge the result
    ///
    /// Returns the device's response body so the proxy handler can forward
    /// it unchanged.
    pub async fn refresh_from_status(&self, client: &DeviceClient) -> Result<Value, DeviceError> {
        match client.status().await {
            Ok(body) => {
                self.merge(&body, false);
                Ok(body)
            }
            Err(e) => {
                self.mark_disconnected();
                Err(e)
            }
        }
    }

    /// Poll `GET /telemetry`, merge the result, and stamp the refresh time
    pub async fn refresh_from_telemetry(
        &self,
        client: &DeviceClient,
    ) -> Result<Value, DeviceError> {
        match client.telemetry().await {
            Ok(body) => {
                self.merge(&body, true);
                Ok(body)
            }
            Err(e) => {
                self.mark_disconnected();
                Err(e)
            }
        }
    }

    /// Flip `connected` off, leaving the rest of the snapshot intact
    pub fn mark_disconnected(&self) {
        self.inner.write().connected = false;
    }

    fn merge(&self, body: &Value, stamp_time: bool) {
        let mut snapshot = self.inner.write();
        snapshot.connected = true;
        if stamp_time {
            snapshot.timestamp = unix_seconds();
        }

        let Some(fields) = body.as_object() else {
            return;
        };
        for (key, value) in fields {
            match (key.as_str(), value.as_f64()) {
                ("angle", Some(v)) => snapshot.angle = v,
                ("output", Some(v)) => snapshot.output = v,
                ("setpoint", Some(v)) => snapshot.setpoint = v,
                _ => {
                    snapshot.extra.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
