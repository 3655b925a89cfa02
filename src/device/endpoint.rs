//! Shared robot endpoint configuration
//!
//! The endpoint is read on every outbound call, so an update takes effect
//! for subsequent calls only; an in-flight request keeps the address it
//! started with. No reachability check is performed at set-time.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default robot address (matches the firmware's AP-mode default)
pub const DEFAULT_HOST: &str = "192.168.1.100";
pub const DEFAULT_PORT: u16 = 80;

/// Network address of the robot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    pub host: String,
    pub port: u16,
}

impl DeviceEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Base URL for device requests, e.g. `http://192.168.1.100:80`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for DeviceEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

/// Shared handle to the mutable endpoint configuration
#[derive(Clone, Default)]
pub struct EndpointConfig {
    inner: Arc<RwLock<DeviceEndpoint>>,
}

impl EndpointConfig {
    pub fn new(endpoint: DeviceEndpoint) -> Self {
        Self {
            inner: Arc::new(RwLock::new(endpoint)),
        }
    }

    /// Current endpoint (copy)
    pub fn get(&self) -> DeviceEndpoint {
        self.inner.read().clone()
    }

    /// Atomically replace the endpoint for subsequent calls
    pub fn set(&self, endpoint: DeviceEndpoint) {
        *self.inner.write() = endpoint;
    }
}
