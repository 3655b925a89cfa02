//! BalanceBot GW - web gateway for an ESP32 self-balancing robot
//!
//! Relays movement commands, PID tuning, and path record/playback between a
//! browser UI and the robot's local HTTP server, and caches the last-known
//! telemetry.

pub mod api;
pub mod device;
pub mod path;
pub mod telemetry;

pub use api::{ApiState, DEFAULT_API_PORT};
pub use device::{DeviceClient, DeviceEndpoint, EndpointConfig};
pub use path::{Command, PathPoint, PathStore, Sequencer};
pub use telemetry::{TelemetryCache, TelemetrySnapshot};
