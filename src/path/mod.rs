//! Path memory: recorded drive commands and their playback
//!
//! A path is an ordered list of timed movement commands recorded from the
//! browser and replayed against the robot later.

pub mod sequencer;
pub mod store;

pub use sequencer::{PlaybackError, Sequencer};
pub use store::PathStore;

use serde::{Deserialize, Serialize};

/// Movement command understood by the robot firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl Command {
    /// Command string as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Forward => "forward",
            Command::Backward => "backward",
            Command::Left => "left",
            Command::Right => "right",
            Command::Stop => "stop",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded step of a path: a command held for a duration
///
/// Wire field names (`cmd`, `duration`) match the browser protocol;
/// `duration` is in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPoint {
    pub cmd: Command,
    /// Hold time in milliseconds
    pub duration: u64,
}

impl PathPoint {
    pub fn new(cmd: Command, duration_ms: u64) -> Self {
        Self {
            cmd,
            duration: duration_ms,
        }
    }
}
