//! Path playback sequencer
//!
//! Replays a snapshot of the recorded path against the robot as a detached
//! task: the HTTP request that starts playback returns immediately, while
//! the sequencer walks the snapshot point by point. Every command send is
//! best-effort - a dropped command must not abort the rest of the path - and
//! a final stop is always issued, even when the session is cancelled.

use super::{Command, PathPoint};
use crate::device::{CommandSink, DEFAULT_SPEED};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

/// Error starting playback
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaybackError {
    /// Play was requested with no recorded points
    #[error("no path recorded")]
    EmptyPath,
}

/// Starts and cancels playback sessions
///
/// At most one session is active at a time: starting a new session cancels
/// the previous one. Cancellation is checked against each per-point delay,
/// so a cancelled session stops issuing movement commands at the next point
/// boundary but still sends its trailing stop.
#[derive(Clone, Default)]
pub struct Sequencer {
    active: Arc<Mutex<Option<watch::Sender<bool>>>>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a detached playback task over `snapshot`
    ///
    /// Returns the point count acknowledged to the caller. The caller holds
    /// no handle to the task; progress is not observable beyond the commands
    /// arriving at the device.
    pub fn play(
        &self,
        snapshot: Vec<PathPoint>,
        sink: Arc<dyn CommandSink>,
    ) -> Result<usize, PlaybackError> {
        if snapshot.is_empty() {
            return Err(PlaybackError::EmptyPath);
        }

        let count = snapshot.len();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        // Supersede any running session before starting the new one.
        if let Some(previous) = self.active.lock().replace(cancel_tx) {
            let _ = previous.send(true);
        }

        info!("Starting path playback ({} points)", count);
        tokio::spawn(run_playback(snapshot, sink, cancel_rx));

        Ok(count)
    }

    /// Cancel the active session, if any
    ///
    /// The session notices at its next point boundary and finishes with its
    /// trailing stop command.
    pub fn cancel(&self) {
        if let Some(cancel_tx) = self.active.lock().take() {
            let _ = cancel_tx.send(true);
            info!("Playback session cancelled");
        }
    }
}

/// The playback loop itself
///
/// Per point: one best-effort command send, then a wall-clock delay of the
/// point's duration. Delays accumulate sequentially. Device failures are
/// swallowed by design so one bad send cannot abort the recorded path.
async fn run_playback(
    snapshot: Vec<PathPoint>,
    sink: Arc<dyn CommandSink>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    for (i, point) in snapshot.iter().enumerate() {
        if *cancel_rx.borrow() {
            debug!("Playback cancelled before point {}", i + 1);
            break;
        }

        best_effort_send(&*sink, point.cmd).await;

        tokio::select! {
            _ = sleep(Duration::from_millis(point.duration)) => {}
            changed = cancel_rx.changed() => {
                // A dropped sender means the sequencer itself is gone; treat
                // it like cancellation rather than spinning without delays.
                if changed.is_err() || *cancel_rx.borrow() {
                    debug!("Playback cancelled during point {}", i + 1);
                    break;
                }
            }
        }
    }

    // Leave the robot stopped no matter how the loop ended.
    best_effort_send(&*sink, Command::Stop).await;
    info!("Path playback finished");
}

/// Send one command, discarding any failure
async fn best_effort_send(sink: &dyn CommandSink, cmd: Command) {
    if let Err(e) = sink.send_command(cmd, DEFAULT_SPEED).await {
        debug!("Dropped playback command {}: {}", cmd, e);
    }
}
