//! PathStore - shared in-memory storage for the recorded path
//!
//! All operations take the lock for their whole duration, so no reader ever
//! observes a partially written sequence. Reads hand out copies; a snapshot
//! taken for playback is unaffected by later mutation of the store.

use super::PathPoint;
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared, ordered sequence of recorded path points
#[derive(Clone, Default)]
pub struct PathStore {
    points: Arc<Mutex<Vec<PathPoint>>>,
}

impl PathStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot copy of the current path, in recording order
    pub fn all(&self) -> Vec<PathPoint> {
        self.points.lock().clone()
    }

    /// Replace the entire path
    pub fn replace(&self, points: Vec<PathPoint>) {
        *self.points.lock() = points;
    }

    /// Append a single point to the end of the path
    pub fn append(&self, point: PathPoint) {
        self.points.lock().push(point);
    }

    /// Discard all recorded points
    pub fn clear(&self) {
        self.points.lock().clear();
    }

    /// Number of recorded points
    pub fn len(&self) -> usize {
        self.points.lock().len()
    }

    /// True if no points are recorded
    pub fn is_empty(&self) -> bool {
        self.points.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Command;

    #[test]
    fn test_append_preserves_order() {
        let store = PathStore::new();
        let points = [
            PathPoint::new(Command::Forward, 100),
            PathPoint::new(Command::Left, 50),
            PathPoint::new(Command::Stop, 0),
        ];
        for p in points {
            store.append(p);
        }
        assert_eq!(store.all(), points.to_vec());
    }

    #[test]
    fn test_replace_discards_previous_contents() {
        let store = PathStore::new();
        store.append(PathPoint::new(Command::Forward, 100));
        store.append(PathPoint::new(Command::Backward, 200));

        let replacement = vec![PathPoint::new(Command::Right, 75)];
        store.replace(replacement.clone());
        assert_eq!(store.all(), replacement);
    }

    #[test]
    fn test_clear() {
        let store = PathStore::new();
        store.append(PathPoint::new(Command::Forward, 100));
        store.clear();
        assert!(store.all().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_isolated_from_later_mutation() {
        let store = PathStore::new();
        store.append(PathPoint::new(Command::Forward, 100));

        let snapshot = store.all();
        store.append(PathPoint::new(Command::Left, 50));
        store.clear();

        assert_eq!(snapshot, vec![PathPoint::new(Command::Forward, 100)]);
    }

    /// Concurrent appends and reads never observe a torn sequence: every
    /// read sees a strict prefix of the appended points.
    #[test]
    fn test_concurrent_append_and_read() {
        let store = PathStore::new();
        let writer_store = store.clone();

        let writer = std::thread::spawn(move || {
            for i in 0..500u64 {
                writer_store.append(PathPoint::new(Command::Forward, i));
            }
        });

        for _ in 0..200 {
            let seen = store.all();
            for (i, point) in seen.iter().enumerate() {
                assert_eq!(point.duration, i as u64);
            }
        }

        writer.join().unwrap();
        assert_eq!(store.len(), 500);
    }
}
