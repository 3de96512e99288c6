use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

/// Process-wide round-robin cursor. Every call observes a distinct value.
#[derive(Debug)]
pub struct RoundRobin(AtomicUsize);

impl SelectionAlgorithm for RoundRobin {
    fn new() -> Self {
        Self(AtomicUsize::new(0))
    }
    fn next(&self) -> usize {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

impl RoundRobin {
    pub fn position(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

/// Rotates over whichever backends are healthy at the time of the call.
///
/// The cursor only advances when a backend is handed out, so an empty
/// healthy set leaves it untouched. It is not rescaled when the healthy set
/// grows or shrinks.
#[derive(Debug)]
pub struct RoundRobinSelector {
    cursor: RoundRobin,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self {
            cursor: RoundRobin::new(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor.position()
    }
}

impl Default for RoundRobinSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendSelection for RoundRobinSelector {
    fn next(&self, pool: &BackendPool) -> Option<Arc<Backend>> {
        let healthy = pool.healthy_backends();
        if healthy.is_empty() {
            return None;
        }
        let index = self.cursor.next() % healthy.len();
        Some(Arc::clone(&healthy[index]))
    }
}
