use std::sync::Arc;

use crate::proxy::backend::{Backend, BackendPool};

pub mod round_robin;

pub trait SelectionAlgorithm {
    fn new() -> Self;
    /// Returns the current position and advances it by one.
    fn next(&self) -> usize;
}

pub trait BackendSelection: Send + Sync {
    /// Return `Some(backend)` when a healthy backend is available.
    fn next(&self, pool: &BackendPool) -> Option<Arc<Backend>>;
}
