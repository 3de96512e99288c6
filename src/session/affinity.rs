use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::proxy::backend::{Backend, BackendPool};
use crate::selection_method::BackendSelection;

/// Session id to backend mapping. Entries pointing at an unhealthy backend
/// are dropped on the next lookup for that id; nothing else evicts them.
///
/// One lock covers the whole table, so the lookup, the selection on a miss
/// and the insert happen as a single step.
#[derive(Debug, Default)]
pub struct AffinityTable {
    entries: Mutex<HashMap<String, Arc<Backend>>>,
}

impl AffinityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        session_id: &str,
        pool: &BackendPool,
        selector: &dyn BackendSelection,
    ) -> Option<Arc<Backend>> {
        let mut entries = self.lock();

        if let Some(backend) = entries.get(session_id) {
            if backend.is_healthy() {
                return Some(Arc::clone(backend));
            }
            debug!(session = session_id, backend = %backend, "Dropping sticky entry for unhealthy backend");
            entries.remove(session_id);
        }

        let backend = selector.next(pool)?;
        info!("Assigned session {} to {}", session_id, backend);
        entries.insert(session_id.to_owned(), Arc::clone(&backend));
        Some(backend)
    }

    /// The backend currently recorded for `session_id`, healthy or not.
    pub fn assigned(&self, session_id: &str) -> Option<Arc<Backend>> {
        self.lock().get(session_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Backend>>> {
        // the map stays consistent even if a holder panicked
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
