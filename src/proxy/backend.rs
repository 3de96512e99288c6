use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::common::error::LoadBalancerError;
use crate::common::types::BackendAddr;

/// One upstream server. Identity is fixed at creation; only the health flag
/// changes, and only the health prober writes it.
#[derive(Debug)]
pub struct Backend {
    addr: BackendAddr,
    base_url: String,
    healthy: AtomicBool,
}

impl Backend {
    pub fn new(addr: BackendAddr) -> Backend {
        let base_url = format!("http://{}", addr);
        Backend {
            addr,
            base_url,
            healthy: AtomicBool::new(true),
        }
    }

    pub fn host(&self) -> &str {
        &self.addr.host
    }

    pub fn port(&self) -> u16 {
        self.addr.port
    }

    /// `http://host:port`, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Stores the new flag and returns the previous one.
    pub(crate) fn set_healthy(&self, healthy: bool) -> bool {
        self.healthy.swap(healthy, Ordering::AcqRel)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

/// The fixed, ordered set of backends. Order defines round-robin order.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
}

impl BackendPool {
    pub fn new(addrs: Vec<BackendAddr>) -> Result<Self, LoadBalancerError> {
        if addrs.is_empty() {
            return Err(LoadBalancerError::EmptyPool);
        }
        let backends = addrs
            .into_iter()
            .map(|addr| Arc::new(Backend::new(addr)))
            .collect();
        Ok(Self { backends })
    }

    pub fn list_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    /// Snapshot of the backends that are healthy right now, in pool order.
    pub fn healthy_backends(&self) -> Vec<Arc<Backend>> {
        self.backends
            .iter()
            .filter(|backend| backend.is_healthy())
            .cloned()
            .collect()
    }

    /// Returns the previous flag so callers can detect transitions.
    pub fn set_health(&self, backend: &Backend, healthy: bool) -> bool {
        backend.set_healthy(healthy)
    }
}
