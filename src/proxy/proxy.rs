use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body::Body;
use hyper::{Request, Response};
use tracing::{error, warn};

use crate::common::types::{backend_error, no_servers_available, ProxyBody};
use crate::proxy::backend::{Backend, BackendPool};
use crate::proxy::dispatcher::Dispatcher;
use crate::selection_method::round_robin::RoundRobinSelector;
use crate::selection_method::BackendSelection;
use crate::session::{self, AffinityTable};

/// Request routing core: sticky lookup, round-robin fallback, dispatch.
#[derive(Debug)]
pub struct Proxy {
    pool: Arc<BackendPool>,
    selector: RoundRobinSelector,
    affinity: AffinityTable,
    dispatcher: Dispatcher,
}

impl Proxy {
    pub fn new(pool: Arc<BackendPool>, dispatcher: Dispatcher) -> Self {
        Self {
            pool,
            selector: RoundRobinSelector::new(),
            affinity: AffinityTable::new(),
            dispatcher,
        }
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    pub fn affinity(&self) -> &AffinityTable {
        &self.affinity
    }

    /// Picks the backend for a request. Requests with a session id go
    /// through the affinity table; the rest get the next round-robin pick.
    pub fn route(&self, session_id: Option<&str>) -> Option<Arc<Backend>> {
        match session_id {
            Some(id) => self.affinity.get(id, &self.pool, &self.selector),
            None => self.selector.next(&self.pool),
        }
    }

    /// Answers an inbound request. Backend faults turn into 502, an empty
    /// healthy set into 503; nothing is propagated to the caller.
    pub async fn handle<B>(
        &self,
        req: Request<B>,
        client_addr: Option<SocketAddr>,
    ) -> Response<ProxyBody>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Display + Send,
    {
        let session_id = session::session_id(req.headers(), client_addr);

        let Some(backend) = self.route(session_id.as_deref()) else {
            warn!(method = %req.method(), uri = %req.uri(), "No healthy backend available");
            return no_servers_available();
        };

        match self.dispatcher.forward(req, &backend).await {
            Ok(resp) => resp,
            Err(e) => {
                error!("Error proxying to {}: {}", backend, e);
                backend_error()
            }
        }
    }
}
