use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::USER_AGENT;
use http_body_util::Full;
use hyper::{Request, StatusCode, Uri};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::common::types::HttpClient;
use crate::proxy::backend::{Backend, BackendPool};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckSettings {
    pub interval: Duration,
    pub timeout: Duration,
    pub path: String,
}

impl Default for HealthCheckSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(5),
            path: "/health".to_string(),
        }
    }
}

/// Background task that keeps every backend's health flag current.
///
/// All backends are probed concurrently on each tick and each probe has its
/// own timeout, so one slow backend never holds back the others. A failed
/// probe only flips a flag; it never ends the loop.
#[derive(Debug)]
pub struct HealthProber {
    pool: Arc<BackendPool>,
    client: HttpClient,
    settings: HealthCheckSettings,
}

impl HealthProber {
    pub fn new(pool: Arc<BackendPool>, client: HttpClient, settings: HealthCheckSettings) -> Self {
        Self {
            pool,
            client,
            settings,
        }
    }

    /// Probes immediately, then once per interval, until `shutdown` fires or
    /// its sender is dropped.
    #[tracing::instrument(name = "Health prober", skip_all)]
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval = ?self.settings.interval,
            timeout = ?self.settings.timeout,
            path = %self.settings.path,
            backends = self.pool.list_backends().len(),
            "Health prober starting"
        );

        let mut ticker = time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.recv() => break,
            }
            tokio::select! {
                _ = self.check_all() => {}
                _ = shutdown.recv() => break,
            }
        }

        info!("Health prober stopped");
    }

    /// One round of probes. Each result is applied as soon as it arrives.
    pub async fn check_all(&self) {
        let mut checks = JoinSet::new();

        for backend in self.pool.list_backends() {
            let backend = Arc::clone(backend);
            let client = self.client.clone();
            let path = self.settings.path.clone();
            let timeout = self.settings.timeout;
            checks.spawn(async move {
                let healthy = probe(&client, &backend, &path, timeout).await;
                (backend, healthy)
            });
        }

        while let Some(result) = checks.join_next().await {
            match result {
                Ok((backend, healthy)) => self.record(&backend, healthy),
                Err(e) => error!(error = %e, "Health check task failed"),
            }
        }
    }

    fn record(&self, backend: &Backend, healthy: bool) {
        let was_healthy = self.pool.set_health(backend, healthy);
        match (was_healthy, healthy) {
            (true, false) => warn!(backend = %backend, "Backend marked unhealthy"),
            (false, true) => info!(backend = %backend, "Backend recovered"),
            _ => debug!(backend = %backend, healthy, "Health unchanged"),
        }
    }
}

async fn probe(client: &HttpClient, backend: &Backend, path: &str, timeout: Duration) -> bool {
    let uri: Uri = match format!("{}{}", backend.base_url(), path).parse() {
        Ok(uri) => uri,
        Err(e) => {
            error!(backend = %backend, error = %e, "Invalid health check uri");
            return false;
        }
    };
    let request = match Request::get(uri)
        .header(USER_AGENT, "sticky-balancer-health-check")
        .body(Full::new(Bytes::new()))
    {
        Ok(req) => req,
        Err(e) => {
            error!(backend = %backend, error = %e, "Failed to build health check request");
            return false;
        }
    };

    match time::timeout(timeout, client.request(request)).await {
        Ok(Ok(response)) => {
            let success = response.status() == StatusCode::OK;
            if !success {
                debug!(backend = %backend, status = %response.status(), "Health check failed: status other than 200");
            }
            success
        }
        Ok(Err(e)) => {
            debug!(backend = %backend, error = %e, "Health check failed: connection error");
            false
        }
        Err(_) => {
            debug!(backend = %backend, "Health check failed: timeout");
            false
        }
    }
}
