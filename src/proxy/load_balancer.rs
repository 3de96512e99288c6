use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::common::error::LoadBalancerError;
use crate::common::types::build_client;
use crate::configuration::Settings;
use crate::health::HealthProber;
use crate::proxy::backend::BackendPool;
use crate::proxy::dispatcher::Dispatcher;
use crate::proxy::proxy::Proxy;

/// Owns the listener side: accepts connections, runs the health prober
/// alongside, and tears both down on shutdown.
#[derive(Debug)]
pub struct LoadBalancer {
    pub listen_addr: SocketAddr,
    proxy: Arc<Proxy>,
    prober: HealthProber,
    shutdown_grace_period: Duration,
}

impl LoadBalancer {
    pub fn new(config: Settings) -> Result<Self, LoadBalancerError> {
        let pool = Arc::new(BackendPool::new(config.backends)?);
        let client = build_client();

        let dispatcher = Dispatcher::new(client.clone(), config.proxy_timeout);
        let proxy = Arc::new(Proxy::new(Arc::clone(&pool), dispatcher));
        let prober = HealthProber::new(pool, client, config.health_check);

        Ok(Self {
            listen_addr: config.listen_addr,
            proxy,
            prober,
            shutdown_grace_period: config.shutdown_grace_period,
        })
    }

    pub fn proxy(&self) -> &Arc<Proxy> {
        &self.proxy
    }

    /// Binds `listen_addr` and serves until Ctrl-C.
    pub async fn run(self) -> Result<(), LoadBalancerError> {
        let listener = TcpListener::bind(self.listen_addr).await?;
        info!("LoadBalancer started on http://{}", listener.local_addr()?);

        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                // without a signal handler there is nothing to wait for
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    #[tracing::instrument(name = "Serve", skip_all, fields(addr = ?listener.local_addr().ok()))]
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), LoadBalancerError>
    where
        F: Future<Output = ()> + Send,
    {
        let (shutdown_tx, _) = broadcast::channel(1);
        let prober = tokio::spawn(self.prober.run(shutdown_tx.subscribe()));
        let graceful = GracefulShutdown::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, client_addr) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };
                    let proxy = Arc::clone(&self.proxy);

                    let conn = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(
                            TokioIo::new(stream),
                            service_fn(move |req| {
                                let proxy = Arc::clone(&proxy);
                                async move {
                                    Ok::<_, Infallible>(proxy.handle(req, Some(client_addr)).await)
                                }
                            }),
                        );
                    let conn = graceful.watch(conn);

                    tokio::spawn(async move {
                        if let Err(err) = conn.await {
                            debug!("Error serving connection from {}: {:?}", client_addr, err);
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }
        drop(listener);

        let _ = shutdown_tx.send(());
        if let Err(e) = prober.await {
            error!("Health prober task failed: {}", e);
        }

        match tokio::time::timeout(self.shutdown_grace_period, graceful.shutdown()).await {
            Ok(()) => info!("All connections closed"),
            Err(_) => warn!(
                "Connections still open after {:?}, shutting down anyway",
                self.shutdown_grace_period
            ),
        }

        Ok(())
    }
}
