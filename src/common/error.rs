use std::time::Duration;

use config::ConfigError;
use thiserror::Error;

/// Fatal errors raised while starting the balancer.
#[derive(Debug, Error)]
pub enum LoadBalancerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("backend pool must contain at least one backend")]
    EmptyPool,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single proxied call. Never leaves the proxy core; it is
/// logged and turned into a 502.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid backend uri: {0}")]
    Uri(#[from] http::uri::InvalidUri),
    #[error("failed to build outbound request: {0}")]
    Request(#[from] http::Error),
    #[error("failed to read inbound body: {0}")]
    InboundBody(String),
    #[error("backend call failed: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),
    #[error("failed to read backend response: {0}")]
    ResponseBody(#[from] hyper::Error),
    #[error("backend did not answer within {0:?}")]
    Timeout(Duration),
}
