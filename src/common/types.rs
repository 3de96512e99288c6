use std::fmt;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::{Response, StatusCode};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde::Deserialize;

/// Body type of every response the balancer hands back to a client.
pub type ProxyBody = BoxBody<Bytes, hyper::Error>;

/// Pooled client shared by the dispatcher and the health prober.
pub type HttpClient = Client<HttpConnector, Full<Bytes>>;

/// Where a backend lives, as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct BackendAddr {
    pub host: String,
    pub port: u16,
}

impl BackendAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for BackendAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

pub fn build_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

pub fn full<T: Into<Bytes>>(chunk: T) -> ProxyBody {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

fn text_response(status: StatusCode, text: &'static str) -> Response<ProxyBody> {
    let mut resp = Response::new(full(text));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    resp
}

pub fn no_servers_available() -> Response<ProxyBody> {
    text_response(StatusCode::SERVICE_UNAVAILABLE, "No servers available")
}

pub fn backend_error() -> Response<ProxyBody> {
    text_response(StatusCode::BAD_GATEWAY, "Backend error")
}
