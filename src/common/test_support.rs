//! Throwaway HTTP backends for unit tests.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderValue, HOST};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub(crate) struct TestBackend {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Starts a backend on an ephemeral port. `/health` answers with
/// `health`; every other path echoes what it received. Every answer is
/// delayed by `delay`.
pub(crate) async fn spawn_backend(health: StatusCode, delay: Duration) -> TestBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let _ = http1::Builder::new()
                    .serve_connection(
                        TokioIo::new(stream),
                        service_fn(move |req| echo(req, addr.port(), health, delay)),
                    )
                    .await;
            });
        }
    });

    TestBackend { addr, handle }
}

/// A port nothing listens on.
pub(crate) fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn echo(
    req: Request<Incoming>,
    port: u16,
    health: StatusCode,
    delay: Duration,
) -> Result<Response<Full<Bytes>>, Infallible> {
    tokio::time::sleep(delay).await;

    if req.uri().path() == "/health" {
        let mut resp = Response::new(Full::new(Bytes::from_static(b"ok")));
        *resp.status_mut() = health;
        return Ok(resp);
    }

    let host = req
        .headers()
        .get(HOST)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(""));
    let uri = HeaderValue::from_str(&req.uri().to_string()).unwrap();
    let method = HeaderValue::from_str(req.method().as_str()).unwrap();
    let body = req.into_body().collect().await.unwrap().to_bytes();

    let mut resp = Response::new(Full::new(body));
    if uri.to_str().unwrap().starts_with("/teapot") {
        *resp.status_mut() = StatusCode::IM_A_TEAPOT;
    }
    let headers = resp.headers_mut();
    headers.insert("x-backend-port", HeaderValue::from(port));
    headers.insert("x-received-host", host);
    headers.insert("x-received-uri", uri);
    headers.insert("x-received-method", method);
    Ok(resp)
}
