use std::fmt::Display;
use std::time::Duration;

use bytes::Bytes;
use http::header::HOST;
use http_body::Body;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, Uri};

use crate::common::error::DispatchError;
use crate::common::types::{full, HttpClient, ProxyBody};
use crate::proxy::backend::Backend;

/// Forwards a request to one backend and relays its answer verbatim.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: HttpClient,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(client: HttpClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Same method, path, query, headers (minus `Host`) and body, sent to
    /// `backend`. The whole exchange, response body included, is bounded by
    /// the dispatcher timeout.
    pub async fn forward<B>(
        &self,
        req: Request<B>,
        backend: &Backend,
    ) -> Result<Response<ProxyBody>, DispatchError>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Display + Send,
    {
        let (parts, body) = req.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let uri: Uri = format!("{}{}", backend.base_url(), path_and_query).parse()?;

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => return Err(DispatchError::InboundBody(e.to_string())),
        };

        let mut outbound = Request::builder()
            .method(parts.method)
            .uri(uri)
            .body(Full::new(body))?;
        let headers = outbound.headers_mut();
        for (name, value) in parts.headers.iter() {
            if name != HOST {
                headers.append(name.clone(), value.clone());
            }
        }

        let exchange = async {
            let response = self.client.request(outbound).await?;
            let (parts, body) = response.into_parts();
            let body = body.collect().await?.to_bytes();
            Ok::<_, DispatchError>(Response::from_parts(parts, full(body)))
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::Timeout(self.timeout)),
        }
    }
}
