//! Gateway service in front of the proxy service.
//!
//! Health probes (`/healthz`, `/readyz`, `/livez`) are answered here. Every
//! other request goes through the query escaper into the proxy service.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use hyper::service::Service;

use saeproxy_http::body::ProxyResponseBody;
use saeproxy_http::response::ok_response;
use saeproxy_http::{ProxyHttpService, ProxyRequestEscaper};

/// Gateway routing health probes locally and everything else to the
/// escaped proxy service.
#[derive(Debug, Clone)]
pub struct GatewayService {
    inner: ProxyRequestEscaper<ProxyHttpService>,
}

impl GatewayService {
    /// Create a gateway in front of `inner`.
    #[must_use]
    pub fn new(inner: ProxyRequestEscaper<ProxyHttpService>) -> Self {
        Self { inner }
    }
}

impl<B> Service<http::Request<B>> for GatewayService
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    type Response = http::Response<ProxyResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        if is_health_check(req.method(), req.uri().path()) {
            return Box::pin(async { Ok(ok_response()) });
        }
        self.inner.call(req)
    }
}

/// Check if the request is a health check probe.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && matches!(path, "/healthz" | "/readyz" | "/livez")
}
