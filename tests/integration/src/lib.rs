//! Integration tests for the SAE API server proxy.
//!
//! Every test starts an in-process proxy server on an ephemeral port, wired to
//! an in-process fake SAE endpoint that speaks the `VirtualServerProxy`
//! envelope. No external services are required.
//!
//! The fake endpoint answers every signed envelope with a JSON echo of what
//! it received. Target paths starting with `/fail` get a vendor error
//! document, paths starting with `/slow` never answer in time.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::warn;

use saeproxy_core::{ApiServerRegistry, InMemorySecretStore, PopClientFactory, SecretContext};
use saeproxy_http::{ApiServerProxy, ProxyHttpService, ProxyPathMatcher, ProxyRequestEscaper};
use saeproxy_model::api;

static INIT: Once = Once::new();

/// Deadline of one vendor call in tests.
pub const PROXY_TIMEOUT: Duration = Duration::from_millis(500);

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A running proxy server and a client pointed at it.
#[derive(Debug, Clone)]
pub struct TestServer {
    base_url: String,
    /// HTTP client for requests to the proxy server.
    pub http: reqwest::Client,
}

impl TestServer {
    /// Absolute URL of `path` on the proxy server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// URL of the collection.
    #[must_use]
    pub fn collection_url(&self) -> String {
        self.url(&api::collection_path())
    }

    /// URL of a named record.
    #[must_use]
    pub fn item_url(&self, name: &str) -> String {
        format!("{}/{name}", self.collection_url())
    }

    /// URL of the proxy sub-resource of a named record, without a trailing slash.
    #[must_use]
    pub fn proxy_url(&self, name: &str) -> String {
        self.url(&api::proxy_path(name))
    }

    /// Create a record with access key id `ak-<name>` in `region`.
    pub async fn create_server(&self, name: &str, region: &str) -> serde_json::Value {
        let resp = self
            .http
            .post(self.collection_url())
            .json(&record(name, region))
            .send()
            .await
            .unwrap_or_else(|e| panic!("failed to create {name}: {e}"));
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED, "create {name}");
        resp.json().await.unwrap()
    }
}

/// JSON document of a record.
#[must_use]
pub fn record(name: &str, region: &str) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": api::group_version(),
        "kind": api::KIND,
        "metadata": { "name": name },
        "spec": {
            "accessKeyId": format!("ak-{name}"),
            "accessKeySecret": format!("sk-{name}"),
            "region": region,
        },
    })
}

/// Start a fake SAE endpoint and a proxy server forwarding to it.
pub async fn start() -> TestServer {
    init_tracing();

    let vendor = spawn_vendor().await;
    let ctx = SecretContext {
        namespace: "vela-system".to_owned(),
        server_address: "http://127.0.0.1:8080".to_owned(),
        loopback: None,
    };
    let registry = ApiServerRegistry::new(Arc::new(InMemorySecretStore::new()), ctx);
    let factory = PopClientFactory::new(reqwest::Client::new(), vendor.to_string(), "http");
    let proxy = ApiServerProxy::new(Arc::new(factory), PROXY_TIMEOUT);
    let service = ProxyRequestEscaper::new(
        ProxyHttpService::new(registry, proxy),
        ProxyPathMatcher::default(),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                continue;
            };
            let svc = service.clone();
            tokio::spawn(async move {
                if let Err(e) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), svc)
                    .await
                {
                    warn!(error = %e, "proxy connection error");
                }
            });
        }
    });

    TestServer {
        base_url: format!("http://{addr}"),
        http: reqwest::Client::new(),
    }
}

async fn spawn_vendor() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                continue;
            };
            tokio::spawn(async move {
                if let Err(e) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service_fn(vendor))
                    .await
                {
                    warn!(error = %e, "vendor connection error");
                }
            });
        }
    });
    addr
}

fn vendor_response(status: u16, body: &serde_json::Value) -> http::Response<Full<Bytes>> {
    http::Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn vendor(
    req: http::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let authorization = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let action = req
        .headers()
        .get("x-acs-action")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let body = req
        .into_body()
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();

    if !authorization.starts_with("acs ") || action != "VirtualServerProxy" {
        return Ok(vendor_response(
            403,
            &serde_json::json!({"Code": "Forbidden", "Message": "unsigned", "RequestId": "r-403"}),
        ));
    }

    let input: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
    let path = input["path"].as_str().unwrap_or_default().to_owned();
    if path.starts_with("/fail") {
        return Ok(vendor_response(
            503,
            &serde_json::json!({"Code": "ServiceUnavailable", "Message": "backend down", "RequestId": "r-503"}),
        ));
    }
    if path.starts_with("/slow") {
        tokio::time::sleep(PROXY_TIMEOUT * 20).await;
    }

    let echo = serde_json::json!({
        "method": input["method"],
        "path": path,
        "content": input["content"],
        "header": input["header"],
        "authorization": authorization,
    });
    let output = serde_json::json!({
        "requestId": "r-200",
        "code": 200,
        "body": BASE64.encode(echo.to_string()),
        "header": {
            "Content-Type": ["application/json"],
            "X-Vendor": ["sae"],
        },
    });
    Ok(vendor_response(200, &output))
}

mod test_crud;
mod test_proxy;
