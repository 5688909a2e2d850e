//! Proxy handler.
//!
//! One handler serves one exchange: encode the inbound request, call the
//! vendor under a deadline, decode the envelope into the response.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use saeproxy_core::client::VendorClient;
use saeproxy_model::error::{ProxyError, ProxyResult};
use saeproxy_model::types::{ApiServer, ProxyOptions};

use crate::codec::{decode_response, encode_request};

/// Handler bound to one record and one vendor client.
#[derive(Debug)]
pub struct ProxyHandler {
    target: ApiServer,
    options: ProxyOptions,
    client: Arc<dyn VendorClient>,
    timeout: Duration,
}

impl ProxyHandler {
    /// Bind a handler.
    #[must_use]
    pub fn new(
        target: ApiServer,
        options: ProxyOptions,
        client: Arc<dyn VendorClient>,
        timeout: Duration,
    ) -> Self {
        Self {
            target,
            options,
            client,
            timeout,
        }
    }

    /// The record this handler forwards to.
    #[must_use]
    pub fn target(&self) -> &ApiServer {
        &self.target
    }

    /// Forward one request.
    ///
    /// The response is returned only once the vendor envelope is fully
    /// decoded; any failure leaves nothing written.
    pub async fn serve(
        &self,
        parts: &http::request::Parts,
        body: &[u8],
    ) -> ProxyResult<http::Response<Bytes>> {
        let input = encode_request(parts, body, &self.options, self.target.name());
        debug!(
            name = %self.target.name(),
            method = %input.method,
            path = %input.path,
            content_length = input.content.len(),
            "Forwarding proxy request"
        );

        let call = self.client.call(Bytes::from(input.to_json()));
        let raw = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                ProxyError::cancelled(format!(
                    "proxy request to {} exceeded its {:?} deadline",
                    self.target.name(),
                    self.timeout
                ))
            })??;

        let mut response = decode_response(&raw, parts.version)?;
        // Framing of the vendor's own response; hyper re-frames from the body.
        // A HEAD response has no body to re-frame from, so its length stays.
        let headers = response.headers_mut();
        if parts.method != http::Method::HEAD {
            headers.remove(http::header::CONTENT_LENGTH);
        }
        headers.remove(http::header::TRANSFER_ENCODING);
        info!(
            name = %self.target.name(),
            method = %input.method,
            path = %input.path,
            status = response.status().as_u16(),
            "Proxied request"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use saeproxy_model::envelope::ProxyInput;
    use saeproxy_model::error::ProxyErrorCode;
    use saeproxy_model::types::{ApiServerSpec, ObjectMeta};
    use tokio::sync::Mutex;

    use super::*;

    /// Echoes the decoded envelope back as the response body.
    #[derive(Debug, Default)]
    struct EchoClient {
        seen: Mutex<Vec<ProxyInput>>,
    }

    #[async_trait]
    impl VendorClient for EchoClient {
        async fn call(&self, envelope: Bytes) -> ProxyResult<Bytes> {
            let input: ProxyInput = serde_json::from_slice(&envelope).unwrap();
            let body = BASE64.encode(format!("{} {}", input.method, input.path));
            self.seen.lock().await.push(input);
            Ok(Bytes::from(format!(
                r#"{{"requestId":"r-1","code":201,"body":"{body}","header":{{"X-Echo":["1"],"Content-Length":["999"]}}}}"#
            )))
        }
    }

    /// Answers a bodiless response declaring its length, as for HEAD.
    #[derive(Debug)]
    struct HeadClient;

    #[async_trait]
    impl VendorClient for HeadClient {
        async fn call(&self, _envelope: Bytes) -> ProxyResult<Bytes> {
            Ok(Bytes::from_static(
                br#"{"code":200,"header":{"Content-Length":["42"],"Content-Type":["application/json"],"Transfer-Encoding":["chunked"]}}"#,
            ))
        }
    }

    #[derive(Debug)]
    struct SlowClient;

    #[async_trait]
    impl VendorClient for SlowClient {
        async fn call(&self, _envelope: Bytes) -> ProxyResult<Bytes> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Bytes::new())
        }
    }

    #[derive(Debug)]
    struct FailingClient;

    #[async_trait]
    impl VendorClient for FailingClient {
        async fn call(&self, _envelope: Bytes) -> ProxyResult<Bytes> {
            Err(ProxyError::transport("connection refused"))
        }
    }

    fn target() -> ApiServer {
        ApiServer::new(
            ObjectMeta::named("foo"),
            ApiServerSpec {
                access_key_id: "ak".to_owned(),
                access_key_secret: "sk".to_owned(),
                region: String::new(),
            },
        )
    }

    fn request(uri: &str) -> http::request::Parts {
        let (parts, ()) = http::Request::post(uri)
            .header("content-type", "application/json")
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    fn handler(client: Arc<dyn VendorClient>, timeout: Duration) -> ProxyHandler {
        let options = ProxyOptions {
            path: "/x".to_owned(),
            from_query: true,
        };
        ProxyHandler::new(target(), options, client, timeout)
    }

    #[tokio::test]
    async fn test_should_forward_and_decode() {
        let client = Arc::new(EchoClient::default());
        let h = handler(client.clone(), Duration::from_secs(5));
        let parts = request("/apis/g/v1/servers/foo/proxy?path=/x&__dryRun=true");

        let response = h.serve(&parts, br#"{"a":1}"#).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::CREATED);
        assert_eq!(response.body().as_ref(), b"POST /x?dryRun=true");
        assert_eq!(response.headers()["x-echo"], "1");
        assert!(response.headers().get("content-length").is_none());

        let seen = client.seen.lock().await;
        assert_eq!(seen[0].content, r#"{"a":1}"#);
        assert_eq!(seen[0].header["Content-Type"], vec!["application/json"]);
    }

    #[tokio::test]
    async fn test_should_keep_declared_length_on_head() {
        let h = handler(Arc::new(HeadClient), Duration::from_secs(5));
        let (parts, ()) = http::Request::head("/p?path=/x")
            .body(())
            .unwrap()
            .into_parts();

        let response = h.serve(&parts, b"").await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        assert!(response.body().is_empty());
        assert_eq!(response.headers()["content-length"], "42");
        assert_eq!(response.headers()["content-type"], "application/json");
        assert!(response.headers().get("transfer-encoding").is_none());
    }

    #[tokio::test]
    async fn test_should_cancel_after_deadline() {
        let h = handler(Arc::new(SlowClient), Duration::from_millis(50));
        let err = h.serve(&request("/p?path=/x"), b"").await.unwrap_err();
        assert_eq!(err.code, ProxyErrorCode::Cancelled);
    }

    #[tokio::test]
    async fn test_should_surface_transport_error() {
        let h = handler(Arc::new(FailingClient), Duration::from_secs(1));
        let err = h.serve(&request("/p?path=/x"), b"").await.unwrap_err();
        assert_eq!(err.code, ProxyErrorCode::Transport);
    }

    #[tokio::test]
    async fn test_should_serve_concurrent_requests_independently() {
        let client = Arc::new(EchoClient::default());
        let h = Arc::new(handler(client, Duration::from_secs(5)));
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let h = Arc::clone(&h);
                tokio::spawn(async move {
                    let parts = request(&format!("/p?path=/x&n={i}"));
                    let response = h.serve(&parts, b"").await.unwrap();
                    assert_eq!(response.body().as_ref(), format!("POST /x?n={i}").as_bytes());
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }
    }
}
