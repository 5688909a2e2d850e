//! Signed client for the SAE `VirtualServerProxy` RPC.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use saeproxy_auth::{AccessKey, SigningParams, sign_request};
use saeproxy_model::envelope::ENVELOPE_CONTENT_TYPE;
use saeproxy_model::error::{ProxyError, ProxyResult};

use crate::config::ProxyConfig;

/// Path of the RPC on the SAE endpoint.
pub const SAE_PROXY_PATH: &str = "/pop/v1/apiserver/proxy";
/// API version of the RPC.
pub const SAE_API_VERSION: &str = "2019-05-06";
/// Action name of the RPC.
pub const SAE_API_NAME: &str = "VirtualServerProxy";

/// A client able to submit one serialized envelope and return the raw
/// response body.
#[async_trait]
pub trait VendorClient: Send + Sync + fmt::Debug {
    /// Submit `envelope` and return the response body.
    ///
    /// Non-2xx responses fail with `TransportError`.
    async fn call(&self, envelope: Bytes) -> ProxyResult<Bytes>;
}

/// Builds a [`VendorClient`] for a region and credential.
pub trait ClientFactory: Send + Sync + fmt::Debug + 'static {
    /// Construct a client. Malformed region or credential input fails with
    /// `ClientInitError`.
    fn client(&self, region: &str, key: &AccessKey) -> ProxyResult<Arc<dyn VendorClient>>;
}

/// Factory of [`PopClient`]s sharing one connection pool.
#[derive(Debug, Clone)]
pub struct PopClientFactory {
    http: reqwest::Client,
    endpoint_template: String,
    scheme: String,
}

impl PopClientFactory {
    /// Create a factory.
    ///
    /// `endpoint_template` is a host (optionally with port) in which
    /// `{region}` is substituted.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        endpoint_template: impl Into<String>,
        scheme: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint_template: endpoint_template.into(),
            scheme: scheme.into(),
        }
    }

    /// Create a factory from configuration.
    pub fn from_config(config: &ProxyConfig) -> ProxyResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("saeproxy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProxyError::client_init(format!("build HTTP client: {e}")).with_source(e))?;
        Ok(Self::new(http, &config.sae_endpoint, &config.sae_scheme))
    }

    /// Endpoint host of `region`.
    #[must_use]
    pub fn endpoint(&self, region: &str) -> String {
        self.endpoint_template.replace("{region}", region)
    }
}

impl ClientFactory for PopClientFactory {
    fn client(&self, region: &str, key: &AccessKey) -> ProxyResult<Arc<dyn VendorClient>> {
        if !is_valid_region(region) {
            return Err(ProxyError::client_init(format!("invalid region {region:?}")));
        }
        let endpoint = self.endpoint(region);
        let uri: http::Uri = format!("{}://{endpoint}{SAE_PROXY_PATH}", self.scheme)
            .parse()
            .map_err(|e| {
                ProxyError::client_init(format!("invalid SAE endpoint {endpoint:?}")).with_source(e)
            })?;
        debug!(region = %region, access_key_id = %key.id(), uri = %uri, "Created SAE client");
        Ok(Arc::new(PopClient {
            http: self.http.clone(),
            uri,
            access_key: key.clone(),
        }))
    }
}

fn is_valid_region(region: &str) -> bool {
    !region.is_empty()
        && !region.starts_with('-')
        && !region.ends_with('-')
        && region
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// A client bound to one region and access key.
pub struct PopClient {
    http: reqwest::Client,
    uri: http::Uri,
    access_key: AccessKey,
}

impl fmt::Debug for PopClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopClient")
            .field("uri", &self.uri)
            .field("access_key", &self.access_key)
            .finish_non_exhaustive()
    }
}

impl PopClient {
    fn build_request(&self, envelope: Bytes) -> ProxyResult<http::Request<Bytes>> {
        let (mut parts, ()) = http::Request::builder()
            .method(http::Method::POST)
            .uri(self.uri.clone())
            .header(http::header::ACCEPT, "application/json")
            .header(http::header::CONTENT_TYPE, ENVELOPE_CONTENT_TYPE)
            .header("x-acs-version", SAE_API_VERSION)
            .header("x-acs-action", SAE_API_NAME)
            .body(())
            .map_err(|e| ProxyError::internal_error(format!("build SAE request: {e}")))?
            .into_parts();

        let params = SigningParams {
            access_key: &self.access_key,
            date: Utc::now(),
            nonce: uuid::Uuid::new_v4().to_string(),
        };
        sign_request(&mut parts, &envelope, &params)
            .map_err(|e| ProxyError::client_init(format!("sign SAE request: {e}")).with_source(e))?;

        Ok(http::Request::from_parts(parts, envelope))
    }
}

#[async_trait]
impl VendorClient for PopClient {
    async fn call(&self, envelope: Bytes) -> ProxyResult<Bytes> {
        let request = self.build_request(envelope)?;
        let request = reqwest::Request::try_from(request).map_err(|e| {
            ProxyError::transport(format!("convert SAE request: {e}")).with_source(e)
        })?;

        let response = self.http.execute(request).await.map_err(|e| {
            ProxyError::transport(format!("SAE {SAE_API_NAME} request failed: {e}")).with_source(e)
        })?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            ProxyError::transport(format!("read SAE response: {e}")).with_source(e)
        })?;

        if !status.is_success() {
            let err = vendor_error(status, &body);
            warn!(status = %status, error = %err, "SAE call rejected");
            return Err(err);
        }
        Ok(body)
    }
}

/// Error document returned by the SAE gateway on failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VendorErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    request_id: String,
}

fn vendor_error(status: http::StatusCode, body: &[u8]) -> ProxyError {
    match serde_json::from_slice::<VendorErrorBody>(body) {
        Ok(doc) if !doc.code.is_empty() => ProxyError::transport(format!(
            "SAE returned {status}: {}: {} (request id {})",
            doc.code, doc.message, doc.request_id
        )),
        _ => ProxyError::transport(format!("SAE returned {status}")),
    }
}
