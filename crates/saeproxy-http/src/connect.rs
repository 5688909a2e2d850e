//! Connect contract of sub-resources.
//!
//! A connectable sub-resource declares the methods it accepts, parses its
//! per-request options, and produces a handler bound to the parent record.

use std::sync::Arc;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use tracing::debug;

use saeproxy_auth::AccessKey;
use saeproxy_core::client::ClientFactory;
use saeproxy_model::api;
use saeproxy_model::error::{ProxyError, ProxyResult};
use saeproxy_model::types::{ApiServer, ProxyOptions};

use crate::codec::PATH_PARAM;
use crate::proxy::ProxyHandler;

/// A sub-resource reachable at `<item>/<name>[/...]`.
pub trait SubResource: Send + Sync + 'static {
    /// Parsed per-request options.
    type Options;
    /// Handler bound to one parent record.
    type Handler;

    /// Sub-resource name, the path segment after the record name.
    fn name(&self) -> &'static str;

    /// Methods the sub-resource accepts.
    fn methods(&self) -> &'static [http::Method];

    /// Parse options from the sub-path and raw query of the request.
    fn new_options(&self, sub_path: Option<&str>, query: Option<&str>)
    -> ProxyResult<Self::Options>;

    /// Bind a handler to `parent`.
    fn connect(&self, parent: ApiServer, options: Self::Options) -> ProxyResult<Self::Handler>;

    /// Whether `method` is accepted.
    fn allows(&self, method: &http::Method) -> bool {
        self.methods().contains(method)
    }
}

static PROXY_METHODS: [http::Method; 7] = [
    http::Method::GET,
    http::Method::POST,
    http::Method::PUT,
    http::Method::PATCH,
    http::Method::DELETE,
    http::Method::HEAD,
    http::Method::OPTIONS,
];

/// The `proxy` sub-resource of `SAEAPIServer`.
#[derive(Debug, Clone)]
pub struct ApiServerProxy {
    clients: Arc<dyn ClientFactory>,
    timeout: Duration,
}

impl ApiServerProxy {
    /// Create the sub-resource. Every vendor call is bounded by `timeout`.
    #[must_use]
    pub fn new(clients: Arc<dyn ClientFactory>, timeout: Duration) -> Self {
        Self { clients, timeout }
    }
}

impl SubResource for ApiServerProxy {
    type Options = ProxyOptions;
    type Handler = ProxyHandler;

    fn name(&self) -> &'static str {
        api::PROXY_SUBRESOURCE
    }

    fn methods(&self) -> &'static [http::Method] {
        &PROXY_METHODS
    }

    fn new_options(
        &self,
        sub_path: Option<&str>,
        query: Option<&str>,
    ) -> ProxyResult<ProxyOptions> {
        if let Some(path) = sub_path.filter(|p| !p.is_empty()) {
            return Ok(ProxyOptions {
                path: path.to_owned(),
                from_query: false,
            });
        }
        let path = query
            .unwrap_or_default()
            .split('&')
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .find(|(k, _)| *k == PATH_PARAM)
            .map(|(_, v)| {
                percent_decode_str(&v.replace('+', " "))
                    .decode_utf8_lossy()
                    .into_owned()
            });
        match path {
            Some(path) => Ok(ProxyOptions {
                path,
                from_query: true,
            }),
            None => Ok(ProxyOptions::default()),
        }
    }

    fn connect(&self, parent: ApiServer, options: ProxyOptions) -> ProxyResult<ProxyHandler> {
        let key = AccessKey::new(
            parent.spec.access_key_id.clone(),
            parent.spec.access_key_secret.clone(),
        )
        .map_err(|e| {
            ProxyError::client_init(format!(
                "cannot create alibaba-cloud client with ak/sk: {e}"
            ))
            .with_source(e)
        })?;
        let region = parent.spec.region_or_default().to_owned();
        let client = self.clients.client(&region, &key)?;
        debug!(name = %parent.name(), region = %region, path = %options.path, "Connected proxy");
        Ok(ProxyHandler::new(parent, options, client, self.timeout))
    }
}
