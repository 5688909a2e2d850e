//! Proxy HTTP service implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::BodyExt;
use tracing::debug;

use saeproxy_core::registry::ApiServerRegistry;
use saeproxy_model::error::{ProxyError, ProxyErrorCode, ProxyResult};

use crate::body::ProxyResponseBody;
use crate::connect::{ApiServerProxy, SubResource};
use crate::resource;
use crate::responder::{Responder, StatusResponder};
use crate::router::{Route, resolve_route};

/// Hyper `Service` serving the `saeapiservers` resource and its `proxy`
/// sub-resource.
#[derive(Clone)]
pub struct ProxyHttpService {
    registry: ApiServerRegistry,
    proxy: Arc<ApiServerProxy>,
    responder: Arc<dyn Responder>,
}

impl std::fmt::Debug for ProxyHttpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyHttpService")
            .field("registry", &self.registry)
            .field("proxy", &self.proxy)
            .finish_non_exhaustive()
    }
}

impl ProxyHttpService {
    /// Create a service answering errors with [`StatusResponder`].
    #[must_use]
    pub fn new(registry: ApiServerRegistry, proxy: ApiServerProxy) -> Self {
        Self::with_responder(registry, proxy, Arc::new(StatusResponder))
    }

    /// Create a service with a custom error responder.
    #[must_use]
    pub fn with_responder(
        registry: ApiServerRegistry,
        proxy: ApiServerProxy,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            registry,
            proxy: Arc::new(proxy),
            responder,
        }
    }
}

impl<B> hyper::service::Service<http::Request<B>> for ProxyHttpService
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    type Response = http::Response<ProxyResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let svc = self.clone();
        let request_id = uuid::Uuid::new_v4().to_string();

        Box::pin(async move {
            let response = match process_request(req, &svc, &request_id).await {
                Ok(response) => response,
                Err(err) => svc.responder.error(err, &request_id),
            };
            Ok(response)
        })
    }
}

/// Process a single request through the full pipeline.
async fn process_request<B>(
    req: http::Request<B>,
    svc: &ProxyHttpService,
    request_id: &str,
) -> ProxyResult<http::Response<ProxyResponseBody>>
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let (parts, body) = req.into_parts();
    debug!(request_id = %request_id, method = %parts.method, uri = %parts.uri, "Received request");

    match resolve_route(parts.uri.path())? {
        Route::Discovery => resource::discovery(&parts.method, request_id),
        Route::Collection => {
            let body = collect_body(body).await.map_err(as_bad_request)?;
            resource::collection(&svc.registry, &parts, body, request_id).await
        }
        Route::Item(name) => {
            let body = collect_body(body).await.map_err(as_bad_request)?;
            resource::item(&svc.registry, &name, &parts, body, request_id).await
        }
        Route::SubResource {
            name,
            subresource,
            sub_path,
        } if subresource == svc.proxy.name() => {
            let proxy = svc.proxy.as_ref();
            if !proxy.allows(&parts.method) {
                return Err(ProxyError::method_not_allowed(&parts.method));
            }
            let options = proxy.new_options(sub_path.as_deref(), parts.uri.query())?;
            let target = svc.registry.resolve(&name).await?;
            let handler = proxy.connect(target, options)?;
            let body = collect_body(body).await?;

            let response = handler.serve(&parts, &body).await?;
            Ok(response.map(|b| {
                if b.is_empty() {
                    ProxyResponseBody::empty()
                } else {
                    ProxyResponseBody::from_bytes(b)
                }
            }))
        }
        Route::SubResource { subresource, .. } => Err(ProxyError::with_message(
            ProxyErrorCode::NotFound,
            format!("the server could not find the requested resource ({subresource})"),
        )),
    }
}

/// Collect the incoming body into a single `Bytes` buffer.
async fn collect_body<B>(body: B) -> ProxyResult<Bytes>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    body.collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|e| {
            ProxyError::transport(format!("failed to read request body: {e}")).with_source(e)
        })
}

/// Body read failures of local CRUD requests are the caller's fault.
fn as_bad_request(err: ProxyError) -> ProxyError {
    ProxyError {
        code: ProxyErrorCode::BadRequest,
        status_code: http::StatusCode::BAD_REQUEST,
        ..err
    }
}
