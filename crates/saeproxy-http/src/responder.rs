//! Error responder.
//!
//! Every failed request is answered by a [`Responder`], exactly once, after
//! the failure is fully known.

use tracing::{error, warn};

use saeproxy_model::error::ProxyError;
use saeproxy_model::types::Status;

use crate::body::ProxyResponseBody;
use crate::response::json_response;

/// Turns a [`ProxyError`] into a complete HTTP response.
pub trait Responder: Send + Sync + 'static {
    /// Render `err` for the request identified by `request_id`.
    fn error(&self, err: ProxyError, request_id: &str) -> http::Response<ProxyResponseBody>;
}

/// Renders errors as Kubernetes-style `Status` documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusResponder;

impl Responder for StatusResponder {
    fn error(&self, err: ProxyError, request_id: &str) -> http::Response<ProxyResponseBody> {
        if err.status_code.is_server_error() {
            error!(request_id = %request_id, code = %err.code, error = %err, source = ?err.source, "Request failed");
        } else {
            warn!(request_id = %request_id, code = %err.code, error = %err, "Request rejected");
        }
        let status = Status::failure(&err.message, err.reason(), err.status_code.as_u16());
        json_response(err.status_code, &status, request_id)
    }
}
