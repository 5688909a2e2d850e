//! CRUD handlers of the `saeapiservers` collection and its items.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use saeproxy_core::registry::ApiServerRegistry;
use saeproxy_model::error::{ProxyError, ProxyResult};
use saeproxy_model::table::ToTable;
use saeproxy_model::types::{ApiResourceList, ApiServer};

use crate::body::ProxyResponseBody;
use crate::response::{json_response, table_response};

type Response = http::Response<ProxyResponseBody>;

/// Whether the client asked for a `meta.k8s.io/v1` table.
fn wants_table(headers: &http::HeaderMap) -> bool {
    headers
        .get_all(http::header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("as=Table"))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> ProxyResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        ProxyError::bad_request(format!("invalid request body: {e}")).with_source(e)
    })
}

fn render<T: serde::Serialize + ToTable>(
    headers: &http::HeaderMap,
    value: &T,
    request_id: &str,
) -> Response {
    if wants_table(headers) {
        table_response(&value.to_table(), request_id)
    } else {
        json_response(http::StatusCode::OK, value, request_id)
    }
}

/// Serve the discovery document.
pub fn discovery(method: &http::Method, request_id: &str) -> ProxyResult<Response> {
    match *method {
        http::Method::GET => Ok(json_response(
            http::StatusCode::OK,
            &ApiResourceList::served(),
            request_id,
        )),
        _ => Err(ProxyError::method_not_allowed(method)),
    }
}

/// Serve the collection: list or create.
pub async fn collection(
    registry: &ApiServerRegistry,
    parts: &http::request::Parts,
    body: Bytes,
    request_id: &str,
) -> ProxyResult<Response> {
    match parts.method {
        http::Method::GET => {
            let list = registry.list().await?;
            Ok(render(&parts.headers, &list, request_id))
        }
        http::Method::POST => {
            let server: ApiServer = parse_body(&body)?;
            let created = registry.create(server).await?;
            Ok(json_response(http::StatusCode::CREATED, &created, request_id))
        }
        _ => Err(ProxyError::method_not_allowed(&parts.method)),
    }
}

/// Serve one named record: get, replace, merge-patch or delete.
pub async fn item(
    registry: &ApiServerRegistry,
    name: &str,
    parts: &http::request::Parts,
    body: Bytes,
    request_id: &str,
) -> ProxyResult<Response> {
    match parts.method {
        http::Method::GET => {
            let server = registry.get(name).await?;
            Ok(render(&parts.headers, &server, request_id))
        }
        http::Method::PUT => {
            let server: ApiServer = parse_body(&body)?;
            let updated = registry.update(name, server).await?;
            Ok(json_response(http::StatusCode::OK, &updated, request_id))
        }
        http::Method::PATCH => {
            let patch: serde_json::Value = parse_body(&body)?;
            if !patch.is_object() {
                return Err(ProxyError::bad_request("merge patch must be a JSON object"));
            }
            let patched = registry.patch(name, &patch).await?;
            Ok(json_response(http::StatusCode::OK, &patched, request_id))
        }
        http::Method::DELETE => {
            let deleted = registry.delete(name).await?;
            Ok(json_response(http::StatusCode::OK, &deleted, request_id))
        }
        _ => Err(ProxyError::method_not_allowed(&parts.method)),
    }
}
