//! Response construction helpers.

use serde::Serialize;

use crate::body::ProxyResponseBody;

/// Content type of JSON documents.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content type of `meta.k8s.io/v1` tables.
pub const CONTENT_TYPE_TABLE: &str = "application/json;as=Table;v=v1;g=meta.k8s.io";

/// Header carrying the server-assigned request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build a JSON response.
#[must_use]
pub fn json_response<T: Serialize>(
    status: http::StatusCode,
    value: &T,
    request_id: &str,
) -> http::Response<ProxyResponseBody> {
    let json = serde_json::to_vec(value).expect("JSON serialization of response cannot fail");
    document_response(status, json, CONTENT_TYPE_JSON, request_id)
}

/// Build a `meta.k8s.io/v1` table response.
#[must_use]
pub fn table_response<T: Serialize>(
    value: &T,
    request_id: &str,
) -> http::Response<ProxyResponseBody> {
    let json = serde_json::to_vec(value).expect("JSON serialization of table cannot fail");
    document_response(http::StatusCode::OK, json, CONTENT_TYPE_TABLE, request_id)
}

fn document_response(
    status: http::StatusCode,
    json: Vec<u8>,
    content_type: &'static str,
    request_id: &str,
) -> http::Response<ProxyResponseBody> {
    let mut response = http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, content_type)
        .body(ProxyResponseBody::from_bytes(json))
        .expect("valid JSON response");
    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, hv);
    }
    response
}

/// Plain-text `200 ok` used by health probes.
#[must_use]
pub fn ok_response() -> http::Response<ProxyResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(ProxyResponseBody::from_string("ok"))
        .expect("static ok response should be valid")
}
