//! Envelope codec.
//!
//! Converts an inbound HTTP request into a [`ProxyInput`] and a vendor
//! [`ProxyOutput`] back into an HTTP response. Both directions are pure
//! functions over their inputs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use http::{HeaderName, HeaderValue, StatusCode};
use tracing::debug;

use saeproxy_model::api;
use saeproxy_model::envelope::{ENVELOPE_CONTENT_TYPE, EnvelopeHeader, ProxyInput, ProxyOutput};
use saeproxy_model::error::{ProxyError, ProxyResult};
use saeproxy_model::types::ProxyOptions;

use crate::escape::unescape_query;

/// Query parameter carrying the target path.
pub const PATH_PARAM: &str = "path";

/// Build the vendor-relative path of a proxied request.
///
/// The local proxy prefix of `name` is stripped from the options path and
/// the unescaped query is appended. When the target path came from the
/// `path` parameter, that parameter is not forwarded.
#[must_use]
pub fn vendor_path(options: &ProxyOptions, name: &str, query: Option<&str>) -> String {
    let prefix = api::proxy_path(name);
    let path = options
        .path
        .strip_prefix(prefix.as_str())
        .unwrap_or(&options.path);
    let mut out = if path.is_empty() {
        "/".to_owned()
    } else {
        path.to_owned()
    };

    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return out;
    };
    let query = unescape_query(query);
    let forwarded: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            !(options.from_query && pair.split_once('=').map_or(*pair, |(k, _)| k) == PATH_PARAM)
        })
        .collect();
    if !forwarded.is_empty() {
        out.push('?');
        out.push_str(&forwarded.join("&"));
    }
    out
}

/// Canonical MIME form of a header name, e.g. `content-type` becomes
/// `Content-Type`.
#[must_use]
pub fn canonical_header_name(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

/// Copy headers into envelope form, keeping repeated values in order.
///
/// `Host` names this server, not the vendor target, and is not carried.
#[must_use]
pub fn encode_headers(headers: &http::HeaderMap) -> EnvelopeHeader {
    let mut out = EnvelopeHeader::new();
    for (name, value) in headers {
        if name == http::header::HOST {
            continue;
        }
        out.entry(canonical_header_name(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    out
}

/// Encode an inbound request into the vendor request envelope.
#[must_use]
pub fn encode_request(
    parts: &http::request::Parts,
    body: &[u8],
    options: &ProxyOptions,
    name: &str,
) -> ProxyInput {
    ProxyInput {
        path: vendor_path(options, name, parts.uri.query()),
        method: parts.method.as_str().to_owned(),
        content_type: ENVELOPE_CONTENT_TYPE.to_owned(),
        content: String::from_utf8_lossy(body).into_owned(),
        header: encode_headers(&parts.headers),
    }
}

/// Decode a vendor response envelope into an HTTP response.
///
/// `version` is the protocol version of the inbound request. Nothing is
/// returned unless the whole envelope decodes.
pub fn decode_response(
    raw: &[u8],
    version: http::Version,
) -> ProxyResult<http::Response<Bytes>> {
    let output: ProxyOutput = serde_json::from_slice(raw).map_err(|e| {
        ProxyError::decode(format!("invalid VirtualServerProxy response: {e}")).with_source(e)
    })?;

    if let Some(error) = output.error.as_deref().filter(|e| !e.is_empty()) {
        debug!(request_id = ?output.request_id, error = %error, "Vendor reported an error");
    }

    let status = StatusCode::from_u16(output.code).map_err(|e| {
        ProxyError::decode(format!("invalid status code {}", output.code)).with_source(e)
    })?;

    let body = match output.body.as_deref() {
        Some(encoded) => BASE64.decode(encoded).map_err(|e| {
            ProxyError::body_decode(format!("response body is not valid base64: {e}"))
                .with_source(e)
        })?,
        None => Vec::new(),
    };

    let mut response = http::Response::new(Bytes::from(body));
    *response.status_mut() = status;
    *response.version_mut() = version;

    let headers = response.headers_mut();
    for (name, values) in output.header.unwrap_or_default() {
        let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ProxyError::decode(format!("invalid response header name {name:?}")).with_source(e)
        })?;
        for value in values {
            let value = HeaderValue::from_str(&value).map_err(|e| {
                ProxyError::decode(format!("invalid value of response header {name}"))
                    .with_source(e)
            })?;
            headers.append(header.clone(), value);
        }
    }

    Ok(response)
}
