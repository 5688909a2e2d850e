//! ROA request signing.
//!
//! The string to sign is built from the request as:
//!
//! ```text
//! StringToSign = HTTP-Verb + "\n" +
//!                Accept + "\n" +
//!                Content-MD5 + "\n" +
//!                Content-Type + "\n" +
//!                Date + "\n" +
//!                CanonicalizedHeaders +
//!                CanonicalizedResource
//! ```
//!
//! [`sign_request`] sets every header that takes part in the signature, then
//! adds the `Authorization` header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use digest::Digest;
use hmac::{Hmac, KeyInit, Mac};
use http::HeaderValue;
use sha1::Sha1;
use tracing::debug;

use crate::canonical::{build_canonicalized_headers, build_canonicalized_resource};
use crate::credentials::AccessKey;
use crate::error::SignError;

type HmacSha1 = Hmac<Sha1>;

/// Signature method advertised in `x-acs-signature-method`.
pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";

/// Signature version advertised in `x-acs-signature-version`.
pub const SIGNATURE_VERSION: &str = "1.0";

/// Per-request signing parameters.
#[derive(Debug, Clone)]
pub struct SigningParams<'a> {
    /// Credential used to sign.
    pub access_key: &'a AccessKey,
    /// Signing time, rendered into the `Date` header.
    pub date: DateTime<Utc>,
    /// Unique nonce, rendered into `x-acs-signature-nonce`.
    pub nonce: String,
}

/// Sign a request in place.
///
/// `Accept`, `Content-Type` and any `x-acs-*` headers describing the API
/// (version, action) must already be set on `parts`. This function adds
/// `Date`, `Content-MD5`, the signature headers and `Authorization`.
pub fn sign_request(
    parts: &mut http::request::Parts,
    body: &[u8],
    params: &SigningParams<'_>,
) -> Result<(), SignError> {
    let date = format_http_date(params.date);
    insert(parts, "date", &date)?;
    insert(parts, "content-md5", &content_md5(body))?;
    insert(parts, "x-acs-signature-method", SIGNATURE_METHOD)?;
    insert(parts, "x-acs-signature-version", SIGNATURE_VERSION)?;
    insert(parts, "x-acs-signature-nonce", &params.nonce)?;

    let string_to_sign = build_string_to_sign(parts);
    debug!(string_to_sign = ?string_to_sign, "Built ROA string to sign");

    let signature = compute_signature(params.access_key.secret(), &string_to_sign);
    let mut auth = HeaderValue::from_str(&format!(
        "acs {}:{signature}",
        params.access_key.id()
    ))
    .map_err(|_| SignError::InvalidHeaderValue("authorization"))?;
    auth.set_sensitive(true);
    parts.headers.insert(http::header::AUTHORIZATION, auth);

    Ok(())
}

/// Base64 of the MD5 digest of `body`, as carried in `Content-MD5`.
#[must_use]
pub fn content_md5(body: &[u8]) -> String {
    BASE64.encode(md5::Md5::digest(body))
}

/// Build the ROA string to sign from the request parts.
#[must_use]
pub fn build_string_to_sign(parts: &http::request::Parts) -> String {
    let method = parts.method.as_str();
    let accept = header_value(parts, "accept");
    let content_md5 = header_value(parts, "content-md5");
    let content_type = header_value(parts, "content-type");
    let date = header_value(parts, "date");
    let headers = build_canonicalized_headers(&parts.headers);
    let resource =
        build_canonicalized_resource(parts.uri.path(), parts.uri.query().unwrap_or(""));

    format!("{method}\n{accept}\n{content_md5}\n{content_type}\n{date}\n{headers}{resource}")
}

/// Compute the signature: Base64(HMAC-SHA1(secret, string_to_sign)).
#[must_use]
pub fn compute_signature(secret: &str, string_to_sign: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC can accept any key length");
    mac.update(string_to_sign.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Format a timestamp as an RFC 7231 HTTP date.
fn format_http_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn insert(
    parts: &mut http::request::Parts,
    name: &'static str,
    value: &str,
) -> Result<(), SignError> {
    let value = HeaderValue::from_str(value).map_err(|_| SignError::InvalidHeaderValue(name))?;
    parts.headers.insert(name, value);
    Ok(())
}

/// Extract a header value as a string, returning empty string if missing.
fn header_value(parts: &http::request::Parts, name: &str) -> String {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_owned()
}
