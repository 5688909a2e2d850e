//! Canonicalization for the ROA string-to-sign.
//!
//! Two components of the string-to-sign are derived from the request rather
//! than copied from a single header:
//!
//! ```text
//! CanonicalizedHeaders  = for each x-acs-* header, sorted: lower(name) ":" value "\n"
//! CanonicalizedResource = path [ "?" sorted(key[=value]) joined by "&" ]
//! ```

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;

/// Prefix of the vendor headers that take part in the signature.
pub const ACS_HEADER_PREFIX: &str = "x-acs-";

/// Build the canonicalized `x-acs-*` headers block.
///
/// Header names are lowercased and sorted. Repeated headers are joined with
/// commas. Every entry is terminated by a newline, so an empty block is the
/// empty string.
///
/// # Examples
///
/// ```
/// use saeproxy_auth::canonical::build_canonicalized_headers;
///
/// let mut headers = http::HeaderMap::new();
/// headers.insert("x-acs-version", "2019-05-06".parse().unwrap());
/// headers.insert("x-acs-action", "VirtualServerProxy".parse().unwrap());
/// headers.insert("content-type", "application/json".parse().unwrap());
///
/// assert_eq!(
///     build_canonicalized_headers(&headers),
///     "x-acs-action:VirtualServerProxy\nx-acs-version:2019-05-06\n"
/// );
/// ```
#[must_use]
pub fn build_canonicalized_headers(headers: &http::HeaderMap) -> String {
    let mut acs: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, value) in headers {
        let name = name.as_str();
        if name.starts_with(ACS_HEADER_PREFIX) {
            acs.entry(name)
                .or_default()
                .push(value.to_str().unwrap_or("").trim());
        }
    }

    let mut result = String::new();
    for (name, values) in &acs {
        result.push_str(name);
        result.push(':');
        result.push_str(&values.join(","));
        result.push('\n');
    }
    result
}

/// Build the canonicalized resource from a path and a raw query string.
///
/// Query parameters are percent-decoded and sorted by key, then by value.
/// Parameters without a value are rendered as the bare key.
///
/// # Examples
///
/// ```
/// use saeproxy_auth::canonical::build_canonicalized_resource;
///
/// assert_eq!(build_canonicalized_resource("/pop/v1/apiserver/proxy", ""), "/pop/v1/apiserver/proxy");
/// assert_eq!(build_canonicalized_resource("/p", "b=2&a=1&flag"), "/p?a=1&b=2&flag");
/// ```
#[must_use]
pub fn build_canonicalized_resource(path: &str, query: &str) -> String {
    let mut params: Vec<(String, String)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(k), decode(v))
        })
        .collect();

    if params.is_empty() {
        return path.to_owned();
    }

    params.sort_unstable();

    let joined = params
        .iter()
        .map(|(k, v)| {
            if v.is_empty() {
                k.clone()
            } else {
                format!("{k}={v}")
            }
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("{path}?{joined}")
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}
