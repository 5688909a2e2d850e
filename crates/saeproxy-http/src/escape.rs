//! Query escaping for proxy requests.
//!
//! Some query parameters the proxied API understands (`dryRun`) are also
//! reserved by the hosting layer. Requests addressed to the proxy
//! sub-resource get those keys renamed with [`ESCAPE_PREFIX`] before routing;
//! the codec restores them right before the request is forwarded.
//!
//! ```text
//! /apis/<g>/<v>/<r>/<name>/proxy?path=/x&dryRun=true
//!   escape   -> path=/x&__dryRun=true
//!   unescape -> path=/x&dryRun=true
//! ```
//!
//! Parameters keep their order and raw encoding, so an escape/unescape round
//! trip is byte-for-byte.

use std::borrow::Cow;

use http::uri::PathAndQuery;
use percent_encoding::percent_decode_str;
use regex::Regex;
use tracing::{debug, warn};

use saeproxy_model::api;

/// Prefix prepended to reserved keys.
pub const ESCAPE_PREFIX: &str = "__";

/// Query keys reserved by the hosting layer.
pub const RESERVED_QUERY_KEYS: &[&str] = &["dryRun"];

/// Matches paths addressed to the proxy sub-resource of a named record.
#[derive(Debug, Clone)]
pub struct ProxyPathMatcher {
    pattern: Regex,
}

impl ProxyPathMatcher {
    /// Matcher for `/apis/<group>/<version>/<resource>/<name>/proxy[/...]`.
    #[must_use]
    pub fn new(group: &str, version: &str, resource: &str) -> Self {
        let pattern = format!(
            "^{}/{}/{}/{}/[a-z0-9]([-a-z0-9]*[a-z0-9])?/{}(/|$)",
            regex::escape(api::API_GROUP_PREFIX),
            regex::escape(group),
            regex::escape(version),
            regex::escape(resource),
            regex::escape(api::PROXY_SUBRESOURCE),
        );
        Self {
            pattern: Regex::new(&pattern).expect("proxy path pattern is a valid regex"),
        }
    }

    /// Whether `path` targets the proxy sub-resource.
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }
}

impl Default for ProxyPathMatcher {
    fn default() -> Self {
        Self::new(api::GROUP, api::VERSION, api::RESOURCE)
    }
}

fn split_pairs(query: &str) -> impl Iterator<Item = &str> {
    query.split('&').filter(|p| !p.is_empty())
}

fn decoded_key(pair: &str) -> Cow<'_, str> {
    let key = pair.split_once('=').map_or(pair, |(k, _)| k);
    percent_decode_str(key).decode_utf8_lossy()
}

fn rename(pair: &str, key: &str) -> String {
    match pair.split_once('=') {
        Some((_, value)) => format!("{key}={value}"),
        None => key.to_owned(),
    }
}

/// Rename every reserved key of `query` to its escaped form.
///
/// When a reserved key is present, pre-existing escaped forms of it are
/// dropped. Queries without reserved keys are returned unchanged.
#[must_use]
pub fn escape_query(query: &str) -> Cow<'_, str> {
    let present: Vec<&str> = RESERVED_QUERY_KEYS
        .iter()
        .copied()
        .filter(|k| split_pairs(query).any(|p| decoded_key(p) == *k))
        .collect();
    if present.is_empty() {
        return Cow::Borrowed(query);
    }

    let mut out = Vec::new();
    for pair in split_pairs(query) {
        let key = decoded_key(pair);
        if key
            .strip_prefix(ESCAPE_PREFIX)
            .is_some_and(|k| present.contains(&k))
        {
            continue;
        }
        if present.contains(&&*key) {
            out.push(rename(pair, &format!("{ESCAPE_PREFIX}{key}")));
        } else {
            out.push(pair.to_owned());
        }
    }
    Cow::Owned(out.join("&"))
}

/// Restore reserved keys escaped by [`escape_query`].
///
/// Only keys whose unprefixed form is reserved are restored; any other
/// prefixed key is ordinary user data and passes through.
#[must_use]
pub fn unescape_query(query: &str) -> Cow<'_, str> {
    let escaped = |pair: &str| {
        decoded_key(pair)
            .strip_prefix(ESCAPE_PREFIX)
            .and_then(|k| RESERVED_QUERY_KEYS.iter().copied().find(|r| *r == k))
    };
    if !split_pairs(query).any(|p| escaped(p).is_some()) {
        return Cow::Borrowed(query);
    }

    let out: Vec<String> = split_pairs(query)
        .map(|pair| match escaped(pair) {
            Some(reserved) => rename(pair, reserved),
            None => pair.to_owned(),
        })
        .collect();
    Cow::Owned(out.join("&"))
}

/// Escape the query of `uri` when it targets the proxy sub-resource.
///
/// Returns `None` when nothing needs to change.
#[must_use]
pub fn escape_uri(uri: &http::Uri, matcher: &ProxyPathMatcher) -> Option<http::Uri> {
    if !matcher.is_match(uri.path()) {
        return None;
    }
    let Cow::Owned(escaped) = escape_query(uri.query()?) else {
        return None;
    };

    let path_and_query = if escaped.is_empty() {
        uri.path().to_owned()
    } else {
        format!("{}?{escaped}", uri.path())
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = match PathAndQuery::try_from(path_and_query) {
        Ok(pq) => Some(pq),
        Err(e) => {
            warn!(error = %e, "Escaped proxy query is not a valid URI, forwarding as is");
            return None;
        }
    };
    http::Uri::from_parts(parts).ok()
}

/// Middleware escaping reserved query keys on proxy requests before they
/// reach the wrapped service.
///
/// A request that needs rewriting is rebuilt around a new URI; other
/// requests pass through untouched.
#[derive(Debug, Clone)]
pub struct ProxyRequestEscaper<S> {
    inner: S,
    matcher: ProxyPathMatcher,
}

impl<S> ProxyRequestEscaper<S> {
    /// Wrap `inner`, escaping requests that match `matcher`.
    #[must_use]
    pub fn new(inner: S, matcher: ProxyPathMatcher) -> Self {
        Self { inner, matcher }
    }

    /// Escape a single request.
    pub fn escape<B>(&self, req: http::Request<B>) -> http::Request<B> {
        let Some(uri) = escape_uri(req.uri(), &self.matcher) else {
            return req;
        };
        debug!(from = %req.uri(), to = %uri, "Escaped reserved proxy query keys");
        let (mut parts, body) = req.into_parts();
        parts.uri = uri;
        http::Request::from_parts(parts, body)
    }
}

impl<S, B> hyper::service::Service<http::Request<B>> for ProxyRequestEscaper<S>
where
    S: hyper::service::Service<http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        self.inner.call(self.escape(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_matcher() -> ProxyPathMatcher {
        ProxyPathMatcher::new("g", "v1", "servers")
    }

    #[test]
    fn test_should_escape_reserved_key() {
        assert_eq!(escape_query("path=/x&dryRun=true"), "path=/x&__dryRun=true");
    }

    #[test]
    fn test_should_round_trip_byte_for_byte() {
        for query in [
            "dryRun=true",
            "path=/x&dryRun=All&limit=10",
            "dryRun&a=%2Fb",
            "a=1&dryRun=true&dryRun=false&z=",
        ] {
            let escaped = escape_query(query);
            assert!(!escaped.split('&').any(|p| p.starts_with("dryRun")));
            assert_eq!(unescape_query(&escaped), query, "query {query}");
        }
    }

    #[test]
    fn test_should_not_touch_non_reserved_keys() {
        for query in ["", "a=1", "path=/x&limit=5", "__other=1", "dryrun=1"] {
            assert!(matches!(escape_query(query), Cow::Borrowed(q) if q == query));
        }
    }

    #[test]
    fn test_should_be_idempotent() {
        let once = escape_query("dryRun=true&x=1").into_owned();
        let twice = escape_query(&once).into_owned();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_should_drop_existing_escaped_key_when_reserved_present() {
        assert_eq!(escape_query("__dryRun=old&dryRun=new"), "__dryRun=new");
    }

    #[test]
    fn test_should_keep_unrelated_prefixed_keys_on_unescape() {
        assert_eq!(unescape_query("__foo=1&__dryRun=true"), "__foo=1&dryRun=true");
        assert!(matches!(unescape_query("__foo=1"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_should_match_only_proxy_paths() {
        let m = test_matcher();
        assert!(m.is_match("/apis/g/v1/servers/foo/proxy"));
        assert!(m.is_match("/apis/g/v1/servers/foo-1/proxy/api/v1"));
        assert!(!m.is_match("/apis/g/v1/servers/foo"));
        assert!(!m.is_match("/apis/g/v1/servers/Foo/proxy"));
        assert!(!m.is_match("/apis/g/v1/servers/-foo/proxy"));
        assert!(!m.is_match("/apis/g/v1/servers/foo/proxyx"));
        assert!(!m.is_match("/prefix/apis/g/v1/servers/foo/proxy"));
    }

    #[test]
    fn test_should_escape_matching_request_uri() {
        let escaper = ProxyRequestEscaper::new((), test_matcher());
        let req = http::Request::get("/apis/g/v1/servers/foo/proxy?path=/x&dryRun=true")
            .body(())
            .unwrap();
        let escaped = escaper.escape(req);
        let query = escaped.uri().query().unwrap();
        assert!(query.contains("__dryRun=true"));
        assert!(!query.split('&').any(|p| p.starts_with("dryRun")));
        assert_eq!(unescape_query(query), "path=/x&dryRun=true");
    }

    #[test]
    fn test_should_pass_through_other_requests() {
        let escaper = ProxyRequestEscaper::new((), test_matcher());
        let uri = "/apis/g/v1/servers/foo?dryRun=All";
        let req = http::Request::delete(uri).body(()).unwrap();
        assert_eq!(escaper.escape(req).uri(), uri);
    }

    #[test]
    fn test_should_escape_concurrently_without_interference() {
        let handles: Vec<_> = (0..32)
            .map(|i| {
                std::thread::spawn(move || {
                    let query = format!("n={i}&dryRun={i}");
                    let escaped = escape_query(&query).into_owned();
                    assert_eq!(escaped, format!("n={i}&__dryRun={i}"));
                    assert_eq!(unescape_query(&escaped), query);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
