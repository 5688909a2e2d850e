//! Envelopes exchanged with the SAE `VirtualServerProxy` RPC.
//!
//! The proxied HTTP request is wrapped into a [`ProxyInput`], serialized as
//! JSON and submitted as the RPC body. The RPC answers with a [`ProxyOutput`]
//! whose `body` field carries the upstream payload in base64.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Content type of the envelope itself, independent of the proxied payload.
pub const ENVELOPE_CONTENT_TYPE: &str = "application/json";

/// Header map in envelope form: canonical name to every value, in order.
pub type EnvelopeHeader = BTreeMap<String, Vec<String>>;

/// Request envelope sent to the vendor RPC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyInput {
    /// Path on the remote API server, including the query string.
    pub path: String,
    /// HTTP method of the proxied request.
    pub method: String,
    /// Always [`ENVELOPE_CONTENT_TYPE`].
    pub content_type: String,
    /// Raw request body.
    pub content: String,
    /// Request headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub header: EnvelopeHeader,
}

impl ProxyInput {
    /// Serialize to the JSON bytes submitted as the RPC body.
    #[must_use]
    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("JSON serialization of proxy input cannot fail")
    }
}

/// Response envelope returned by the vendor RPC.
///
/// Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyOutput {
    /// Vendor-assigned request id; informational only.
    #[serde(default)]
    pub request_id: Option<String>,
    /// HTTP status code of the upstream response.
    #[serde(default)]
    pub code: u16,
    /// Upstream error message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Base64-encoded upstream body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Upstream response headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<EnvelopeHeader>,
}
