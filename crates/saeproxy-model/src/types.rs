//! Resource types exposed over the API and persisted in the secret store.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api;

/// Object metadata shared by every resource.
///
/// A subset of Kubernetes `ObjectMeta`; unknown fields are ignored on input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Unique name within the collection.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Namespace, only set on secrets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Store-assigned unique id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Store-assigned version used for optimistic concurrency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    /// Metadata carrying only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Look up a label value.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Specification of an `SAEAPIServer`: the target region and access key pair.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiServerSpec {
    /// Access key id.
    #[serde(default)]
    pub access_key_id: String,
    /// Access key secret. Never logged.
    #[serde(default)]
    pub access_key_secret: String,
    /// Region of the SAE endpoint. Empty means [`api::DEFAULT_REGION`].
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,
}

impl ApiServerSpec {
    /// The configured region, falling back to the default one.
    #[must_use]
    pub fn region_or_default(&self) -> &str {
        if self.region.is_empty() {
            api::DEFAULT_REGION
        } else {
            &self.region
        }
    }
}

impl fmt::Debug for ApiServerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiServerSpec")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

/// The `SAEAPIServer` resource: one remote SAE endpoint credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiServer {
    /// `group/version` of the resource.
    #[serde(default)]
    pub api_version: String,
    /// Kind of the resource.
    #[serde(default)]
    pub kind: String,
    /// Metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Credential and region.
    #[serde(default)]
    pub spec: ApiServerSpec,
}

impl ApiServer {
    /// Create a resource with type metadata filled in.
    #[must_use]
    pub fn new(metadata: ObjectMeta, spec: ApiServerSpec) -> Self {
        Self {
            api_version: api::group_version(),
            kind: api::KIND.to_owned(),
            metadata,
            spec,
        }
    }

    /// Name of the resource.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// List metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    /// Version of the list snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

/// A list of [`ApiServer`] resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiServerList {
    /// `group/version` of the list.
    pub api_version: String,
    /// Kind of the list.
    pub kind: String,
    /// List metadata.
    pub metadata: ListMeta,
    /// Items.
    pub items: Vec<ApiServer>,
}

impl ApiServerList {
    /// Create a list with type metadata filled in.
    #[must_use]
    pub fn new(items: Vec<ApiServer>) -> Self {
        Self {
            api_version: api::group_version(),
            kind: api::LIST_KIND.to_owned(),
            metadata: ListMeta::default(),
            items,
        }
    }
}

/// An opaque secret in the backing store.
///
/// Data values are raw bytes; the store never interprets them.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret {
    /// Metadata; `namespace` is always set for stored secrets.
    pub metadata: ObjectMeta,
    /// Secret payload.
    pub data: BTreeMap<String, Vec<u8>>,
}

impl Secret {
    /// Look up a data entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.data.get(key).map(Vec::as_slice)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("metadata", &self.metadata)
            .field("data", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Options of a single proxy connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyOptions {
    /// Target path on the remote API server.
    pub path: String,
    /// Whether `path` was taken from the `path` query parameter.
    pub from_query: bool,
}

/// A Kubernetes-style `Status` object used for error responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// Always `Status`.
    pub kind: String,
    /// Always `v1`.
    pub api_version: String,
    /// Empty list metadata.
    pub metadata: ListMeta,
    /// `Success` or `Failure`.
    pub status: String,
    /// Human readable description.
    pub message: String,
    /// Machine readable reason, e.g. `NotFound`.
    pub reason: String,
    /// HTTP status code.
    pub code: u16,
}

impl Status {
    /// Build a failure status.
    #[must_use]
    pub fn failure(message: impl Into<String>, reason: impl Into<String>, code: u16) -> Self {
        Self {
            kind: "Status".to_owned(),
            api_version: "v1".to_owned(),
            metadata: ListMeta::default(),
            status: "Failure".to_owned(),
            message: message.into(),
            reason: reason.into(),
            code,
        }
    }
}

/// One entry of an [`ApiResourceList`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResource {
    /// Plural name, or `<plural>/<subresource>`.
    pub name: String,
    /// Singular name.
    pub singular_name: String,
    /// Whether the resource is namespaced.
    pub namespaced: bool,
    /// Kind served at this path.
    pub kind: String,
    /// Supported verbs.
    pub verbs: Vec<String>,
}

/// Discovery document for the served group version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResourceList {
    /// Always `APIResourceList`.
    pub kind: String,
    /// Always `v1`.
    pub api_version: String,
    /// `group/version` being described.
    pub group_version: String,
    /// Served resources.
    pub resources: Vec<ApiResource>,
}

impl ApiResourceList {
    /// Discovery document for `SAEAPIServer` and its proxy sub-resource.
    #[must_use]
    pub fn served() -> Self {
        let verbs = |v: &[&str]| v.iter().map(|s| (*s).to_owned()).collect();
        Self {
            kind: "APIResourceList".to_owned(),
            api_version: "v1".to_owned(),
            group_version: api::group_version(),
            resources: vec![
                ApiResource {
                    name: api::RESOURCE.to_owned(),
                    singular_name: api::SINGULAR.to_owned(),
                    namespaced: false,
                    kind: api::KIND.to_owned(),
                    verbs: verbs(&["create", "delete", "get", "list", "patch", "update"]),
                },
                ApiResource {
                    name: format!("{}/{}", api::RESOURCE, api::PROXY_SUBRESOURCE),
                    singular_name: String::new(),
                    namespaced: false,
                    kind: api::KIND.to_owned(),
                    verbs: verbs(&["create", "delete", "get", "patch", "update"]),
                },
            ],
        }
    }
}
