//! API group constants and resource path helpers.

/// API group served by this proxy.
pub const GROUP: &str = "sae.alibaba-cloud.oam.dev";

/// API version served by this proxy.
pub const VERSION: &str = "v1alpha1";

/// Plural resource name of [`crate::ApiServer`].
pub const RESOURCE: &str = "saeapiservers";

/// Singular resource name of [`crate::ApiServer`].
pub const SINGULAR: &str = "saeapiserver";

/// Kind of a single resource.
pub const KIND: &str = "SAEAPIServer";

/// Kind of a resource list.
pub const LIST_KIND: &str = "SAEAPIServerList";

/// Name of the proxy sub-resource.
pub const PROXY_SUBRESOURCE: &str = "proxy";

/// Prefix shared by every aggregated API group path.
pub const API_GROUP_PREFIX: &str = "/apis";

/// Region used when a record does not specify one.
pub const DEFAULT_REGION: &str = "cn-hangzhou";

/// `group/version` string used as `apiVersion`.
#[must_use]
pub fn group_version() -> String {
    format!("{GROUP}/{VERSION}")
}

/// Path of the resource collection, e.g. `/apis/<group>/<version>/saeapiservers`.
#[must_use]
pub fn collection_path() -> String {
    format!("{API_GROUP_PREFIX}/{GROUP}/{VERSION}/{RESOURCE}")
}

/// Path of the proxy sub-resource of a named record, without trailing slash.
#[must_use]
pub fn proxy_path(name: &str) -> String {
    format!("{}/{name}/{PROXY_SUBRESOURCE}", collection_path())
}

/// Whether `name` is a valid DNS-1123 label.
#[must_use]
pub fn is_dns_label(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > 63 {
        return false;
    }
    let valid = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    valid(&bytes[0])
        && valid(&bytes[bytes.len() - 1])
        && bytes.iter().all(|b| valid(b) || *b == b'-')
}
