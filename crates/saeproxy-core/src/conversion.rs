//! Mapping between `SAEAPIServer` records and backing secrets.
//!
//! A record is stored as a secret in the storage namespace:
//!
//! | Secret field | Source |
//! |---|---|
//! | `data.accessKeyId` | `spec.accessKeyId` |
//! | `data.accessKeySecret` | `spec.accessKeySecret` |
//! | `labels[sae.alibaba-cloud.oam.dev/apiserver]` | `"true"` |
//! | `labels[sae.alibaba-cloud.oam.dev/apiserver-region]` | `spec.region` or the default |
//!
//! Secrets also carry the cluster-gateway metadata (`endpoint`, loopback
//! credential, credential-type label) so the gateway can reach the proxy
//! sub-resource of the record.

use std::collections::BTreeMap;

use saeproxy_model::api;
use saeproxy_model::error::{ProxyError, ProxyResult};
use saeproxy_model::types::{ApiServer, ApiServerSpec, ObjectMeta, Secret};

use crate::config::{LoopbackCredential, ProxyConfig};
use crate::store::LabelSelector;

/// Label marking secrets managed by this server.
pub const LABEL_API_SERVER: &str = "sae.alibaba-cloud.oam.dev/apiserver";
/// Label carrying the record region.
pub const LABEL_REGION: &str = "sae.alibaba-cloud.oam.dev/apiserver-region";
/// Cluster-gateway credential type label.
pub const LABEL_CREDENTIAL_TYPE: &str = "cluster.core.oam.dev/cluster-credential-type";

/// Secret data key of the access key id.
pub const DATA_ACCESS_KEY_ID: &str = "accessKeyId";
/// Secret data key of the access key secret.
pub const DATA_ACCESS_KEY_SECRET: &str = "accessKeySecret";
/// Secret data key of the loopback endpoint.
pub const DATA_ENDPOINT: &str = "endpoint";
/// Secret data key of the loopback client certificate.
pub const DATA_TLS_CERT: &str = "tls.crt";
/// Secret data key of the loopback client key.
pub const DATA_TLS_KEY: &str = "tls.key";
/// Secret data key of the loopback bearer token.
pub const DATA_TOKEN: &str = "token";

/// Everything needed to turn a record into a secret.
#[derive(Debug, Clone)]
pub struct SecretContext {
    /// Namespace of the backing secrets.
    pub namespace: String,
    /// Externally reachable base URL of this server.
    pub server_address: String,
    /// Credential the gateway presents on the loopback endpoint.
    pub loopback: Option<LoopbackCredential>,
}

impl SecretContext {
    /// Build a context from configuration and an already loaded loopback
    /// credential.
    #[must_use]
    pub fn new(config: &ProxyConfig, loopback: Option<LoopbackCredential>) -> Self {
        Self {
            namespace: config.storage_namespace.clone(),
            server_address: config.server_address.clone(),
            loopback,
        }
    }

    /// Loopback endpoint the gateway uses to reach `name`.
    #[must_use]
    pub fn endpoint(&self, name: &str) -> String {
        format!(
            "{}{}/",
            self.server_address.trim_end_matches('/'),
            api::proxy_path(name)
        )
    }
}

/// Selector matching every managed secret.
#[must_use]
pub fn managed_selector() -> LabelSelector {
    LabelSelector::default().with(LABEL_API_SERVER, "true")
}

/// Reject records that cannot be stored.
pub fn validate(server: &ApiServer) -> ProxyResult<()> {
    let name = server.name();
    if !api::is_dns_label(name) {
        return Err(ProxyError::validation(format!(
            "metadata.name: Invalid value: \"{name}\": must be a lowercase RFC 1123 label"
        )));
    }
    if server.spec.access_key_id.is_empty() {
        return Err(ProxyError::validation("spec.accessKeyId: Required value"));
    }
    if server.spec.access_key_secret.is_empty() {
        return Err(ProxyError::validation("spec.accessKeySecret: Required value"));
    }
    Ok(())
}

/// Convert a record into its backing secret.
///
/// Store-assigned metadata (`uid`, `resourceVersion`, `creationTimestamp`)
/// is carried over so updates keep their optimistic concurrency token.
#[must_use]
pub fn to_secret(server: &ApiServer, ctx: &SecretContext) -> Secret {
    let mut metadata = server.metadata.clone();
    metadata.namespace = Some(ctx.namespace.clone());
    metadata
        .labels
        .insert(LABEL_API_SERVER.to_owned(), "true".to_owned());
    metadata.labels.insert(
        LABEL_REGION.to_owned(),
        server.spec.region_or_default().to_owned(),
    );

    let mut data = BTreeMap::new();
    data.insert(
        DATA_ACCESS_KEY_ID.to_owned(),
        server.spec.access_key_id.clone().into_bytes(),
    );
    data.insert(
        DATA_ACCESS_KEY_SECRET.to_owned(),
        server.spec.access_key_secret.clone().into_bytes(),
    );
    data.insert(
        DATA_ENDPOINT.to_owned(),
        ctx.endpoint(server.name()).into_bytes(),
    );

    match &ctx.loopback {
        Some(credential @ LoopbackCredential::Certificate { cert, key }) => {
            data.insert(DATA_TLS_CERT.to_owned(), cert.clone());
            data.insert(DATA_TLS_KEY.to_owned(), key.clone());
            metadata.labels.insert(
                LABEL_CREDENTIAL_TYPE.to_owned(),
                credential.credential_type().to_owned(),
            );
        }
        Some(credential @ LoopbackCredential::Token(token)) => {
            data.insert(DATA_TOKEN.to_owned(), token.clone().into_bytes());
            metadata.labels.insert(
                LABEL_CREDENTIAL_TYPE.to_owned(),
                credential.credential_type().to_owned(),
            );
        }
        None => {
            metadata.labels.remove(LABEL_CREDENTIAL_TYPE);
        }
    }

    Secret { metadata, data }
}

/// Convert a backing secret into a record.
///
/// Fails with `ValidationError` when the secret is not managed by this
/// server or lacks either access key entry.
pub fn from_secret(secret: &Secret) -> ProxyResult<ApiServer> {
    let name = &secret.metadata.name;
    if secret.metadata.label(LABEL_API_SERVER) != Some("true") {
        return Err(ProxyError::validation(format!(
            "secret {name} is not a SAEAPIServer"
        )));
    }
    let (Some(ak), Some(sk)) = (
        secret.get(DATA_ACCESS_KEY_ID),
        secret.get(DATA_ACCESS_KEY_SECRET),
    ) else {
        return Err(ProxyError::validation(format!(
            "accessKey not found in secret {name}"
        )));
    };

    let region = secret
        .metadata
        .label(LABEL_REGION)
        .filter(|r| !r.is_empty())
        .unwrap_or(api::DEFAULT_REGION)
        .to_owned();

    let mut labels = secret.metadata.labels.clone();
    labels.remove(LABEL_API_SERVER);
    labels.remove(LABEL_REGION);
    labels.remove(LABEL_CREDENTIAL_TYPE);

    let metadata = ObjectMeta {
        namespace: None,
        labels,
        ..secret.metadata.clone()
    };
    let spec = ApiServerSpec {
        access_key_id: String::from_utf8_lossy(ak).into_owned(),
        access_key_secret: String::from_utf8_lossy(sk).into_owned(),
        region,
    };
    Ok(ApiServer::new(metadata, spec))
}
