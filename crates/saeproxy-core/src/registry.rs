//! CRUD over `SAEAPIServer` records backed by a [`SecretStore`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use saeproxy_model::error::{ProxyError, ProxyErrorCode, ProxyResult};
use saeproxy_model::types::{ApiServer, ApiServerList};

use crate::conversion::{self, SecretContext};
use crate::store::SecretStore;

/// Registry of `SAEAPIServer` records.
#[derive(Clone)]
pub struct ApiServerRegistry {
    store: Arc<dyn SecretStore>,
    ctx: Arc<SecretContext>,
}

impl std::fmt::Debug for ApiServerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiServerRegistry")
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

impl ApiServerRegistry {
    /// Create a registry over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SecretStore>, ctx: SecretContext) -> Self {
        Self {
            store,
            ctx: Arc::new(ctx),
        }
    }

    /// Fetch a record.
    pub async fn get(&self, name: &str) -> ProxyResult<ApiServer> {
        let secret = self.store.get(&self.ctx.namespace, name).await?;
        conversion::from_secret(&secret)
    }

    /// Resolve the record a proxy request targets.
    ///
    /// Any failure, including a malformed record, is reported as
    /// `TargetNotFoundError`.
    pub async fn resolve(&self, name: &str) -> ProxyResult<ApiServer> {
        self.get(name).await.map_err(|e| {
            if e.code != ProxyErrorCode::NotFound {
                warn!(name = %name, error = %e, "Proxy target is unusable");
            }
            ProxyError::target_not_found(name)
        })
    }

    /// List every record.
    ///
    /// A single malformed managed secret fails the whole listing.
    pub async fn list(&self) -> ProxyResult<ApiServerList> {
        let secrets = self
            .store
            .list(&self.ctx.namespace, &conversion::managed_selector())
            .await?;
        let items = secrets
            .iter()
            .map(conversion::from_secret)
            .collect::<ProxyResult<Vec<_>>>()?;
        Ok(ApiServerList::new(items))
    }

    /// Create a record.
    pub async fn create(&self, server: ApiServer) -> ProxyResult<ApiServer> {
        conversion::validate(&server)?;
        let mut server = server;
        server.metadata.uid = None;
        server.metadata.resource_version = None;
        server.metadata.creation_timestamp = None;

        let secret = conversion::to_secret(&server, &self.ctx);
        let stored = self.store.create(secret).await?;
        info!(name = %server.name(), region = %server.spec.region_or_default(), "Created SAEAPIServer");
        conversion::from_secret(&stored)
    }

    /// Replace a record.
    ///
    /// An empty body name takes the path name. A different one is rejected.
    pub async fn update(&self, name: &str, server: ApiServer) -> ProxyResult<ApiServer> {
        let mut server = server;
        if server.metadata.name.is_empty() {
            server.metadata.name = name.to_owned();
        } else if server.metadata.name != name {
            return Err(ProxyError::bad_request(format!(
                "the name of the object ({}) does not match the name on the URL ({name})",
                server.metadata.name
            )));
        }
        conversion::validate(&server)?;

        let current = self.store.get(&self.ctx.namespace, name).await?;
        server.metadata.uid.clone_from(&current.metadata.uid);
        server.metadata.creation_timestamp = current.metadata.creation_timestamp;

        let secret = conversion::to_secret(&server, &self.ctx);
        let stored = self.store.update(secret).await?;
        info!(name = %name, "Updated SAEAPIServer");
        conversion::from_secret(&stored)
    }

    /// Apply a JSON merge patch to a record.
    pub async fn patch(&self, name: &str, patch: &serde_json::Value) -> ProxyResult<ApiServer> {
        let current = self.get(name).await?;
        let mut doc = serde_json::to_value(&current)
            .map_err(|e| ProxyError::internal_error(format!("serialize record: {e}")))?;
        merge_patch(&mut doc, patch);
        let patched: ApiServer = serde_json::from_value(doc)
            .map_err(|e| ProxyError::bad_request(format!("invalid patch: {e}")))?;
        debug!(name = %name, "Applying merge patch");
        self.update(name, patched).await
    }

    /// Delete a record, returning it.
    pub async fn delete(&self, name: &str) -> ProxyResult<ApiServer> {
        let server = self.get(name).await?;
        self.store.delete(&self.ctx.namespace, name).await?;
        info!(name = %name, "Deleted SAEAPIServer");
        Ok(server)
    }
}

/// Apply an RFC 7386 JSON merge patch in place.
fn merge_patch(target: &mut serde_json::Value, patch: &serde_json::Value) {
    let serde_json::Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = serde_json::Value::Object(serde_json::Map::new());
    }
    if let serde_json::Value::Object(map) = target {
        for (key, value) in patch {
            if value.is_null() {
                map.remove(key);
            } else {
                merge_patch(
                    map.entry(key.clone()).or_insert(serde_json::Value::Null),
                    value,
                );
            }
        }
    }
}
