//! Backing secret store.
//!
//! `SAEAPIServer` records are persisted as opaque secrets in a single
//! namespace. The [`SecretStore`] trait is the seam between the registry and
//! the storage backend; [`InMemorySecretStore`] is the in-process backend.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use saeproxy_model::error::{ProxyError, ProxyResult};
use saeproxy_model::types::Secret;

/// Equality-based label selector. Every pair must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    required: BTreeMap<String, String>,
}

impl LabelSelector {
    /// Require `key=value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.required.insert(key.into(), value.into());
        self
    }

    /// Whether `labels` satisfy the selector.
    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.required
            .iter()
            .all(|(k, v)| labels.get(k).is_some_and(|actual| actual == v))
    }
}

/// Storage backend for secrets.
///
/// Implementations assign `uid`, `resourceVersion` and `creationTimestamp`
/// on create, and bump `resourceVersion` on update.
#[async_trait]
pub trait SecretStore: Send + Sync + 'static {
    /// Fetch a secret. Missing secrets are `NotFound`.
    async fn get(&self, namespace: &str, name: &str) -> ProxyResult<Secret>;

    /// List the secrets of a namespace matching `selector`, sorted by name.
    async fn list(&self, namespace: &str, selector: &LabelSelector) -> ProxyResult<Vec<Secret>>;

    /// Create a secret. Existing names are `AlreadyExists`.
    async fn create(&self, secret: Secret) -> ProxyResult<Secret>;

    /// Replace a secret. A stale `resourceVersion` is a `Conflict`.
    async fn update(&self, secret: Secret) -> ProxyResult<Secret>;

    /// Delete a secret, returning the removed value.
    async fn delete(&self, namespace: &str, name: &str) -> ProxyResult<Secret>;
}

type SecretKey = (String, String);

/// In-memory [`SecretStore`] keyed by `(namespace, name)`.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: DashMap<SecretKey, Secret>,
    revision: AtomicU64,
}

impl InMemorySecretStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored secrets across all namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    fn next_revision(&self) -> String {
        (self.revision.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }
}

fn key_of(secret: &Secret) -> ProxyResult<SecretKey> {
    let namespace = secret
        .metadata
        .namespace
        .clone()
        .filter(|ns| !ns.is_empty())
        .ok_or_else(|| ProxyError::internal_error("secret has no namespace"))?;
    Ok((namespace, secret.metadata.name.clone()))
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get(&self, namespace: &str, name: &str) -> ProxyResult<Secret> {
        self.secrets
            .get(&(namespace.to_owned(), name.to_owned()))
            .map(|r| r.value().clone())
            .ok_or_else(|| ProxyError::not_found(name))
    }

    async fn list(&self, namespace: &str, selector: &LabelSelector) -> ProxyResult<Vec<Secret>> {
        let mut secrets: Vec<Secret> = self
            .secrets
            .iter()
            .filter(|r| r.key().0 == namespace && selector.matches(&r.value().metadata.labels))
            .map(|r| r.value().clone())
            .collect();
        secrets.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(secrets)
    }

    async fn create(&self, mut secret: Secret) -> ProxyResult<Secret> {
        let key = key_of(&secret)?;
        match self.secrets.entry(key) {
            Entry::Occupied(e) => Err(ProxyError::already_exists(&e.key().1)),
            Entry::Vacant(e) => {
                secret.metadata.uid = Some(uuid::Uuid::new_v4().to_string());
                secret.metadata.resource_version = Some(self.next_revision());
                secret.metadata.creation_timestamp = Some(Utc::now());
                debug!(namespace = %e.key().0, name = %e.key().1, "Created secret");
                e.insert(secret.clone());
                Ok(secret)
            }
        }
    }

    async fn update(&self, mut secret: Secret) -> ProxyResult<Secret> {
        let key = key_of(&secret)?;
        match self.secrets.entry(key) {
            Entry::Vacant(e) => Err(ProxyError::not_found(&e.key().1)),
            Entry::Occupied(mut e) => {
                let current = e.get();
                if let Some(expected) = &secret.metadata.resource_version {
                    if current.metadata.resource_version.as_ref() != Some(expected) {
                        return Err(ProxyError::conflict(format!(
                            "Operation cannot be fulfilled on saeapiservers \"{}\": \
                             the object has been modified",
                            e.key().1
                        )));
                    }
                }
                secret.metadata.uid.clone_from(&current.metadata.uid);
                secret.metadata.creation_timestamp = current.metadata.creation_timestamp;
                secret.metadata.resource_version = Some(self.next_revision());
                debug!(namespace = %e.key().0, name = %e.key().1, "Updated secret");
                e.insert(secret.clone());
                Ok(secret)
            }
        }
    }

    async fn delete(&self, namespace: &str, name: &str) -> ProxyResult<Secret> {
        self.secrets
            .remove(&(namespace.to_owned(), name.to_owned()))
            .map(|(_, secret)| secret)
            .ok_or_else(|| ProxyError::not_found(name))
    }
}
