//! Vendor client cache.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use saeproxy_auth::AccessKey;
use saeproxy_model::error::ProxyResult;

use crate::client::{ClientFactory, VendorClient};

struct CachedClient {
    key: AccessKey,
    client: Arc<dyn VendorClient>,
}

/// [`ClientFactory`] that reuses clients keyed by `(region, access key id)`.
///
/// A cached client is only returned when the full credential matches, so a
/// rotated secret builds a fresh client.
pub struct CachingClientFactory<F> {
    inner: F,
    clients: DashMap<(String, String), CachedClient>,
}

impl<F: std::fmt::Debug> std::fmt::Debug for CachingClientFactory<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingClientFactory")
            .field("inner", &self.inner)
            .field("cached", &self.clients.len())
            .finish()
    }
}

impl<F: ClientFactory> CachingClientFactory<F> {
    /// Wrap `inner` with a cache.
    #[must_use]
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            clients: DashMap::new(),
        }
    }

    /// Number of cached clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl<F: ClientFactory> ClientFactory for CachingClientFactory<F> {
    fn client(&self, region: &str, key: &AccessKey) -> ProxyResult<Arc<dyn VendorClient>> {
        let cache_key = (region.to_owned(), key.id().to_owned());
        if let Some(cached) = self.clients.get(&cache_key) {
            if cached.key == *key {
                return Ok(Arc::clone(&cached.client));
            }
        }

        let client = self.inner.client(region, key)?;
        debug!(region = %region, access_key_id = %key.id(), "Caching SAE client");
        self.clients.insert(
            cache_key,
            CachedClient {
                key: key.clone(),
                client: Arc::clone(&client),
            },
        );
        Ok(client)
    }
}
