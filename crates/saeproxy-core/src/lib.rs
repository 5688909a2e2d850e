//! Credential registry, secret store and SAE vendor client.
//!
//! - [`config`] - environment-driven configuration
//! - [`store`] - the [`SecretStore`] trait and its in-memory implementation
//! - [`conversion`] - mapping between `SAEAPIServer` records and secrets
//! - [`registry`] - CRUD over `SAEAPIServer` records backed by a secret store
//! - [`client`] - signed SAE `VirtualServerProxy` client and client factory
//! - [`cache`] - vendor client cache keyed by region and access key id

pub mod cache;
pub mod client;
pub mod config;
pub mod conversion;
pub mod registry;
pub mod store;

pub use cache::CachingClientFactory;
pub use client::{ClientFactory, PopClient, PopClientFactory, VendorClient};
pub use config::{ConfigError, LoopbackCredential, ProxyConfig};
pub use conversion::SecretContext;
pub use registry::ApiServerRegistry;
pub use store::{InMemorySecretStore, LabelSelector, SecretStore};
