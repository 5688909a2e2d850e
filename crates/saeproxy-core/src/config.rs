//! Proxy configuration.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while materializing configuration that lives outside the
/// environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A loopback credential file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    ReadFile {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Only one half of the loopback certificate pair is configured.
    #[error("LOOPBACK_CERT_FILE and LOOPBACK_KEY_FILE must be set together")]
    IncompleteCertificate,
}

/// Credential the cluster gateway presents when calling back into this
/// server through the proxy endpoint.
#[derive(Clone, PartialEq, Eq)]
pub enum LoopbackCredential {
    /// Client certificate and key, PEM encoded.
    Certificate {
        /// `tls.crt`.
        cert: Vec<u8>,
        /// `tls.key`.
        key: Vec<u8>,
    },
    /// Bearer token.
    Token(String),
}

impl LoopbackCredential {
    /// Value of the `cluster.core.oam.dev/cluster-credential-type` label.
    #[must_use]
    pub fn credential_type(&self) -> &'static str {
        match self {
            Self::Certificate { .. } => "X509Certificate",
            Self::Token(_) => "ServiceAccountToken",
        }
    }
}

impl fmt::Debug for LoopbackCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Certificate { .. } => f.write_str("Certificate(<redacted>)"),
            Self::Token(_) => f.write_str("Token(<redacted>)"),
        }
    }
}

/// Proxy server configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Listen address of the HTTP server.
    pub gateway_listen: String,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Namespace holding the backing secrets.
    pub storage_namespace: String,
    /// Externally reachable base URL of this server.
    pub server_address: String,
    /// Deadline of a single proxied call.
    pub proxy_timeout: Duration,
    /// SAE endpoint host template; `{region}` is substituted.
    pub sae_endpoint: String,
    /// Scheme used to reach the SAE endpoint.
    pub sae_scheme: String,
    /// Reuse vendor clients across requests.
    pub client_cache: bool,
    /// Loopback bearer token.
    pub loopback_token: Option<String>,
    /// Loopback client certificate file.
    pub loopback_cert_file: Option<PathBuf>,
    /// Loopback client key file.
    pub loopback_key_file: Option<PathBuf>,
}

impl ProxyConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            gateway_listen: env_string("GATEWAY_LISTEN", defaults.gateway_listen),
            log_level: env_string("LOG_LEVEL", defaults.log_level),
            storage_namespace: env_string("STORAGE_NAMESPACE", defaults.storage_namespace),
            server_address: env_string("SERVER_ADDRESS", defaults.server_address),
            proxy_timeout: env::var("PROXY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map_or(defaults.proxy_timeout, Duration::from_secs),
            sae_endpoint: env_string("SAE_ENDPOINT", defaults.sae_endpoint),
            sae_scheme: env_string("SAE_SCHEME", defaults.sae_scheme),
            client_cache: env_bool("CLIENT_CACHE", defaults.client_cache),
            loopback_token: env::var("LOOPBACK_TOKEN").ok().filter(|v| !v.is_empty()),
            loopback_cert_file: env::var("LOOPBACK_CERT_FILE").ok().map(PathBuf::from),
            loopback_key_file: env::var("LOOPBACK_KEY_FILE").ok().map(PathBuf::from),
        }
    }

    /// Load the loopback credential, if one is configured.
    ///
    /// A certificate pair takes precedence over a token.
    pub fn loopback_credential(&self) -> Result<Option<LoopbackCredential>, ConfigError> {
        match (&self.loopback_cert_file, &self.loopback_key_file) {
            (Some(cert), Some(key)) => Ok(Some(LoopbackCredential::Certificate {
                cert: read_file(cert)?,
                key: read_file(key)?,
            })),
            (None, None) => Ok(self.loopback_token.clone().map(LoopbackCredential::Token)),
            _ => Err(ConfigError::IncompleteCertificate),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            gateway_listen: "0.0.0.0:8080".to_owned(),
            log_level: "info".to_owned(),
            storage_namespace: "vela-system".to_owned(),
            server_address: "http://127.0.0.1:8080".to_owned(),
            proxy_timeout: Duration::from_secs(60),
            sae_endpoint: "sae.{region}.aliyuncs.com".to_owned(),
            sae_scheme: "https".to_owned(),
            client_cache: true,
            loopback_token: None,
            loopback_cert_file: None,
            loopback_key_file: None,
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

fn env_string(key: &str, default: String) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}
