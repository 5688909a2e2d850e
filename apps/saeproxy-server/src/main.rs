//! SAE API server proxy.
//!
//! Serves the `saeapiservers` resource of `sae.alibaba-cloud.oam.dev/v1alpha1`
//! and forwards requests addressed to `<name>/proxy` to the SAE endpoint the
//! named record holds credentials for.
//!
//! # Usage
//!
//! ```text
//! GATEWAY_LISTEN=0.0.0.0:8080 saeproxy-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//! | `STORAGE_NAMESPACE` | `vela-system` | Namespace of the backing secrets |
//! | `SERVER_ADDRESS` | `http://127.0.0.1:8080` | Base URL written into secrets as the loopback endpoint |
//! | `PROXY_TIMEOUT_SECS` | `60` | Deadline of one vendor call |
//! | `SAE_ENDPOINT` | `sae.{region}.aliyuncs.com` | SAE endpoint template |
//! | `SAE_SCHEME` | `https` | SAE endpoint scheme |
//! | `CLIENT_CACHE` | `true` | Reuse vendor clients per region and access key |
//! | `LOOPBACK_TOKEN` | *(unset)* | Token written into secrets |
//! | `LOOPBACK_CERT_FILE` / `LOOPBACK_KEY_FILE` | *(unset)* | Client certificate written into secrets |

mod gateway;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use saeproxy_core::{
    ApiServerRegistry, CachingClientFactory, ClientFactory, InMemorySecretStore,
    PopClientFactory, ProxyConfig, SecretContext,
};
use saeproxy_http::{ApiServerProxy, ProxyHttpService, ProxyPathMatcher, ProxyRequestEscaper};

use crate::gateway::GatewayService;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the vendor client factory, cached unless disabled.
fn build_client_factory(config: &ProxyConfig) -> Result<Arc<dyn ClientFactory>> {
    let factory =
        PopClientFactory::from_config(config).context("failed to create SAE client factory")?;
    if config.client_cache {
        Ok(Arc::new(CachingClientFactory::new(factory)))
    } else {
        Ok(Arc::new(factory))
    }
}

/// Assemble the gateway from configuration.
fn build_gateway(config: &ProxyConfig) -> Result<GatewayService> {
    let loopback = config
        .loopback_credential()
        .context("failed to load loopback credential")?;
    if loopback.is_none() {
        warn!("no loopback credential configured, secrets will carry the endpoint only");
    }

    let ctx = SecretContext::new(config, loopback);
    let registry = ApiServerRegistry::new(Arc::new(InMemorySecretStore::new()), ctx);
    let proxy = ApiServerProxy::new(build_client_factory(config)?, config.proxy_timeout);
    let service = ProxyHttpService::new(registry, proxy);

    Ok(GatewayService::new(ProxyRequestEscaper::new(
        service,
        ProxyPathMatcher::default(),
    )))
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: GatewayService) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Probe `/healthz` on the running server.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;
    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /healthz HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.starts_with("HTTP/1.1 200") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ProxyConfig::from_env();

    // Handle --health-check flag for container health probes.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;

    let gateway = build_gateway(&config)?;

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        %addr,
        namespace = %config.storage_namespace,
        sae_endpoint = %config.sae_endpoint,
        proxy_timeout = ?config.proxy_timeout,
        client_cache = config.client_cache,
        version = VERSION,
        "starting SAE API server proxy",
    );

    serve(listener, gateway).await
}
