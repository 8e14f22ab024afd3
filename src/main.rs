//! cart-cache service
//!
//! ```text
//!   Client ──▶ http (axum) ──▶ repository ──▶ CacheClient ──▶ Connector ──▶ Redis
//!                                               │
//!                                 timeout + circuit breaker
//!
//!   Operator ──▶ admin (bearer auth) ──▶ CacheClient (snapshot, keys, info, flush)
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use cart_cache::admin::setup_admin_router;
use cart_cache::cache::{CacheClient, Connector, MemoryConnector, RedisConnector};
use cart_cache::config::{load_config, StoreBackend, StoreConfig};
use cart_cache::http::{AppState, HttpServer};
use cart_cache::lifecycle::{wait_for_signal, Shutdown};
use cart_cache::observability::{logging, metrics};
use cart_cache::repository::product::{seed_catalog, ProductRepository};

#[derive(Parser)]
#[command(name = "cart-cache")]
#[command(about = "Cart and catalog service backed by a resilient cache", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "CART_CACHE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "cart-cache starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = ?config.store.backend,
        timeout_ms = config.cache.timeout_ms,
        failure_threshold = config.cache.failure_threshold,
        cooldown_ms = config.cache.cooldown_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let connector = connect(&config.store).await?;
    let cache = Arc::new(CacheClient::new(connector, config.cache.client_config()));
    let products = ProductRepository::new(
        cache.clone(),
        seed_catalog(),
        config.catalog.product_ttl_secs,
        config.catalog.max_page_size,
    );
    let state = AppState::new(cache, products);

    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(state.clone(), &config.listener);
    tasks.push(tokio::spawn(server.run(listener, shutdown.subscribe())));

    if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");
        let router = setup_admin_router(state, &config.admin.api_key);
        let mut stop = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            axum::serve(admin_listener, router)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await
        }));
    }

    let signal = wait_for_signal().await;
    tracing::info!(signal, "Shutdown signal received");
    shutdown.trigger();

    for task in tasks {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Server exited with error"),
            Err(e) => tracing::error!(error = %e, "Server task panicked"),
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn connect(store: &StoreConfig) -> Result<Arc<dyn Connector>, Box<dyn std::error::Error>> {
    match store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory cache store; data is lost on restart");
            Ok(Arc::new(MemoryConnector::new()))
        }
        StoreBackend::Redis => {
            let url = store.redis_url()?;
            let deadline = Duration::from_secs(store.connect_timeout_secs);
            tracing::info!(url = %store.redacted_url(), "Connecting to Redis");

            let connector = tokio::time::timeout(deadline, RedisConnector::connect(url.as_str()))
                .await
                .map_err(|_| format!("timed out connecting to {} after {:?}", store.redacted_url(), deadline))??;
            tracing::info!(url = %store.redacted_url(), "Connected to Redis");
            Ok(Arc::new(connector))
        }
    }
}
