//! Order Service Binary
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-service
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `SPOT_INSTRUMENT_ENDPOINT`: market validator URL
//!
//! ## Optional
//! - `ORDER_SERVICE_GRPC_PORT`: gRPC port (default: 50051)
//! - `ORDER_SERVICE_HEALTH_PORT`: health and metrics port (default: 8081)
//! - `ORDER_SIMULATOR_INTERVAL_SECS`: simulator tick (default: 30)
//! - `ORDER_SIMULATOR_FILL_PROBABILITY`: P(pending -> filled) (default: 0.5)
//! - `ORDER_STREAM_POLL_INTERVAL_SECS`: subscription poll (default: 5)
//! - `ORDER_STREAM_BUFFER`: subscription queue capacity (default: 10)
//! - `MARKETS_CACHE_ENABLED`, `MARKETS_CACHE_TTL_SECS`: markets cache
//! - `SPOT_INSTRUMENT_*`: client timeouts and retries
//! - `OTEL_ENABLED`, `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_SERVICE_NAME`
//! - `RUST_LOG`: log filter (default: `order_service=info`)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use order_service::application::ports::MarketValidatorPort;
use order_service::domain::OrderStatusWriter;
use order_service::infrastructure::telemetry;
use order_service::{
    CachedMarketValidator, HealthServer, HealthServerState, InMemoryMarketsCache,
    InMemoryOrderStore, OrderGrpcServer, OrderLifecycleService, RandomExecutionPolicy,
    ServiceConfig, SpotInstrumentClient, StatusSimulator, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Already installed is fine
    let _ = rustls::crypto::ring::default_provider().install_default();

    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting order service");

    if let Err(e) = init_metrics() {
        tracing::warn!(error = %e, "Prometheus recorder not installed, metrics disabled");
    }

    let config = ServiceConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Order store and lifecycle simulator
    let store = Arc::new(InMemoryOrderStore::new());
    let simulator = Arc::new(StatusSimulator::new(
        Arc::clone(&store) as Arc<dyn OrderStatusWriter>,
        Arc::new(RandomExecutionPolicy::new(config.simulator.fill_probability)),
        config.simulator.interval,
        shutdown_token.child_token(),
    ));

    // Market validation
    let spot_client = SpotInstrumentClient::connect_lazy(&config.spot_instrument)?;
    let markets: Arc<dyn MarketValidatorPort> = if config.cache.enabled {
        Arc::new(CachedMarketValidator::new(
            Arc::new(spot_client),
            Arc::new(InMemoryMarketsCache::new()),
            config.cache.ttl,
        ))
    } else {
        Arc::new(spot_client)
    };

    let lifecycle = Arc::new(OrderLifecycleService::new(
        store,
        markets,
        config.subscriptions,
    ));

    // Spawn simulator
    let simulator_task = {
        let simulator = Arc::clone(&simulator);
        tokio::spawn(async move { simulator.run().await })
    };

    // Spawn health server
    let health_addr: SocketAddr = config.server.health_addr().parse()?;
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        Arc::clone(&lifecycle),
        Arc::clone(&simulator),
    ));
    let health_server = HealthServer::new(health_addr, health_state, shutdown_token.clone());
    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    // Spawn gRPC server
    let grpc_addr: SocketAddr = config.server.grpc_addr().parse()?;
    let grpc_server = Arc::new(OrderGrpcServer::new(
        Arc::clone(&lifecycle),
        shutdown_token.clone(),
    ));
    let sync_service = grpc_server.sync_service();
    let stream_service = grpc_server.stream_service();
    let grpc_shutdown = shutdown_token.clone();

    let grpc_task = tokio::spawn(async move {
        tracing::info!(addr = %grpc_addr, "gRPC server listening");
        if let Err(e) = Server::builder()
            .add_service(sync_service)
            .add_service(stream_service)
            .serve_with_shutdown(grpc_addr, grpc_shutdown.clone().cancelled_owned())
            .await
        {
            tracing::error!(error = %e, "gRPC server error");
            grpc_shutdown.cancel();
        }
        tracing::info!("gRPC server stopped");
    });

    tracing::info!("Order service ready");

    await_shutdown(shutdown_token).await;

    let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        let _ = grpc_task.await;
        let _ = simulator_task.await;
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Shutdown timed out, exiting anyway"
        );
    }

    tracing::info!(
        stored_orders = lifecycle.stored_orders(),
        "Order service stopped"
    );
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &ServiceConfig) {
    tracing::info!(
        grpc_addr = %config.server.grpc_addr(),
        health_addr = %config.server.health_addr(),
        spot_instrument = %config.spot_instrument.endpoint,
        simulator_interval_secs = config.simulator.interval.as_secs(),
        fill_probability = config.simulator.fill_probability,
        poll_interval_secs = config.subscriptions.poll_interval.as_secs(),
        stream_buffer = config.subscriptions.buffer_capacity,
        markets_cache = config.cache.enabled,
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT), or for a component to
/// cancel the token itself.
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = shutdown_token.cancelled() => {
            tracing::warn!("Shutdown requested internally");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
