//! Laptop Catalog Server Binary
//!
//! Starts the laptop catalog gRPC service and its health endpoint.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin laptop-catalog
//! ```
//!
//! # Environment Variables
//!
//! - `LAPTOP_GRPC_PORT`: gRPC server port (default: 8080)
//! - `LAPTOP_HEALTH_PORT`: Health check HTTP port, 0 disables (default: 8081)
//! - `LAPTOP_IMAGE_DIR`: Folder for uploaded images (default: img)
//! - `LAPTOP_STREAM_BUFFER`: Responses buffered per streaming call (default: 64)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: laptop-catalog)
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use laptop_catalog::infrastructure::health::{HealthServer, HealthServerState};
use laptop_catalog::infrastructure::telemetry;
use laptop_catalog::{
    CatalogConfig, DiskImageStore, InMemoryLaptopStore, InMemoryRatingStore, LaptopServer,
    LaptopService, LaptopServiceServer, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting laptop catalog");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = CatalogConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Stores and orchestrator
    let service = Arc::new(LaptopService::new(
        Arc::new(InMemoryLaptopStore::new()),
        Arc::new(InMemoryRatingStore::new()),
        Arc::new(DiskImageStore::new(config.storage.image_dir.clone())),
    ));

    // Spawn health server
    if config.health_enabled() {
        let health_state = Arc::new(HealthServerState::new(
            env!("CARGO_PKG_VERSION").to_string(),
            Arc::clone(&service),
            shutdown_token.clone(),
        ));
        let health_server = HealthServer::new(
            config.server.health_port,
            health_state,
            shutdown_token.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = health_server.run().await {
                tracing::error!(error = %e, "Health server error");
            }
        });
    }

    // Spawn gRPC server
    let grpc_addr = SocketAddr::from(([0, 0, 0, 0], config.server.grpc_port));
    let grpc_server = LaptopServer::new(service, shutdown_token.clone(), config.stream.buffer);
    let grpc_service = LaptopServiceServer::new(grpc_server);
    let grpc_shutdown = shutdown_token.clone();

    let grpc_task = tokio::spawn(async move {
        tracing::info!(addr = %grpc_addr, "gRPC server listening");
        if let Err(e) = Server::builder()
            .add_service(grpc_service)
            .serve_with_shutdown(grpc_addr, grpc_shutdown.cancelled())
            .await
        {
            tracing::error!(error = %e, "gRPC server error");
        }
        tracing::info!("gRPC server stopped");
    });

    tracing::info!("Laptop catalog ready");

    await_shutdown(shutdown_token).await;

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, grpc_task).await.is_err() {
        tracing::warn!("Graceful shutdown timed out");
    }

    tracing::info!("Laptop catalog stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        for dir in cwd.ancestors().skip(1) {
            let env_path = dir.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &CatalogConfig) {
    tracing::info!(
        grpc_port = config.server.grpc_port,
        health_port = config.server.health_port,
        image_dir = %config.storage.image_dir.display(),
        stream_buffer = config.stream.buffer,
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
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
    }

    // Also cancels every in-flight call.
    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
