//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for health checks, catalog statistics, and Prometheus metrics.
//! Used by container orchestrators, load balancers, and monitoring systems.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status with store sizes
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe (fails once shutdown starts)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::LaptopService;
use crate::infrastructure::metrics::{get_metrics_handle, set_laptops_stored};

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Store sizes.
    pub catalog: CatalogStatus,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Serving calls.
    Healthy,
    /// Shutdown has started; in-flight calls are draining.
    Draining,
}

/// Store sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogStatus {
    /// Laptops in the catalog.
    pub laptops: usize,
    /// Laptops with at least one rating.
    pub rated_laptops: usize,
    /// Images stored.
    pub images: usize,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    service: Arc<LaptopService>,
    shutdown: CancellationToken,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(version: String, service: Arc<LaptopService>, shutdown: CancellationToken) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            service,
            shutdown,
        }
    }

    fn status(&self) -> HealthStatus {
        if self.shutdown.is_cancelled() {
            HealthStatus::Draining
        } else {
            HealthStatus::Healthy
        }
    }

    fn catalog(&self) -> CatalogStatus {
        CatalogStatus {
            laptops: self.service.laptops().len(),
            rated_laptops: self.service.ratings().len(),
            images: self.service.images().len(),
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Health server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

/// Routes served by the health server.
pub fn router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    (StatusCode::OK, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    match state.status() {
        HealthStatus::Healthy => (StatusCode::OK, "READY"),
        HealthStatus::Draining => (StatusCode::SERVICE_UNAVAILABLE, "NOT READY"),
    }
}

async fn metrics_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            // Gauge is sampled at scrape time.
            set_laptops_stored(state.service.laptops().len());
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    HealthResponse {
        status: state.status(),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        catalog: state.catalog(),
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::application::context::CallContext;
    use crate::infrastructure::store::{InMemoryImageStore, InMemoryLaptopStore, InMemoryRatingStore};
    use crate::sample;

    fn state() -> (Arc<HealthServerState>, Arc<LaptopService>, CancellationToken) {
        let service = Arc::new(LaptopService::new(
            Arc::new(InMemoryLaptopStore::new()),
            Arc::new(InMemoryRatingStore::new()),
            Arc::new(InMemoryImageStore::new()),
        ));
        let shutdown = CancellationToken::new();
        let state = Arc::new(HealthServerState::new(
            "0.0.0-test".to_string(),
            Arc::clone(&service),
            shutdown.clone(),
        ));
        (state, service, shutdown)
    }

    async fn get(state: Arc<HealthServerState>, uri: &str) -> (StatusCode, String) {
        let response = router(state)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Draining).unwrap(),
            "\"draining\""
        );
    }

    #[tokio::test]
    async fn liveness_is_ok() {
        let (state, _, _) = state();
        let (status, body) = get(state, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn health_reports_store_sizes() {
        let (state, service, _) = state();
        service
            .create_laptop(&CallContext::default(), Some(sample::new_laptop()))
            .unwrap();
        service
            .create_laptop(&CallContext::default(), Some(sample::new_laptop()))
            .unwrap();

        let (status, body) = get(state, "/health").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["version"], "0.0.0-test");
        assert_eq!(json["catalog"]["laptops"], 2);
        assert_eq!(json["catalog"]["rated_laptops"], 0);
        assert_eq!(json["catalog"]["images"], 0);
    }

    #[tokio::test]
    async fn readiness_fails_after_shutdown() {
        let (state, _, shutdown) = state();

        let (status, _) = get(Arc::clone(&state), "/readyz").await;
        assert_eq!(status, StatusCode::OK);

        shutdown.cancel();

        let (status, body) = get(Arc::clone(&state), "/readyz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "NOT READY");

        let (_, body) = get(state, "/health").await;
        assert!(body.contains("\"draining\""));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (state, _, _) = state();
        let (status, _) = get(state, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
