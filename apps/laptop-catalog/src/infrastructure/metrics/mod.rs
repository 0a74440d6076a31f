//! Prometheus Metrics Module
//!
//! Exposes catalog metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Calls**: Completed calls by method and status code, and their latency
//! - **Catalog**: Stored laptops, search matches streamed
//! - **Uploads**: Image bytes accepted
//! - **Ratings**: Ratings processed
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tonic::Code;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Idempotent: later calls return the handle created by the first. If another
/// global recorder is already installed, the returned handle renders nothing.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if let Err(e) = metrics::set_global_recorder(recorder) {
                tracing::warn!(error = %e, "Prometheus recorder not installed");
            }

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Call counters
    describe_counter!(
        "laptop_catalog_rpc_total",
        "Completed calls by method and gRPC status code"
    );
    describe_histogram!(
        "laptop_catalog_rpc_duration_seconds",
        "Call duration from first byte to final status"
    );

    // Catalog
    describe_gauge!(
        "laptop_catalog_laptops_stored",
        "Number of laptops in the catalog"
    );
    describe_counter!(
        "laptop_catalog_search_matches_total",
        "Total laptops streamed to search clients"
    );

    // Uploads and ratings
    describe_counter!(
        "laptop_catalog_image_bytes_total",
        "Total image bytes accepted by uploads"
    );
    describe_counter!(
        "laptop_catalog_ratings_total",
        "Total ratings processed"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric labels for call methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Unary create.
    CreateLaptop,
    /// Server-streaming search.
    SearchLaptop,
    /// Client-streaming image upload.
    UploadImage,
    /// Bidirectional rating.
    RateLaptop,
}

impl Method {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateLaptop => "create_laptop",
            Self::SearchLaptop => "search_laptop",
            Self::UploadImage => "upload_image",
            Self::RateLaptop => "rate_laptop",
        }
    }
}

/// Label value for a gRPC status code.
#[must_use]
pub const fn code_label(code: Code) -> &'static str {
    match code {
        Code::Ok => "ok",
        Code::Cancelled => "cancelled",
        Code::Unknown => "unknown",
        Code::InvalidArgument => "invalid_argument",
        Code::DeadlineExceeded => "deadline_exceeded",
        Code::NotFound => "not_found",
        Code::AlreadyExists => "already_exists",
        Code::PermissionDenied => "permission_denied",
        Code::ResourceExhausted => "resource_exhausted",
        Code::FailedPrecondition => "failed_precondition",
        Code::Aborted => "aborted",
        Code::OutOfRange => "out_of_range",
        Code::Unimplemented => "unimplemented",
        Code::Internal => "internal",
        Code::Unavailable => "unavailable",
        Code::DataLoss => "data_loss",
        Code::Unauthenticated => "unauthenticated",
    }
}

/// Record a completed call.
pub fn record_rpc(method: Method, code: Code, duration: Duration) {
    counter!(
        "laptop_catalog_rpc_total",
        "method" => method.as_str(),
        "code" => code_label(code)
    )
    .increment(1);
    histogram!(
        "laptop_catalog_rpc_duration_seconds",
        "method" => method.as_str()
    )
    .record(duration.as_secs_f64());
}

/// Update the stored laptop count.
#[allow(clippy::cast_precision_loss)]
pub fn set_laptops_stored(count: usize) {
    gauge!("laptop_catalog_laptops_stored").set(count as f64);
}

/// Record laptops streamed by one search.
pub fn record_search_matches(count: u64) {
    counter!("laptop_catalog_search_matches_total").increment(count);
}

/// Record bytes accepted by one upload.
pub fn record_image_bytes(bytes: u32) {
    counter!("laptop_catalog_image_bytes_total").increment(u64::from(bytes));
}

/// Record ratings processed by one rating stream.
pub fn record_ratings(count: u32) {
    counter!("laptop_catalog_ratings_total").increment(u64::from(count));
}

// =============================================================================
// Tests
// =============================================================================
