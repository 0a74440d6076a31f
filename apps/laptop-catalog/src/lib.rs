#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::cast_precision_loss
    )
)]

//! Laptop Catalog - gRPC Device Catalog Service
//!
//! A gRPC service keeping a volatile catalog of laptop records. One service
//! exposes four call patterns: unary creation, server-streamed search,
//! client-streamed image upload and bidirectional rating.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Record model and pure rules
//!   - `laptop`: Laptop record and nested specification messages
//!   - `filter`: Search filter and its predicate
//!   - `rating`: Per-laptop rating aggregate
//!
//! - **Application**: Orchestration and port definitions
//!   - `context`: Per-call cancellation and deadline
//!   - `ports`: Catalog, rating and image store interfaces
//!   - `services`: The four call state machines
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `store`: In-memory catalog and rating stores, image stores
//!   - `grpc`: tonic server adapter and wire messages
//!   - `config`: Environment configuration
//!   - `health`: Health check HTTP endpoint
//!   - `serializer`: Binary and JSON message files
//!
//! # Data Flow
//!
//! ```text
//!              ┌─────────────┐     ┌───────────────┐     ┌──────────────┐
//! Client ─────►│ LaptopServer│────►│ LaptopService │────►│ LaptopStore  │
//!   (tonic)    │  (adapter)  │     │ (state machs) │──┬─►│ RatingStore  │
//!        ◄─────│             │◄────│               │  └─►│ ImageStore   │
//!              └─────────────┘     └───────────────┘     └──────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Catalog record types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// Error taxonomy and mapping to gRPC statuses.
pub mod error;

/// Random sample records.
pub mod sample;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::filter::{Filter, matches};
pub use domain::laptop::{Laptop, Memory, MemoryUnit};
pub use domain::rating::Rating;

// Application
pub use application::context::{CallContext, Interrupted};
pub use application::ports::{ImageStore, ImageStoreError, LaptopStore, RatingStore, StoreError};
pub use application::services::{LaptopService, MAX_IMAGE_SIZE};

// Errors
pub use error::{ErrorCode, ServiceError};

// Stores
pub use infrastructure::store::{
    DiskImageStore, InMemoryImageStore, InMemoryLaptopStore, InMemoryRatingStore,
};

// Infrastructure config
pub use infrastructure::config::{CatalogConfig, ClientConfig, ConfigError};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// gRPC server and client (for integration tests)
pub use infrastructure::grpc::{LaptopServer, LaptopServiceClient, LaptopServiceServer, messages};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
