//! gRPC Adapter
//!
//! Exposes [`LaptopService`](crate::application::services::LaptopService)
//! as `catalog.v1.LaptopService`.
//!
//! # Architecture
//!
//! Each call:
//!
//! 1. Derives a call context from the shutdown token and the `grpc-timeout`
//!    header
//! 2. Converts inbound wire messages to the service's call values
//! 3. Runs the service method, in a spawned task for streaming responses
//! 4. Converts results and errors back to wire messages and statuses
//! 5. Cancels the call context when the client goes away

pub mod messages;
pub mod server;

// Allow clippy warnings and missing docs in generated code
#[allow(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/catalog.v1.LaptopService.rs"));
}

pub use proto::laptop_service_client::LaptopServiceClient;
pub use proto::laptop_service_server::LaptopServiceServer;
pub use server::LaptopServer;
