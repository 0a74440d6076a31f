//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the RPC orchestrator and the port interfaces it
//! drives. Nothing here knows about tonic messages or sockets: inbound
//! streams and outbound channels carry domain values, and the gRPC adapter
//! in the infrastructure layer translates at the edge.

/// Per-call cancellation and deadline signal.
pub mod context;

/// Port interfaces for the catalog, rating and image stores.
pub mod ports;

/// The laptop service orchestrating the four call patterns.
pub mod services;
