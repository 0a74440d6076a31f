//! Domain Layer - Catalog record types and pure business rules.
//!
//! The record types are protobuf messages that also derive `serde`, so the
//! same value is stored, sent over the wire and written to fixture files.
//! Nothing in this layer performs I/O or takes locks.

/// Laptop record and its nested specification messages.
pub mod laptop;

/// Search filter and the predicate evaluating it against a laptop.
pub mod filter;

/// Per-laptop rating aggregate.
pub mod rating;
