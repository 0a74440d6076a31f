//! Port Interfaces
//!
//! Defines the interfaces (ports) for the stores the orchestrator depends on,
//! following the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `LaptopStore`: Catalog of laptop records with copy-in/copy-out semantics
//! - `RatingStore`: Running rating aggregates per laptop
//! - `ImageStore`: Durable blob storage for uploaded images

use async_trait::async_trait;
use thiserror::Error;

use crate::application::context::{CallContext, Interrupted};
use crate::domain::filter::Filter;
use crate::domain::laptop::Laptop;
use crate::domain::rating::Rating;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised by the catalog and rating stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same id is already stored.
    #[error("record with id {0} already exists")]
    AlreadyExists(String),

    /// The scan stopped because the call was cancelled or timed out.
    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    /// The match callback could not hand a result downstream.
    #[error("cannot deliver search result: {0}")]
    Delivery(String),

    /// Any other store failure.
    #[error("store failure: {0}")]
    Internal(String),
}

/// Errors raised by the image blob store.
#[derive(Debug, Error)]
pub enum ImageStoreError {
    /// Filesystem failure.
    #[error("image I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The store refused the payload.
    #[error("image rejected: {0}")]
    Rejected(String),
}

// =============================================================================
// Ports
// =============================================================================

/// Callback invoked once per search match.
pub type MatchSink<'a> = dyn FnMut(Laptop) -> Result<(), StoreError> + 'a;

/// Port for the laptop catalog.
///
/// Implementations must never let a caller's value alias stored state: `save`
/// stores a copy and `find`/`search` return copies.
pub trait LaptopStore: Send + Sync {
    /// Store a copy of `laptop`, rejecting an id that is already present.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyExists`] for a duplicate id.
    fn save(&self, laptop: &Laptop) -> Result<(), StoreError>;

    /// Copy of the laptop with `id`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Store-level failures only; absence is not an error.
    fn find(&self, id: &str) -> Result<Option<Laptop>, StoreError>;

    /// Scan every stored laptop once, calling `found` with a copy of each
    /// match. `ctx` is checked before each candidate.
    ///
    /// # Errors
    ///
    /// [`StoreError::Interrupted`] when `ctx` fires, or whatever `found`
    /// returns.
    fn search(
        &self,
        ctx: &CallContext,
        filter: &Filter,
        found: &mut MatchSink<'_>,
    ) -> Result<(), StoreError>;

    /// Number of stored laptops.
    fn len(&self) -> usize;

    /// Whether the catalog is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Port for rating aggregates.
pub trait RatingStore: Send + Sync {
    /// Fold `score` into the aggregate for `laptop_id`, creating it when
    /// absent, and return a copy of the updated aggregate.
    ///
    /// # Errors
    ///
    /// Store-level failures only.
    fn add(&self, laptop_id: &str, score: f64) -> Result<Rating, StoreError>;

    /// Number of laptops with at least one rating.
    fn len(&self) -> usize;

    /// Whether no laptop has been rated.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Port for uploaded image blobs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist `data` for `laptop_id` and return the new image id.
    ///
    /// `image_type` is the declared extension, e.g. `.jpg`.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload cannot be stored.
    async fn save(
        &self,
        laptop_id: &str,
        image_type: &str,
        data: Vec<u8>,
    ) -> Result<String, ImageStoreError>;

    /// Number of images stored by this process.
    fn len(&self) -> usize;

    /// Whether no image has been stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
