//! Store Adapters
//!
//! Concrete implementations of the store ports:
//!
//! - `InMemoryLaptopStore`: volatile catalog behind one reader/writer lock
//! - `InMemoryRatingStore`: volatile rating aggregates behind one lock
//! - `DiskImageStore`: image blobs written to a directory
//! - `InMemoryImageStore`: image blobs kept in memory (tests, demos)

mod image_store;
mod laptop_store;
mod rating_store;

pub use image_store::{DiskImageStore, ImageRecord, InMemoryImageStore};
pub use laptop_store::InMemoryLaptopStore;
pub use rating_store::InMemoryRatingStore;
