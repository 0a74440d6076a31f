//! Application Services
//!
//! - `LaptopService`: orchestrates create, search, image upload and rating
//!   over the store ports, one method per call pattern

mod laptop_service;

pub use laptop_service::{
    LaptopService, MAX_IMAGE_SIZE, Outbound, RatingSubmission, RatingUpdate, StoredImage, UploadPart,
    UploadSession, UploadState,
};
