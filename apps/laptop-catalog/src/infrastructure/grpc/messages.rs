//! Request and response messages of `catalog.v1.LaptopService`.
//!
//! [`Laptop`] and [`Filter`] travel as-is; everything else here exists only
//! on the wire and converts to or from the service's call values.

use crate::application::services::{RatingSubmission, RatingUpdate, StoredImage, UploadPart};
use crate::domain::filter::Filter;
use crate::domain::laptop::Laptop;

/// Unary create request.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateLaptopRequest {
    /// Laptop to store; an empty id asks the server to assign one.
    #[prost(message, optional, tag = "1")]
    pub laptop: Option<Laptop>,
}

/// Unary create response.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct CreateLaptopResponse {
    /// Id of the stored laptop.
    #[prost(string, tag = "1")]
    pub id: String,
}

/// Search request.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SearchLaptopRequest {
    /// Bounds every result must satisfy. Missing means the default filter.
    #[prost(message, optional, tag = "1")]
    pub filter: Option<Filter>,
}

/// One search result.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SearchLaptopResponse {
    /// Matching laptop.
    #[prost(message, optional, tag = "1")]
    pub laptop: Option<Laptop>,
}

/// Metadata opening an image upload.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ImageInfo {
    /// Laptop the image belongs to.
    #[prost(string, tag = "1")]
    pub laptop_id: String,
    /// File extension including the dot, e.g. `.jpg`.
    #[prost(string, tag = "2")]
    pub image_type: String,
}

/// Payload of one upload message.
#[derive(Clone, PartialEq, Eq, prost::Oneof)]
pub enum UploadData {
    /// Upload metadata.
    #[prost(message, tag = "1")]
    Info(ImageInfo),
    /// Slice of image bytes.
    #[prost(bytes = "vec", tag = "2")]
    ChunkData(Vec<u8>),
}

/// One message of an image upload stream.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct UploadImageRequest {
    /// Info or a chunk.
    #[prost(oneof = "UploadData", tags = "1, 2")]
    pub data: Option<UploadData>,
}

/// Result of an upload.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct UploadImageResponse {
    /// Id assigned to the image.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Bytes received.
    #[prost(uint32, tag = "2")]
    pub size: u32,
}

/// One rating.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RateLaptopRequest {
    /// Rated laptop.
    #[prost(string, tag = "1")]
    pub laptop_id: String,
    /// Score.
    #[prost(double, tag = "2")]
    pub score: f64,
}

/// Aggregate after one rating.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RateLaptopResponse {
    /// Rated laptop.
    #[prost(string, tag = "1")]
    pub laptop_id: String,
    /// Ratings received so far.
    #[prost(uint32, tag = "2")]
    pub rated_count: u32,
    /// Mean score so far.
    #[prost(double, tag = "3")]
    pub average_score: f64,
}

// =============================================================================
// Conversions
// =============================================================================

impl From<UploadImageRequest> for UploadPart {
    fn from(request: UploadImageRequest) -> Self {
        match request.data {
            Some(UploadData::Info(ImageInfo {
                laptop_id,
                image_type,
            })) => Self::Info {
                laptop_id,
                image_type,
            },
            Some(UploadData::ChunkData(chunk)) => Self::Chunk(chunk),
            None => Self::Empty,
        }
    }
}

impl From<StoredImage> for UploadImageResponse {
    fn from(image: StoredImage) -> Self {
        Self {
            id: image.id,
            size: image.size,
        }
    }
}

impl From<RateLaptopRequest> for RatingSubmission {
    fn from(request: RateLaptopRequest) -> Self {
        Self {
            laptop_id: request.laptop_id,
            score: request.score,
        }
    }
}

impl From<RatingUpdate> for RateLaptopResponse {
    fn from(update: RatingUpdate) -> Self {
        Self {
            laptop_id: update.laptop_id,
            rated_count: update.rated_count,
            average_score: update.average_score,
        }
    }
}

impl From<Laptop> for SearchLaptopResponse {
    fn from(laptop: Laptop) -> Self {
        Self {
            laptop: Some(laptop),
        }
    }
}

impl UploadImageRequest {
    /// Opening message of an upload.
    #[must_use]
    pub fn info(laptop_id: impl Into<String>, image_type: impl Into<String>) -> Self {
        Self {
            data: Some(UploadData::Info(ImageInfo {
                laptop_id: laptop_id.into(),
                image_type: image_type.into(),
            })),
        }
    }

    /// Chunk message of an upload.
    #[must_use]
    pub const fn chunk(data: Vec<u8>) -> Self {
        Self {
            data: Some(UploadData::ChunkData(data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;

    #[test]
    fn upload_request_maps_to_parts() {
        assert_eq!(
            UploadPart::from(UploadImageRequest::info("abc", ".jpg")),
            UploadPart::Info {
                laptop_id: "abc".to_string(),
                image_type: ".jpg".to_string(),
            }
        );
        assert_eq!(
            UploadPart::from(UploadImageRequest::chunk(vec![1, 2])),
            UploadPart::Chunk(vec![1, 2])
        );
        assert_eq!(
            UploadPart::from(UploadImageRequest::default()),
            UploadPart::Empty
        );
    }

    #[test]
    fn chunk_is_tag_two_bytes() {
        let bytes = UploadImageRequest::chunk(vec![0xAB]).encode_to_vec();
        // field 2, wire type 2 (length-delimited), length 1
        assert_eq!(bytes, vec![0x12, 0x01, 0xAB]);
    }

    #[test]
    fn rating_round_trip_through_call_values() {
        let submission = RatingSubmission::from(RateLaptopRequest {
            laptop_id: "l".to_string(),
            score: 7.5,
        });
        assert_eq!(submission.laptop_id, "l");

        let response = RateLaptopResponse::from(RatingUpdate {
            laptop_id: "l".to_string(),
            rated_count: 2,
            average_score: 6.0,
        });
        assert_eq!(response.rated_count, 2);
        assert!((response.average_score - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_filter_decodes_as_none() {
        let request = SearchLaptopRequest::decode(&[][..]).unwrap();
        assert!(request.filter.is_none());
    }
}
