//! Rich error handling for the laptop catalog.
//!
//! Every failure a call can end with is a [`ServiceError`]: an [`ErrorCode`]
//! fixing the gRPC status, a human-readable message and key/value context.
//! [`ServiceError::to_status`] attaches `tonic-types` error details so
//! clients can branch on the reason rather than parse messages.
//!
//! # gRPC Status Codes
//!
//! | Code | Name | Usage |
//! |------|------|-------|
//! | `INVALID_ARGUMENT` (3) | Invalid Argument | Malformed id, unknown laptop on upload, oversized image, protocol misuse |
//! | `ALREADY_EXISTS` (6) | Already Exists | Duplicate laptop id on create |
//! | `NOT_FOUND` (5) | Not Found | Rating a laptop that does not exist |
//! | `CANCELLED` (1) | Cancelled | Client cancelled or server shutting down |
//! | `DEADLINE_EXCEEDED` (4) | Deadline Exceeded | `grpc-timeout` elapsed |
//! | `INTERNAL` (13) | Internal Error | Store or blob store failure |
//! | `UNKNOWN` (2) | Unknown | Stream receive/send failure |

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tonic::Code;
use tonic_types::{ErrorDetails, StatusExt};

use crate::application::context::Interrupted;

/// Domain for laptop catalog errors.
pub const ERROR_DOMAIN: &str = "catalog.laptop";

/// Error codes for the laptop catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (INVALID_ARGUMENT)
    /// Laptop id is not a well-formed UUID.
    InvalidLaptopId,
    /// Request is missing a payload or breaks the stream protocol.
    InvalidRequest,
    /// Upload targets a laptop that does not exist.
    UnknownLaptop,
    /// Upload exceeds the maximum image size.
    ImageTooLarge,

    // Conflict errors (ALREADY_EXISTS)
    /// A laptop with the same id is already stored.
    LaptopAlreadyExists,

    // Not found errors (NOT_FOUND)
    /// Rated laptop does not exist.
    LaptopNotFound,

    // Interruption (CANCELLED / DEADLINE_EXCEEDED)
    /// Call cancelled.
    Canceled,
    /// Call deadline passed.
    DeadlineExceeded,

    // Internal errors (INTERNAL)
    /// Catalog or rating store failure.
    StoreFailure,
    /// Image blob store failure.
    ImageStoreFailure,

    // Transport errors (UNKNOWN)
    /// Inbound or outbound stream failure.
    StreamFailure,
}

impl ErrorCode {
    /// Get the gRPC status code for this error.
    #[must_use]
    pub const fn grpc_code(&self) -> Code {
        match self {
            Self::InvalidLaptopId
            | Self::InvalidRequest
            | Self::UnknownLaptop
            | Self::ImageTooLarge => Code::InvalidArgument,

            Self::LaptopAlreadyExists => Code::AlreadyExists,

            Self::LaptopNotFound => Code::NotFound,

            Self::Canceled => Code::Cancelled,
            Self::DeadlineExceeded => Code::DeadlineExceeded,

            Self::StoreFailure | Self::ImageStoreFailure => Code::Internal,

            Self::StreamFailure => Code::Unknown,
        }
    }

    /// Get the error reason string (for gRPC ErrorInfo).
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidLaptopId => "INVALID_LAPTOP_ID",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::UnknownLaptop => "UNKNOWN_LAPTOP",
            Self::ImageTooLarge => "IMAGE_TOO_LARGE",
            Self::LaptopAlreadyExists => "LAPTOP_ALREADY_EXISTS",
            Self::LaptopNotFound => "LAPTOP_NOT_FOUND",
            Self::Canceled => "CANCELED",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::StoreFailure => "STORE_FAILURE",
            Self::ImageStoreFailure => "IMAGE_STORE_FAILURE",
            Self::StreamFailure => "STREAM_FAILURE",
        }
    }

    /// Whether the caller caused the error (as opposed to the server).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::StoreFailure | Self::ImageStoreFailure | Self::StreamFailure
        )
    }

    const fn is_validation(self) -> bool {
        matches!(self.grpc_code(), Code::InvalidArgument)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// A rich error with context for the laptop catalog.
#[derive(Debug, Clone, Error)]
#[error("[{code}] {message}")]
pub struct ServiceError {
    /// Error code.
    code: ErrorCode,
    /// Human-readable message.
    message: String,
    /// Additional context (key-value pairs).
    context: Vec<(String, String)>,
}

impl ServiceError {
    /// Create a new service error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// Add context to the error.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the context.
    #[must_use]
    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    /// Convert to a tonic Status with rich error details.
    #[must_use]
    pub fn to_status(&self) -> tonic::Status {
        let mut details = ErrorDetails::new();

        let metadata: HashMap<String, String> = self.context.iter().cloned().collect();
        details.set_error_info(self.code.reason(), ERROR_DOMAIN, metadata);

        if self.code.is_validation() {
            let field = self
                .context
                .first()
                .map_or("request", |(key, _)| key.as_str());
            details.add_bad_request_violation(field, &self.message);
        }

        tonic::Status::with_error_details(self.code.grpc_code(), &self.message, details)
    }
}

/// Convenience constructors for common errors.
impl ServiceError {
    /// Laptop id is not a UUID.
    #[must_use]
    pub fn invalid_laptop_id(id: &str) -> Self {
        Self::new(ErrorCode::InvalidLaptopId, "laptop ID is not a valid UUID")
            .with_context("laptop_id", id)
    }

    /// Malformed request or stream protocol violation.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Upload names a laptop that is not in the catalog.
    #[must_use]
    pub fn unknown_laptop(id: &str) -> Self {
        Self::new(
            ErrorCode::UnknownLaptop,
            format!("laptop {id} doesn't exist"),
        )
        .with_context("laptop_id", id)
    }

    /// Upload grew past `max` bytes.
    #[must_use]
    pub fn image_too_large(size: usize, max: usize) -> Self {
        Self::new(
            ErrorCode::ImageTooLarge,
            format!("image is too large: {size} > {max}"),
        )
        .with_context("image_size", size.to_string())
        .with_context("max_image_size", max.to_string())
    }

    /// Duplicate laptop id.
    #[must_use]
    pub fn already_exists(id: &str) -> Self {
        Self::new(
            ErrorCode::LaptopAlreadyExists,
            format!("laptop with id {id} already exists"),
        )
        .with_context("laptop_id", id)
    }

    /// Rated laptop is not in the catalog.
    #[must_use]
    pub fn laptop_not_found(id: &str) -> Self {
        Self::new(
            ErrorCode::LaptopNotFound,
            format!("laptopID {id} is not found"),
        )
        .with_context("laptop_id", id)
    }

    /// Catalog or rating store failure.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreFailure, message)
    }

    /// Image blob store failure.
    #[must_use]
    pub fn image_store(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ImageStoreFailure, message)
    }

    /// Stream receive or send failure.
    #[must_use]
    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StreamFailure, message)
    }
}

impl From<Interrupted> for ServiceError {
    fn from(reason: Interrupted) -> Self {
        let code = match reason {
            Interrupted::Canceled => ErrorCode::Canceled,
            Interrupted::DeadlineExceeded => ErrorCode::DeadlineExceeded,
        };
        Self::new(code, reason.to_string())
    }
}
