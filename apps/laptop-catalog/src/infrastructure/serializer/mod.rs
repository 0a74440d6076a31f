//! File Serialization
//!
//! Reads and writes catalog messages as protobuf wire bytes or pretty JSON.
//! JSON uses camelCase field names and RFC 3339 timestamps.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Serialization failure.
#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
    /// File could not be read or written.
    #[error("cannot access {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Bytes are not a valid protobuf message.
    #[error("cannot decode binary message from {path}: {source}")]
    Decode {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: prost::DecodeError,
    },
    /// JSON encoding or decoding failed.
    #[error("cannot convert {path} to or from JSON: {source}")]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SerializerError + '_ {
    move |source| SerializerError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `message` to `path` as protobuf wire bytes.
///
/// # Errors
///
/// Returns [`SerializerError::Io`] if the file cannot be written.
pub fn write_binary_file<M: prost::Message>(
    message: &M,
    path: impl AsRef<Path>,
) -> Result<(), SerializerError> {
    let path = path.as_ref();
    std::fs::write(path, message.encode_to_vec()).map_err(io_error(path))
}

/// Read a protobuf message from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not decode as `M`.
pub fn read_binary_file<M: prost::Message + Default>(
    path: impl AsRef<Path>,
) -> Result<M, SerializerError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(io_error(path))?;
    M::decode(bytes.as_slice()).map_err(|source| SerializerError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `message` to `path` as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if encoding fails or the file cannot be written.
pub fn write_json_file<M: Serialize>(
    message: &M,
    path: impl AsRef<Path>,
) -> Result<(), SerializerError> {
    let path = path.as_ref();
    let json = serde_json::to_vec_pretty(message).map_err(|source| SerializerError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(io_error(path))
}

/// Read a JSON message from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid JSON for `M`.
pub fn read_json_file<M: DeserializeOwned>(path: impl AsRef<Path>) -> Result<M, SerializerError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(io_error(path))?;
    serde_json::from_slice(&bytes).map_err(|source| SerializerError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::laptop::Laptop;
    use crate::sample;

    #[test]
    fn binary_file_preserves_laptop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("laptop.bin");
        let laptop = sample::new_laptop();

        write_binary_file(&laptop, &path).unwrap();
        let read: Laptop = read_binary_file(&path).unwrap();

        assert_eq!(read, laptop);
    }

    #[test]
    fn json_file_agrees_with_binary_file() {
        let dir = tempfile::tempdir().unwrap();
        let laptop = sample::new_laptop();
        let bin = dir.path().join("laptop.bin");
        let json = dir.path().join("laptop.json");

        write_binary_file(&laptop, &bin).unwrap();
        let from_binary: Laptop = read_binary_file(&bin).unwrap();
        write_json_file(&from_binary, &json).unwrap();
        let from_json: Laptop = read_json_file(&json).unwrap();

        assert_eq!(from_json.id, laptop.id);
        assert_eq!(from_json.cpu, laptop.cpu);
        assert_eq!(from_json.storages, laptop.storages);
        // RFC 3339 keeps nanoseconds
        assert_eq!(from_json.updated_at, laptop.updated_at);

        let text = std::fs::read_to_string(&json).unwrap();
        assert!(text.contains("\"priceUsd\""));
        assert!(text.contains("\"releaseYear\""));
        assert!(text.contains('\n'));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_binary_file::<Laptop>(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, SerializerError::Io { .. }));
        assert!(err.to_string().contains("missing.bin"));
    }

    #[test]
    fn garbage_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.bin");
        std::fs::write(&path, [0xFF, 0xFF, 0xFF]).unwrap();

        let err = read_binary_file::<Laptop>(&path).unwrap_err();

        assert!(matches!(err, SerializerError::Decode { .. }));
    }

    #[test]
    fn invalid_json_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = read_json_file::<Laptop>(&path).unwrap_err();

        assert!(matches!(err, SerializerError::Json { .. }));
    }
}
