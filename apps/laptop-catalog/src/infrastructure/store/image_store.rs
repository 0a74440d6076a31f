//! Image blob stores.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::application::ports::{ImageStore, ImageStoreError};

/// Longest accepted image type, dot included.
const MAX_IMAGE_TYPE_LEN: usize = 16;

/// Metadata of a stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Laptop the image belongs to.
    pub laptop_id: String,
    /// Declared type, e.g. `.jpg`.
    pub image_type: String,
    /// Where the bytes live; `None` for in-memory images.
    pub path: Option<PathBuf>,
    /// Payload size in bytes.
    pub size: usize,
}

/// Image type must look like a file extension, since it becomes part of a
/// file name.
fn validate_image_type(image_type: &str) -> Result<(), ImageStoreError> {
    let valid = image_type.len() <= MAX_IMAGE_TYPE_LEN
        && image_type
            .strip_prefix('.')
            .is_some_and(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    if valid {
        Ok(())
    } else {
        Err(ImageStoreError::Rejected(format!(
            "invalid image type {image_type:?}"
        )))
    }
}

// =============================================================================
// Disk
// =============================================================================

/// Writes each image to `<folder>/<image id><image type>`.
#[derive(Debug)]
pub struct DiskImageStore {
    folder: PathBuf,
    images: RwLock<HashMap<String, ImageRecord>>,
}

impl DiskImageStore {
    /// Create a store rooted at `folder`; the folder is created on first save.
    #[must_use]
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            images: RwLock::new(HashMap::new()),
        }
    }

    /// Root folder.
    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Metadata of image `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ImageRecord> {
        self.images.read().get(id).cloned()
    }
}

#[async_trait]
impl ImageStore for DiskImageStore {
    async fn save(
        &self,
        laptop_id: &str,
        image_type: &str,
        data: Vec<u8>,
    ) -> Result<String, ImageStoreError> {
        validate_image_type(image_type)?;

        let id = Uuid::new_v4().to_string();
        let path = self.folder.join(format!("{id}{image_type}"));

        tokio::fs::create_dir_all(&self.folder).await?;
        tokio::fs::write(&path, &data).await?;
        tracing::debug!(image_id = %id, path = %path.display(), "Wrote image file");

        self.images.write().insert(
            id.clone(),
            ImageRecord {
                laptop_id: laptop_id.to_string(),
                image_type: image_type.to_string(),
                path: Some(path),
                size: data.len(),
            },
        );
        Ok(id)
    }

    fn len(&self) -> usize {
        self.images.read().len()
    }
}

// =============================================================================
// Memory
// =============================================================================

/// Keeps image bytes in memory.
#[derive(Debug, Default)]
pub struct InMemoryImageStore {
    images: RwLock<HashMap<String, (ImageRecord, Vec<u8>)>>,
}

impl InMemoryImageStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata and bytes of image `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<(ImageRecord, Vec<u8>)> {
        self.images.read().get(id).cloned()
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn save(
        &self,
        laptop_id: &str,
        image_type: &str,
        data: Vec<u8>,
    ) -> Result<String, ImageStoreError> {
        validate_image_type(image_type)?;

        let id = Uuid::new_v4().to_string();
        let record = ImageRecord {
            laptop_id: laptop_id.to_string(),
            image_type: image_type.to_string(),
            path: None,
            size: data.len(),
        };
        self.images.write().insert(id.clone(), (record, data));
        Ok(id)
    }

    fn len(&self) -> usize {
        self.images.read().len()
    }
}
