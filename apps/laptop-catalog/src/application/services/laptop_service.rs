//! Laptop Service
//!
//! One method per call pattern. Each method takes the call's
//! [`CallContext`] and works on domain values: inbound streams yield parts or
//! submissions, outbound channels carry results or the terminal error. The
//! gRPC adapter owns translation to and from wire messages.
//!
//! The service holds no per-call state between calls; everything shared
//! lives behind the store ports.
//!
//! # Upload State Machine
//!
//! ```text
//! AwaitMetadata ──info──► AccumulateChunks ──end of stream──► Finalize
//!                              │    ▲
//!                              └────┘ chunk (size ≤ MAX_IMAGE_SIZE)
//! ```

use std::fmt::Display;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::application::context::CallContext;
use crate::application::ports::{ImageStore, LaptopStore, RatingStore, StoreError};
use crate::domain::filter::Filter;
use crate::domain::laptop::Laptop;
use crate::error::ServiceError;

/// Largest image accepted by an upload, in bytes (1 MiB).
pub const MAX_IMAGE_SIZE: usize = 1 << 20;

/// Channel carrying streamed results, then at most one terminal error.
pub type Outbound<T> = mpsc::Sender<Result<T, ServiceError>>;

// =============================================================================
// Call Values
// =============================================================================

/// One inbound message of an image upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPart {
    /// Target laptop and declared image type; must come first, exactly once.
    Info {
        /// Laptop the image belongs to.
        laptop_id: String,
        /// Declared type, e.g. `.png`.
        image_type: String,
    },
    /// A slice of image bytes.
    Chunk(Vec<u8>),
    /// A message carrying neither field.
    Empty,
}

/// Result of a finished upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Id assigned by the image store.
    pub id: String,
    /// Total bytes received.
    pub size: u32,
}

/// One inbound rating.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingSubmission {
    /// Rated laptop.
    pub laptop_id: String,
    /// Score; bounds are not enforced.
    pub score: f64,
}

/// Running aggregate sent back for each rating.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingUpdate {
    /// Rated laptop.
    pub laptop_id: String,
    /// Ratings received so far.
    pub rated_count: u32,
    /// Mean of all ratings received so far.
    pub average_score: f64,
}

/// Bytes accumulated by an upload in progress.
#[derive(Debug)]
pub struct UploadSession {
    laptop_id: String,
    image_type: String,
    data: Vec<u8>,
}

impl UploadSession {
    fn new(laptop_id: String, image_type: String) -> Self {
        Self {
            laptop_id,
            image_type,
            data: Vec::new(),
        }
    }

    /// Laptop the upload targets.
    #[must_use]
    pub fn laptop_id(&self) -> &str {
        &self.laptop_id
    }

    /// Bytes accumulated so far.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn append(&mut self, chunk: &[u8]) -> Result<(), ServiceError> {
        let size = self.data.len() + chunk.len();
        if size > MAX_IMAGE_SIZE {
            return Err(ServiceError::image_too_large(size, MAX_IMAGE_SIZE)
                .with_context("laptop_id", self.laptop_id.as_str()));
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }
}

/// Where an upload is in its lifecycle.
#[derive(Debug)]
pub enum UploadState {
    /// Waiting for the info message.
    AwaitMetadata,
    /// Receiving chunks.
    AccumulateChunks(UploadSession),
    /// Stream ended; handing the payload to the image store.
    Finalize(UploadSession),
}

// =============================================================================
// Service
// =============================================================================

/// Orchestrator for the four laptop calls.
pub struct LaptopService {
    laptops: Arc<dyn LaptopStore>,
    ratings: Arc<dyn RatingStore>,
    images: Arc<dyn ImageStore>,
}

impl std::fmt::Debug for LaptopService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaptopService")
            .field("laptops", &self.laptops.len())
            .field("ratings", &self.ratings.len())
            .field("images", &self.images.len())
            .finish()
    }
}

impl LaptopService {
    /// Create a service over the given stores.
    #[must_use]
    pub fn new(
        laptops: Arc<dyn LaptopStore>,
        ratings: Arc<dyn RatingStore>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            laptops,
            ratings,
            images,
        }
    }

    /// The catalog store.
    #[must_use]
    pub fn laptops(&self) -> &Arc<dyn LaptopStore> {
        &self.laptops
    }

    /// The rating store.
    #[must_use]
    pub fn ratings(&self) -> &Arc<dyn RatingStore> {
        &self.ratings
    }

    /// The image store.
    #[must_use]
    pub fn images(&self) -> &Arc<dyn ImageStore> {
        &self.images
    }

    // =========================================================================
    // Create (unary)
    // =========================================================================

    /// Store a new laptop and return its id.
    ///
    /// An empty id is replaced by a random UUID; a non-empty id must parse as
    /// a UUID.
    ///
    /// # Errors
    ///
    /// Invalid request or id, duplicate id, interruption, store failure.
    pub fn create_laptop(
        &self,
        ctx: &CallContext,
        laptop: Option<Laptop>,
    ) -> Result<String, ServiceError> {
        let mut laptop =
            laptop.ok_or_else(|| ServiceError::invalid_request("laptop is required"))?;
        tracing::info!(laptop_id = %laptop.id, "Received create-laptop request");

        if laptop.id.is_empty() {
            laptop.id = Uuid::new_v4().to_string();
        } else if Uuid::parse_str(&laptop.id).is_err() {
            return Err(ServiceError::invalid_laptop_id(&laptop.id));
        }

        ctx.check()?;

        self.laptops.save(&laptop).map_err(|e| match e {
            StoreError::AlreadyExists(id) => ServiceError::already_exists(&id),
            other => ServiceError::store(format!(
                "cannot save laptop to the in-memory store: {other}"
            ))
            .with_context("laptop_id", laptop.id.as_str()),
        })?;

        tracing::info!(laptop_id = %laptop.id, "Saved laptop");
        Ok(laptop.id)
    }

    // =========================================================================
    // Search (server-streaming)
    // =========================================================================

    /// Send every stored laptop matching `filter` into `tx` and return the
    /// number of matches.
    ///
    /// The scan runs on the blocking pool because it holds the catalog's
    /// shared lock for its whole duration. Each match waits for channel
    /// capacity only until the call is interrupted, so a consumer that stops
    /// reading ends the scan at its deadline or on cancellation.
    ///
    /// # Errors
    ///
    /// Interruption, or a store error when the scan fails or `tx` is closed.
    pub async fn search_laptop(
        &self,
        ctx: &CallContext,
        filter: Filter,
        tx: &Outbound<Laptop>,
    ) -> Result<u64, ServiceError> {
        tracing::info!(?filter, "Received search-laptop request");
        ctx.check()?;

        let laptops = Arc::clone(&self.laptops);
        let scan_ctx = ctx.clone();
        let tx = tx.clone();
        let runtime = tokio::runtime::Handle::current();
        let scan = tokio::task::spawn_blocking(move || -> Result<u64, StoreError> {
            let mut matches = 0_u64;
            let mut deliver = |laptop: Laptop| -> Result<(), StoreError> {
                tracing::debug!(laptop_id = %laptop.id, "Found matching laptop");
                let permit = runtime.block_on(reserve(&scan_ctx, &tx))?;
                permit.send(Ok(laptop));
                matches += 1;
                Ok(())
            };
            laptops.search(&scan_ctx, &filter, &mut deliver)?;
            Ok(matches)
        });

        match scan.await {
            Ok(Ok(matches)) => Ok(matches),
            Ok(Err(StoreError::Interrupted(reason))) => Err(reason.into()),
            Ok(Err(e)) => Err(ServiceError::store(format!("unexpected error: {e}"))),
            Err(e) => Err(ServiceError::store(format!("search task failed: {e}"))),
        }
    }

    // =========================================================================
    // Upload (client-streaming)
    // =========================================================================

    /// Receive an image for an existing laptop and hand it to the image store.
    ///
    /// # Errors
    ///
    /// Protocol misuse, unknown laptop, oversized image, interruption,
    /// receive failure or image store failure. Nothing is stored on error.
    pub async fn upload_image<S, E>(
        &self,
        ctx: &CallContext,
        mut inbound: S,
    ) -> Result<StoredImage, ServiceError>
    where
        S: Stream<Item = Result<UploadPart, E>> + Unpin,
        E: Display,
    {
        let mut state = UploadState::AwaitMetadata;
        loop {
            state = match state {
                UploadState::AwaitMetadata => self.await_metadata(ctx, &mut inbound).await?,
                UploadState::AccumulateChunks(session) => {
                    Self::accumulate_chunk(ctx, &mut inbound, session).await?
                }
                UploadState::Finalize(session) => return self.finalize_upload(ctx, session).await,
            };
        }
    }

    async fn await_metadata<S, E>(
        &self,
        ctx: &CallContext,
        inbound: &mut S,
    ) -> Result<UploadState, ServiceError>
    where
        S: Stream<Item = Result<UploadPart, E>> + Unpin,
        E: Display,
    {
        match receive(ctx, inbound).await? {
            Some(UploadPart::Info {
                laptop_id,
                image_type,
            }) => {
                tracing::info!(%laptop_id, %image_type, "Received upload-image request");
                match self.laptops.find(&laptop_id) {
                    Err(e) => Err(ServiceError::store(format!("cannot find laptop: {e}"))
                        .with_context("laptop_id", laptop_id)),
                    Ok(None) => Err(ServiceError::unknown_laptop(&laptop_id)),
                    Ok(Some(_)) => Ok(UploadState::AccumulateChunks(UploadSession::new(
                        laptop_id, image_type,
                    ))),
                }
            }
            Some(_) => Err(ServiceError::invalid_request(
                "first upload message must carry image info",
            )),
            None => Err(ServiceError::invalid_request("no image info received")),
        }
    }

    async fn accumulate_chunk<S, E>(
        ctx: &CallContext,
        inbound: &mut S,
        mut session: UploadSession,
    ) -> Result<UploadState, ServiceError>
    where
        S: Stream<Item = Result<UploadPart, E>> + Unpin,
        E: Display,
    {
        match receive(ctx, inbound).await? {
            None => {
                tracing::debug!(size = session.size(), "No more image chunks");
                Ok(UploadState::Finalize(session))
            }
            Some(UploadPart::Chunk(chunk)) => {
                session.append(&chunk)?;
                tracing::trace!(chunk = chunk.len(), size = session.size(), "Received chunk");
                Ok(UploadState::AccumulateChunks(session))
            }
            Some(UploadPart::Empty) => Ok(UploadState::AccumulateChunks(session)),
            Some(UploadPart::Info { .. }) => Err(ServiceError::invalid_request(
                "image info must be sent only once",
            )
            .with_context("laptop_id", session.laptop_id)),
        }
    }

    async fn finalize_upload(
        &self,
        ctx: &CallContext,
        session: UploadSession,
    ) -> Result<StoredImage, ServiceError> {
        ctx.check()?;

        let UploadSession {
            laptop_id,
            image_type,
            data,
        } = session;
        let size = u32::try_from(data.len()).unwrap_or(u32::MAX);

        let id = self
            .images
            .save(&laptop_id, &image_type, data)
            .await
            .map_err(|e| {
                ServiceError::image_store(format!("cannot save image to the store: {e}"))
                    .with_context("laptop_id", laptop_id.as_str())
            })?;

        tracing::info!(image_id = %id, %laptop_id, size, "Saved image");
        Ok(StoredImage { id, size })
    }

    // =========================================================================
    // Rate (bidirectional)
    // =========================================================================

    /// Fold each inbound rating into its laptop's aggregate and answer with
    /// the running count and average before reading the next rating.
    ///
    /// Returns the number of ratings processed.
    ///
    /// # Errors
    ///
    /// Unknown laptop, interruption, store failure, or stream failure.
    /// Ratings already answered stay recorded.
    pub async fn rate_laptop<S, E>(
        &self,
        ctx: &CallContext,
        mut inbound: S,
        tx: &Outbound<RatingUpdate>,
    ) -> Result<u32, ServiceError>
    where
        S: Stream<Item = Result<RatingSubmission, E>> + Unpin,
        E: Display,
    {
        let mut processed = 0_u32;

        while let Some(RatingSubmission { laptop_id, score }) = receive(ctx, &mut inbound).await?
        {
            tracing::debug!(%laptop_id, score, "Received rate-laptop request");

            match self.laptops.find(&laptop_id) {
                Err(e) => {
                    return Err(ServiceError::store(format!("cannot find laptop: {e}"))
                        .with_context("laptop_id", laptop_id));
                }
                Ok(None) => return Err(ServiceError::laptop_not_found(&laptop_id)),
                Ok(Some(_)) => {}
            }

            let rating = self.ratings.add(&laptop_id, score).map_err(|e| {
                ServiceError::store(format!("cannot add rating to the store: {e}"))
                    .with_context("laptop_id", laptop_id.as_str())
            })?;

            let update = RatingUpdate {
                laptop_id,
                rated_count: rating.count,
                average_score: rating.average(),
            };
            send(ctx, tx, update).await?;
            processed += 1;
        }

        tracing::debug!(processed, "Rating stream closed by client");
        Ok(processed)
    }
}

// =============================================================================
// Stream Helpers
// =============================================================================

/// Next inbound item, or `None` at end of stream. Fails as soon as the call
/// is interrupted, including while waiting.
async fn receive<S, T, E>(ctx: &CallContext, inbound: &mut S) -> Result<Option<T>, ServiceError>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    E: Display,
{
    ctx.check()?;
    tokio::select! {
        biased;
        reason = ctx.interrupted() => Err(reason.into()),
        item = inbound.next() => match item {
            None => Ok(None),
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(e)) => Err(ServiceError::stream(format!("cannot receive stream request: {e}"))),
        },
    }
}

/// Wait for room in `tx` for one item, unless the call is interrupted first.
async fn reserve<'a, T>(
    ctx: &CallContext,
    tx: &'a Outbound<T>,
) -> Result<mpsc::Permit<'a, Result<T, ServiceError>>, StoreError> {
    ctx.check()?;
    tokio::select! {
        biased;
        reason = ctx.interrupted() => Err(reason.into()),
        permit = tx.reserve() => {
            permit.map_err(|_| StoreError::Delivery("response stream closed".to_string()))
        }
    }
}

/// Queue one outbound item, waiting for capacity unless interrupted.
async fn send<T>(ctx: &CallContext, tx: &Outbound<T>, item: T) -> Result<(), ServiceError> {
    ctx.check()?;
    tokio::select! {
        biased;
        reason = ctx.interrupted() => Err(reason.into()),
        sent = tx.send(Ok(item)) => {
            sent.map_err(|_| ServiceError::stream("cannot send stream response"))
        }
    }
}
