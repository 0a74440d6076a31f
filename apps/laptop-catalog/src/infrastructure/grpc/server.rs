//! gRPC Server Implementation
//!
//! Implements the `LaptopService` gRPC service on top of
//! [`LaptopService`](crate::application::services::LaptopService).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::metadata::MetadataMap;
use tonic::{Code, Request, Response, Status, Streaming};
use tracing::Instrument;

use super::messages::{
    CreateLaptopRequest, CreateLaptopResponse, RateLaptopRequest, RateLaptopResponse,
    SearchLaptopRequest, SearchLaptopResponse, UploadImageRequest, UploadImageResponse,
};
use super::proto::laptop_service_server::LaptopService as LaptopServiceRpc;
use crate::application::context::{CallContext, parse_grpc_timeout};
use crate::application::services::{LaptopService, RatingSubmission, UploadPart};
use crate::error::ServiceError;
use crate::infrastructure::metrics::{
    Method, record_image_bytes, record_ratings, record_rpc, record_search_matches,
};

// =============================================================================
// Type Aliases
// =============================================================================

type CallResult<T> = Result<Response<T>, Status>;
type BoxedStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

/// Header carrying the client's deadline.
const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// How long a terminal error waits for room in a stalled response stream.
const TERMINAL_SEND_TIMEOUT: Duration = Duration::from_secs(1);

// =============================================================================
// Server Implementation
// =============================================================================

/// gRPC front end of the laptop catalog.
pub struct LaptopServer {
    service: Arc<LaptopService>,
    shutdown: CancellationToken,
    buffer: usize,
}

impl LaptopServer {
    /// Create a server. Every call context is a child of `shutdown`; each
    /// streaming response buffers up to `buffer` messages.
    #[must_use]
    pub fn new(service: Arc<LaptopService>, shutdown: CancellationToken, buffer: usize) -> Self {
        Self {
            service,
            shutdown,
            buffer: buffer.max(1),
        }
    }

    /// The wrapped service.
    #[must_use]
    pub const fn service(&self) -> &Arc<LaptopService> {
        &self.service
    }

    fn call_context(&self, metadata: &MetadataMap) -> CallContext {
        let ctx = CallContext::new(self.shutdown.child_token());
        match metadata
            .get(GRPC_TIMEOUT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_grpc_timeout)
        {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }
}

#[tonic::async_trait]
impl LaptopServiceRpc for LaptopServer {
    type SearchLaptopStream = BoxedStream<SearchLaptopResponse>;
    type RateLaptopStream = BoxedStream<RateLaptopResponse>;

    async fn create_laptop(
        &self,
        request: Request<CreateLaptopRequest>,
    ) -> CallResult<CreateLaptopResponse> {
        let started = Instant::now();
        let ctx = self.call_context(request.metadata());
        let _guard = ctx.token().clone().drop_guard();

        let result = self
            .service
            .create_laptop(&ctx, request.into_inner().laptop)
            .map(|id| Response::new(CreateLaptopResponse { id }));
        finish(Method::CreateLaptop, started, result)
    }

    async fn search_laptop(
        &self,
        request: Request<SearchLaptopRequest>,
    ) -> CallResult<Self::SearchLaptopStream> {
        let started = Instant::now();
        let ctx = self.call_context(request.metadata());
        let filter = request.into_inner().filter.unwrap_or_default();

        let (tx, rx) = mpsc::channel(self.buffer);
        let service = Arc::clone(&self.service);
        let span = tracing::info_span!("search_laptop");

        tokio::spawn(
            async move {
                let _guard = ctx.token().clone().drop_guard();
                let outcome =
                    until_client_gone(&ctx, &tx, service.search_laptop(&ctx, filter, &tx)).await;
                match outcome {
                    Ok(matches) => {
                        tracing::info!(matches, "Search finished");
                        record_search_matches(matches);
                        record_rpc(Method::SearchLaptop, Code::Ok, started.elapsed());
                    }
                    Err(e) => fail_stream(Method::SearchLaptop, started, &tx, e).await,
                }
            }
            .instrument(span),
        );

        let stream = ReceiverStream::new(rx).map(|item| {
            item.map(SearchLaptopResponse::from)
                .map_err(|e| e.to_status())
        });
        Ok(Response::new(Box::pin(stream) as Self::SearchLaptopStream))
    }

    async fn upload_image(
        &self,
        request: Request<Streaming<UploadImageRequest>>,
    ) -> CallResult<UploadImageResponse> {
        let started = Instant::now();
        let ctx = self.call_context(request.metadata());
        let _guard = ctx.token().clone().drop_guard();

        let inbound = request
            .into_inner()
            .map(|item| item.map(UploadPart::from));
        let result = self
            .service
            .upload_image(&ctx, inbound)
            .await
            .map(|image| {
                record_image_bytes(image.size);
                Response::new(UploadImageResponse::from(image))
            });
        finish(Method::UploadImage, started, result)
    }

    async fn rate_laptop(
        &self,
        request: Request<Streaming<RateLaptopRequest>>,
    ) -> CallResult<Self::RateLaptopStream> {
        let started = Instant::now();
        let ctx = self.call_context(request.metadata());
        let inbound = request
            .into_inner()
            .map(|item| item.map(RatingSubmission::from));

        let (tx, rx) = mpsc::channel(self.buffer);
        let service = Arc::clone(&self.service);
        let span = tracing::info_span!("rate_laptop");

        tokio::spawn(
            async move {
                let _guard = ctx.token().clone().drop_guard();
                let outcome =
                    until_client_gone(&ctx, &tx, service.rate_laptop(&ctx, inbound, &tx)).await;
                match outcome {
                    Ok(processed) => {
                        record_ratings(processed);
                        record_rpc(Method::RateLaptop, Code::Ok, started.elapsed());
                    }
                    Err(e) => fail_stream(Method::RateLaptop, started, &tx, e).await,
                }
            }
            .instrument(span),
        );

        let stream = ReceiverStream::new(rx).map(|item| {
            item.map(RateLaptopResponse::from)
                .map_err(|e| e.to_status())
        });
        Ok(Response::new(Box::pin(stream) as Self::RateLaptopStream))
    }
}

// =============================================================================
// Call Helpers
// =============================================================================

/// Drive `work` to completion, cancelling the call if the client drops the
/// response stream first. `work` still runs to its next checkpoint.
async fn until_client_gone<T, F>(ctx: &CallContext, tx: &mpsc::Sender<T>, work: F) -> F::Output
where
    F: Future,
{
    tokio::pin!(work);
    tokio::select! {
        biased;
        output = &mut work => output,
        () = tx.closed() => {
            tracing::debug!("Client went away");
            ctx.cancel();
            work.await
        }
    }
}

fn log_failure(method: Method, error: &ServiceError) {
    if error.code().is_client_error() {
        tracing::warn!(method = method.as_str(), error = %error, "Call rejected");
    } else {
        tracing::error!(method = method.as_str(), error = %error, "Call failed");
    }
}

fn finish<T>(method: Method, started: Instant, result: Result<T, ServiceError>) -> Result<T, Status> {
    match result {
        Ok(value) => {
            record_rpc(method, Code::Ok, started.elapsed());
            Ok(value)
        }
        Err(e) => {
            log_failure(method, &e);
            record_rpc(method, e.code().grpc_code(), started.elapsed());
            Err(e.to_status())
        }
    }
}

/// Terminate a streaming response with `error`.
async fn fail_stream<T>(
    method: Method,
    started: Instant,
    tx: &mpsc::Sender<Result<T, ServiceError>>,
    error: ServiceError,
) {
    log_failure(method, &error);
    record_rpc(method, error.code().grpc_code(), started.elapsed());
    match tokio::time::timeout(TERMINAL_SEND_TIMEOUT, tx.send(Err(error))).await {
        Ok(Ok(())) => {}
        // Nobody to tell when the client is gone.
        Ok(Err(_)) => tracing::debug!(method = method.as_str(), "Client gone before error"),
        Err(_) => tracing::warn!(
            method = method.as_str(),
            timeout_ms = TERMINAL_SEND_TIMEOUT.as_millis(),
            "Response stream stalled, dropping error"
        ),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::application::context::Interrupted;
    use crate::domain::filter::Filter;
    use crate::infrastructure::store::{InMemoryImageStore, InMemoryLaptopStore, InMemoryRatingStore};
    use crate::sample;

    fn server() -> LaptopServer {
        let service = Arc::new(LaptopService::new(
            Arc::new(InMemoryLaptopStore::new()),
            Arc::new(InMemoryRatingStore::new()),
            Arc::new(InMemoryImageStore::new()),
        ));
        LaptopServer::new(service, CancellationToken::new(), 4)
    }

    fn open_filter() -> Filter {
        Filter {
            max_price_usd: 1e9,
            ..Filter::default()
        }
    }

    #[test]
    fn context_reads_grpc_timeout() {
        let server = server();
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert(GRPC_TIMEOUT_HEADER, "5S".parse().unwrap());

        let ctx = server.call_context(request.metadata());

        assert!(ctx.deadline().is_some());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn context_ignores_malformed_timeout() {
        let server = server();
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert(GRPC_TIMEOUT_HEADER, "soon".parse().unwrap());

        assert!(server.call_context(request.metadata()).deadline().is_none());
    }

    #[test]
    fn shutdown_cancels_call_contexts() {
        let server = server();
        let ctx = server.call_context(&MetadataMap::new());

        server.shutdown.cancel();

        assert_eq!(ctx.check(), Err(Interrupted::Canceled));
    }

    #[test]
    fn zero_buffer_is_raised_to_one() {
        let server = LaptopServer::new(Arc::clone(server().service()), CancellationToken::new(), 0);
        assert_eq!(server.buffer, 1);
    }

    #[tokio::test]
    async fn create_returns_assigned_id() {
        let server = server();
        let mut laptop = sample::new_laptop();
        laptop.id = String::new();

        let response = server
            .create_laptop(Request::new(CreateLaptopRequest {
                laptop: Some(laptop),
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(uuid::Uuid::parse_str(&response.id).is_ok());
        assert_eq!(server.service().laptops().len(), 1);
    }

    #[tokio::test]
    async fn create_maps_errors_to_status() {
        let server = server();
        let mut laptop = sample::new_laptop();
        laptop.id = "not-a-uuid".to_string();

        let status = server
            .create_laptop(Request::new(CreateLaptopRequest {
                laptop: Some(laptop.clone()),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);

        laptop.id = uuid::Uuid::new_v4().to_string();
        for expected in [Code::Ok, Code::AlreadyExists] {
            let result = server
                .create_laptop(Request::new(CreateLaptopRequest {
                    laptop: Some(laptop.clone()),
                }))
                .await;
            assert_eq!(result.map_or_else(|s| s.code(), |_| Code::Ok), expected);
        }
    }

    #[tokio::test]
    async fn search_streams_matches() {
        let server = server();
        for _ in 0..6 {
            server
                .create_laptop(Request::new(CreateLaptopRequest {
                    laptop: Some(sample::new_laptop()),
                }))
                .await
                .unwrap();
        }

        let stream = server
            .search_laptop(Request::new(SearchLaptopRequest {
                filter: Some(open_filter()),
            }))
            .await
            .unwrap()
            .into_inner();
        let results: Vec<_> = stream.collect().await;

        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.as_ref().is_ok_and(|r| r.laptop.is_some())));
    }

    #[tokio::test]
    async fn search_without_filter_matches_free_laptops_only() {
        let server = server();
        let mut free = sample::new_laptop();
        free.price_usd = 0.0;
        for laptop in [free, sample::new_laptop()] {
            server
                .create_laptop(Request::new(CreateLaptopRequest {
                    laptop: Some(laptop),
                }))
                .await
                .unwrap();
        }

        let stream = server
            .search_laptop(Request::new(SearchLaptopRequest { filter: None }))
            .await
            .unwrap()
            .into_inner();
        let results: Vec<_> = stream.collect().await;

        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn search_after_shutdown_ends_with_cancelled() {
        let server = server();
        server.shutdown.cancel();

        let stream = server
            .search_laptop(Request::new(SearchLaptopRequest {
                filter: Some(open_filter()),
            }))
            .await
            .unwrap()
            .into_inner();
        let results: Vec<_> = stream.collect().await;

        assert_eq!(results.len(), 1);
        let status = results.into_iter().next().unwrap().unwrap_err();
        assert_eq!(status.code(), Code::Cancelled);
    }

    #[tokio::test]
    async fn fail_stream_gives_up_on_stalled_reader() {
        let (tx, mut rx) = mpsc::channel::<Result<(), ServiceError>>(1);
        tx.send(Ok(())).await.unwrap();

        let started = Instant::now();
        tokio::time::timeout(
            TERMINAL_SEND_TIMEOUT * 2,
            fail_stream(
                Method::SearchLaptop,
                started,
                &tx,
                ServiceError::from(Interrupted::DeadlineExceeded),
            ),
        )
        .await
        .expect("terminal send must be bounded");

        assert!(rx.recv().await.unwrap().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn fail_stream_delivers_error_when_room() {
        let (tx, mut rx) = mpsc::channel::<Result<(), ServiceError>>(1);

        fail_stream(
            Method::RateLaptop,
            Instant::now(),
            &tx,
            ServiceError::from(Interrupted::Canceled),
        )
        .await;

        let err = rx.recv().await.unwrap().unwrap_err();
        assert_eq!(err.to_status().code(), Code::Cancelled);
    }

    #[tokio::test]
    async fn until_client_gone_cancels_when_receiver_dropped() {
        let ctx = CallContext::default();
        let (tx, rx) = mpsc::channel::<()>(1);
        drop(rx);

        let waited = until_client_gone(&ctx, &tx, async {
            tokio::time::timeout(Duration::from_secs(5), ctx.interrupted()).await
        })
        .await;

        assert_eq!(waited, Ok(Interrupted::Canceled));
    }
}
