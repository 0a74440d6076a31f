//! Laptop Catalog Demo Client
//!
//! Exercises all four calls against a running server: creates random
//! laptops, searches them, optionally uploads an image, then rates them.
//!
//! # Environment Variables
//!
//! - `LAPTOP_SERVER_ADDR`: Server URI (default: <http://127.0.0.1:8080>)
//! - `LAPTOP_CLIENT_LAPTOPS`: Laptops to create (default: 10)
//! - `LAPTOP_CLIENT_IMAGE`: Image file to upload for the first laptop
//! - `RUST_LOG`: Log level (default: info)

use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use futures::StreamExt;
use laptop_catalog::domain::filter::Filter;
use laptop_catalog::domain::laptop::{Memory, MemoryUnit};
use laptop_catalog::infrastructure::telemetry::{self, TelemetryConfig};
use laptop_catalog::messages::{
    CreateLaptopRequest, RateLaptopRequest, SearchLaptopRequest, UploadImageRequest,
};
use laptop_catalog::{ClientConfig, LaptopServiceClient, sample};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::{Code, Request};

/// Deadline attached to every call.
const CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Bytes per upload chunk.
const CHUNK_SIZE: usize = 1024;

type Client = LaptopServiceClient<Channel>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let _telemetry_guard = telemetry::init_with_config(&TelemetryConfig::logs_only("laptop-client"));

    let config = ClientConfig::from_env()?;
    tracing::info!(addr = %config.server_addr, "Dialing server");

    let mut client = LaptopServiceClient::connect(config.server_addr.clone())
        .await
        .with_context(|| format!("cannot dial {}", config.server_addr))?;

    let mut ids = Vec::with_capacity(config.laptops);
    for _ in 0..config.laptops {
        if let Some(id) = create_laptop(&mut client).await? {
            ids.push(id);
        }
    }

    search_laptop(&mut client).await?;

    if let (Some(path), Some(id)) = (config.image.as_deref(), ids.first()) {
        upload_image(&mut client, id, path).await?;
    }

    rate_laptops(&mut client, &ids).await?;
    Ok(())
}

async fn create_laptop(client: &mut Client) -> anyhow::Result<Option<String>> {
    let mut request = Request::new(CreateLaptopRequest {
        laptop: Some(sample::new_laptop()),
    });
    request.set_timeout(CALL_TIMEOUT);

    match client.create_laptop(request).await {
        Ok(response) => {
            let id = response.into_inner().id;
            tracing::info!(laptop_id = %id, "Created laptop");
            Ok(Some(id))
        }
        Err(status) if status.code() == Code::AlreadyExists => {
            tracing::info!("Laptop already exists");
            Ok(None)
        }
        Err(status) => Err(status).context("cannot create laptop"),
    }
}

async fn search_laptop(client: &mut Client) -> anyhow::Result<()> {
    let filter = Filter {
        max_price_usd: 3000.0,
        min_cpu_cores: 4,
        min_cpu_ghz: 2.5,
        min_ram: Some(Memory::new(8, MemoryUnit::Gigabyte)),
    };
    tracing::info!(?filter, "Searching");

    let mut request = Request::new(SearchLaptopRequest {
        filter: Some(filter),
    });
    request.set_timeout(CALL_TIMEOUT);

    let mut stream = client
        .search_laptop(request)
        .await
        .context("cannot search laptop")?
        .into_inner();

    while let Some(response) = stream.message().await.context("cannot receive response")? {
        let Some(laptop) = response.laptop else {
            continue;
        };
        tracing::info!(
            laptop_id = %laptop.id,
            brand = %laptop.brand,
            name = %laptop.name,
            cores = laptop.cpu_cores(),
            max_ghz = laptop.cpu_max_ghz(),
            price_usd = laptop.price_usd,
            "Found laptop"
        );
    }
    Ok(())
}

async fn upload_image(client: &mut Client, laptop_id: &str, path: &Path) -> anyhow::Result<()> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read image {}", path.display()))?;
    let image_type = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let messages: Vec<UploadImageRequest> = std::iter::once(UploadImageRequest::info(
        laptop_id, image_type,
    ))
    .chain(data.chunks(CHUNK_SIZE).map(|c| UploadImageRequest::chunk(c.to_vec())))
    .collect();

    let mut request = Request::new(tokio_stream::iter(messages));
    request.set_timeout(CALL_TIMEOUT);

    let response = client
        .upload_image(request)
        .await
        .context("cannot upload image")?
        .into_inner();
    tracing::info!(image_id = %response.id, size = response.size, "Uploaded image");
    Ok(())
}

async fn rate_laptops(client: &mut Client, ids: &[String]) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel(ids.len().max(1));
    let mut request = Request::new(ReceiverStream::new(rx));
    request.set_timeout(CALL_TIMEOUT);

    let mut responses = client
        .rate_laptop(request)
        .await
        .context("cannot rate laptop")?
        .into_inner();

    for id in ids {
        let score = sample::random_laptop_score();
        tx.send(RateLaptopRequest {
            laptop_id: id.clone(),
            score,
        })
        .await
        .context("cannot send rating")?;

        let Some(response) = responses.next().await.transpose()? else {
            anyhow::bail!("server closed the rating stream early");
        };
        tracing::info!(
            laptop_id = %response.laptop_id,
            score,
            rated_count = response.rated_count,
            average_score = response.average_score,
            "Rated laptop"
        );
    }

    drop(tx);
    while let Some(response) = responses.next().await {
        response.context("rating stream failed")?;
    }
    Ok(())
}
