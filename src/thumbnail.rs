use std::path::Path;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use reqwest::{Client, Response};
use tracing::{info, warn};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{KaraokeError, Result};

/// Fetches the background still for the karaoke video
pub struct ThumbnailDownloader {
    client: Client,
}

impl ThumbnailDownloader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("karaokify/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Download `url` into `destination`.
    ///
    /// Returns `Ok(false)` when the server answers with a client error, in
    /// which case no file is written and the pipeline falls back to a solid
    /// background. Server errors and transport failures are errors.
    pub async fn download(&self, url: &str, destination: &Path) -> Result<bool> {
        info!("Downloading thumbnail from {}", url);

        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if status.is_server_error() {
            response = response.error_for_status()?;
        }
        if !status.is_success() {
            warn!("Thumbnail not available (HTTP {}), continuing without background image", status);
            return Ok(false);
        }

        let pb = ProgressBar::new(response.content_length().unwrap_or(0));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .map_err(|e| KaraokeError::Config(format!("Invalid progress template: {}", e)))?
                .progress_chars("#>-"),
        );

        // Write next to the destination, then move into place
        let temp_path = destination.with_extension("tmp");
        let downloaded = match stream_to_file(&mut response, &temp_path, &pb).await {
            Ok(downloaded) => downloaded,
            Err(e) => {
                pb.abandon();
                if let Err(remove_err) = async_fs::remove_file(&temp_path).await {
                    warn!("Could not remove partial download {}: {}", temp_path.display(), remove_err);
                }
                return Err(e);
            }
        };

        async_fs::rename(&temp_path, destination).await?;

        pb.finish_and_clear();
        info!("Saved thumbnail ({} bytes) to {}", downloaded, destination.display());
        Ok(true)
    }
}

async fn stream_to_file(response: &mut Response, path: &Path, pb: &ProgressBar) -> Result<u64> {
    let mut file = async_fs::File::create(path).await?;
    let mut downloaded = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }
    file.flush().await?;
    Ok(downloaded)
}
