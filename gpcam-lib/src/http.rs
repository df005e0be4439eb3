use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::GpError;
use crate::media::{self, MediaFile, MediaListing};

/// The camera's fixed address once its access point is joined.
pub const DEFAULT_BASE_URL: &str = "http://10.5.5.9:8080";

const MEDIA_ROOT: &str = "videos/DCIM/100GOPRO";

/// Observes download progress.
///
/// A pure observer: nothing reported here influences control flow, ordering
/// or retries.
pub trait DownloadObserver: Send {
    /// A file is about to be fetched. `index` is zero-based.
    fn file_started(&mut self, _index: usize, _total_files: usize, _file: &MediaFile) {}
    /// Bytes arrived for the in-flight file.
    fn chunk_transferred(&mut self, _file_bytes: u64, _file_size: u64) {}
    /// The in-flight file completed; `completed_bytes` is the running total of
    /// recorded sizes across the whole queue.
    fn file_finished(&mut self, _completed_bytes: u64) {}
}

/// Observer for headless use.
pub struct NullObserver;

impl DownloadObserver for NullObserver {}

/// HTTP client for the camera's media API.
pub struct MediaClient {
    base_url: String,
    client: Client,
}

impl Default for MediaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client somewhere other than the camera's fixed address.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GpError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GpError::Protocol(format!("{url} returned {status}")));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        if !content_type.starts_with("application/json") {
            return Err(GpError::Protocol(format!(
                "{url} returned content-type {content_type:?}, expected JSON"
            )));
        }
        Ok(response.json().await?)
    }

    /// List every file on the camera, with burst groups expanded.
    pub async fn list(&self) -> Result<Vec<MediaFile>, GpError> {
        let listing: MediaListing = self.get_json("gopro/media/list").await?;
        let mut files = Vec::new();
        for directory in &listing.media {
            files.extend(media::expand(&directory.files)?);
        }
        Ok(files)
    }

    /// Toggle the camera's turbo-transfer mode.
    pub async fn turbo_transfer(&self, enabled: bool) -> Result<(), GpError> {
        let flag = if enabled { 1 } else { 0 };
        let _: serde_json::Value = self
            .get_json(&format!("gopro/media/turbo_transfer?p={flag}"))
            .await?;
        Ok(())
    }

    /// Fetch `queue` strictly sequentially into `destination`, one file at a
    /// time over the single connection.
    ///
    /// The completed-bytes total advances by each file's recorded listing
    /// size as it finishes, so after k files it equals the sum of their sizes
    /// regardless of the in-flight transfer. Returns the final total.
    pub async fn download(
        &self,
        queue: &[MediaFile],
        destination: &Path,
        observer: &mut dyn DownloadObserver,
    ) -> Result<u64, GpError> {
        let mut completed_bytes = 0u64;
        for (index, file) in queue.iter().enumerate() {
            observer.file_started(index, queue.len(), file);
            self.fetch_file(file, destination, observer).await?;
            completed_bytes += file.size;
            observer.file_finished(completed_bytes);
            info!(name = %file.name, completed_bytes, "file downloaded");
        }
        Ok(completed_bytes)
    }

    async fn fetch_file(
        &self,
        file: &MediaFile,
        destination: &Path,
        observer: &mut dyn DownloadObserver,
    ) -> Result<(), GpError> {
        let url = format!("{}/{}/{}", self.base_url, MEDIA_ROOT, file.name);
        debug!(%url, "fetching");
        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GpError::Protocol(format!("{url} returned {status}")));
        }

        // Stream into a temp name so an interrupted transfer never leaves a
        // truncated file at the final path.
        let path = destination.join(&file.name);
        let partial = destination.join(format!("{}.part", file.name));
        let result = self
            .stream_to_file(response, &partial, file.size, observer)
            .await;
        if let Err(error) = result {
            let _ = fs::remove_file(&partial).await;
            return Err(error);
        }
        fs::rename(&partial, &path).await?;
        Ok(())
    }

    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        partial: &Path,
        file_size: u64,
        observer: &mut dyn DownloadObserver,
    ) -> Result<(), GpError> {
        let mut output = fs::File::create(partial).await?;
        let mut stream = response.bytes_stream();
        let mut received = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            output.write_all(&chunk).await?;
            received += chunk.len() as u64;
            observer.chunk_transferred(received, file_size);
        }
        output.flush().await?;
        Ok(())
    }
}
