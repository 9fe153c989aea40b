//! # HTTP Downloader
//!
//! Fetches images over HTTP(S) into a download directory. Files are named by
//! the SHA-256 of their URL, so a URL that was fetched once is served from disk
//! until [`drop_caches`](ImageDownloader::drop_caches) runs. In decode mode the
//! bytes are also kept in a bounded memory cache.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::client::create_client;
use super::memory::MemoryCache;
use super::{
    DataSource, DownloadEvent, DownloadMode, DownloadProgress, DownloadStream, DownloadedFile,
    ImageDownloader,
};
use crate::{DownloadError, DownloaderConfig};

const EVENT_CHANNEL_SIZE: usize = 16;
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct HttpDownloader {
    client: Client,
    config: Arc<DownloaderConfig>,
    download_dir: PathBuf,
    memory: MemoryCache,
}

impl HttpDownloader {
    pub fn new(config: DownloaderConfig) -> Result<Self, DownloadError> {
        let client = create_client(&config)?;
        Ok(Self::with_client(config, client))
    }

    /// Use a preconfigured client instead of building one from `config`
    pub fn with_client(config: DownloaderConfig, client: Client) -> Self {
        let download_dir = config.download_dir();
        let memory = MemoryCache::new(config.max_memory_cache_size);
        Self {
            client,
            config: Arc::new(config),
            download_dir,
            memory,
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Local file a URL is downloaded to
    pub fn file_path(&self, url: &str) -> PathBuf {
        let hash = Sha256::digest(url.as_bytes());
        self.download_dir.join(format!("{hash:x}"))
    }

    async fn run(self, url: Url, mode: DownloadMode, tx: mpsc::Sender<DownloadEvent>) {
        let _ = tx.send(DownloadEvent::Started).await;

        let event = match self.fetch(&url, mode, &tx).await {
            Ok(file) => DownloadEvent::Succeeded(file),
            Err(e) => {
                debug!(url = %url, error = %e, "Image download failed");
                DownloadEvent::Failed(e)
            }
        };
        let _ = tx.send(event).await;
    }

    async fn fetch(
        &self,
        url: &Url,
        mode: DownloadMode,
        tx: &mpsc::Sender<DownloadEvent>,
    ) -> Result<DownloadedFile, DownloadError> {
        let key = url.to_string();
        let path = self.file_path(&key);
        let on_disk = fs::try_exists(&path).await.unwrap_or(false);

        if mode == DownloadMode::Decode && on_disk {
            if let Some(data) = self.memory.get(&key).await {
                debug!(url = %url, "Serving image from memory cache");
                return Ok(DownloadedFile {
                    path,
                    source: DataSource::MemoryCache,
                    data: Some(data),
                });
            }
        }

        let source = if on_disk {
            debug!(url = %url, path = ?path, "Serving image from download directory");
            DataSource::DiskCache
        } else {
            self.fetch_with_retries(url, &path, tx).await?;
            DataSource::Remote
        };

        let data = match mode {
            DownloadMode::Preload => None,
            DownloadMode::Decode => {
                let data = Bytes::from(fs::read(&path).await?);
                self.memory.put(key, data.clone()).await;
                Some(data)
            }
        };

        Ok(DownloadedFile { path, source, data })
    }

    /// Fetches with retry logic.
    /// Retries on connect errors, timeouts and server errors (5xx).
    async fn fetch_with_retries(
        &self,
        url: &Url,
        target: &Path,
        tx: &mpsc::Sender<DownloadEvent>,
    ) -> Result<(), DownloadError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.fetch_once(url, target, tx).await {
                Ok(()) => return Ok(()),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => {
                    if attempts > self.config.max_retries {
                        return Err(DownloadError::RetriesExhausted {
                            url: url.to_string(),
                            retries: self.config.max_retries,
                            reason: e.to_string(),
                        });
                    }
                    warn!(url = %url, attempt = attempts, error = %e, "Retrying image download");
                }
            }

            tokio::time::sleep(retry_delay(self.config.retry_delay_base, attempts)).await;
        }
    }

    async fn fetch_once(
        &self,
        url: &Url,
        target: &Path,
        tx: &mpsc::Sender<DownloadEvent>,
    ) -> Result<(), DownloadError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::StatusCode(status));
        }

        let total_bytes = response.content_length();
        fs::create_dir_all(&self.download_dir).await?;

        // unique per attempt so concurrent fetches of one URL never share a file
        let part = target.with_extension(format!("{}.part", Uuid::new_v4().simple()));
        let mut file = fs::File::create(&part).await?;
        let mut body = response.bytes_stream();
        let mut bytes_received = 0u64;

        let written: Result<(), DownloadError> = async {
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                bytes_received += chunk.len() as u64;
                let _ = tx
                    .send(DownloadEvent::Progress(DownloadProgress {
                        bytes_received,
                        total_bytes,
                    }))
                    .await;
            }
            file.flush().await?;
            Ok(())
        }
        .await;
        drop(file);

        if let Err(e) = written {
            let _ = fs::remove_file(&part).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&part, target).await {
            let _ = fs::remove_file(&part).await;
            return Err(e.into());
        }

        debug!(url = %url, bytes = bytes_received, "Downloaded image");
        Ok(())
    }
}

/// Exponential backoff after the `attempt`-th failure, capped at [`MAX_RETRY_DELAY`]
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

fn is_retryable(err: &DownloadError) -> bool {
    match err {
        DownloadError::HttpError(e) => e.is_connect() || e.is_timeout() || e.is_request(),
        DownloadError::StatusCode(status) => status.is_server_error(),
        _ => false,
    }
}

#[async_trait]
impl ImageDownloader for HttpDownloader {
    async fn download(
        &self,
        url: &str,
        mode: DownloadMode,
    ) -> Result<DownloadStream, DownloadError> {
        let url = Url::parse(url).map_err(|e| DownloadError::UrlError(format!("{url}: {e}")))?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        tokio::spawn(self.clone().run(url, mode, tx));

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn drop_caches(&self) -> Result<(), DownloadError> {
        self.memory.clear().await;

        match fs::remove_dir_all(&self.download_dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
