//! # Downloader boundary
//!
//! The loader never talks to the network itself. It hands URLs to an
//! [`ImageDownloader`] and reacts to the events of the returned stream. The
//! crate ships [`HttpDownloader`] as a reqwest-backed implementation.

mod client;
mod http;
mod memory;

use std::path::PathBuf;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::DownloadError;

pub use client::create_client;
pub use http::HttpDownloader;

/// How far the downloader should take a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    /// Fetch to a local file only
    Preload,
    /// Fetch and also hand back the bytes for decoding
    Decode,
}

/// Where a successful download was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Remote,
    DiskCache,
    MemoryCache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub bytes_received: u64,
    pub total_bytes: Option<u64>,
}

/// A completed download
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    /// Local file owned by the downloader; must be copied, not moved
    pub path: PathBuf,
    pub source: DataSource,
    /// File contents, present in [`DownloadMode::Decode`]
    pub data: Option<Bytes>,
}

#[derive(Debug)]
pub enum DownloadEvent {
    Started,
    Progress(DownloadProgress),
    Succeeded(DownloadedFile),
    Failed(DownloadError),
}

/// A type alias for a boxed download event stream
pub type DownloadStream = Pin<Box<dyn Stream<Item = DownloadEvent> + Send>>;

/// External component that fetches images to local files.
///
/// A stream ends after its first `Succeeded` or `Failed` event.
#[async_trait]
pub trait ImageDownloader: Send + Sync + 'static {
    /// Start fetching `url`. An `Err` means the request never started.
    async fn download(
        &self,
        url: &str,
        mode: DownloadMode,
    ) -> Result<DownloadStream, DownloadError>;

    /// Drop every disk and memory cache the downloader keeps.
    async fn drop_caches(&self) -> Result<(), DownloadError>;
}
