use std::path::PathBuf;

use reqwest::StatusCode;

// Errors raised by a downloader while fetching a remote image
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(String),

    #[error("Server returned status code {0}")]
    StatusCode(StatusCode),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TLS configuration error: {0}")]
    TlsError(String),

    #[error("Max retries ({retries}) exceeded for {url}: {reason}")]
    RetriesExhausted {
        url: String,
        retries: u32,
        reason: String,
    },

    #[error("Download stream ended without a result: {0}")]
    Interrupted(String),
}

/// Errors surfaced by the image loader.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("Download failed for {url}: {source}")]
    DownloadFailed {
        url: String,
        #[source]
        source: DownloadError,
    },

    #[error("No cache entry for {url}")]
    CacheMiss { url: String },

    /// Never handed to callers; cache copies are best-effort and only logged.
    #[error("Failed to materialize cache entry {path:?}: {source}")]
    MaterializationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No async runtime available: {0}")]
    Runtime(String),
}
