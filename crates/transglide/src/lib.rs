//! # TransGlide
//!
//! An image loader for UI code. Requests are handed to a pluggable
//! [`ImageDownloader`], results come back through callbacks, and every
//! successfully downloaded image is copied into a flat, durable cache
//! directory that can be read synchronously.
//!
//! ## Features
//!
//! - Display requests tracked per URL, with at most one live callback each
//! - Background decoding into [`DecodedImage`]
//! - Name-addressed cache entries that are written once, atomically
//! - A reqwest based [`HttpDownloader`] with retries and a memory cache
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use transglide_engine::{DownloaderConfig, HttpDownloader, ImageLoader, LoaderConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = Arc::new(HttpDownloader::new(DownloaderConfig::default())?);
//! let loader = ImageLoader::new(LoaderConfig::default(), downloader)?;
//!
//! loader.load_async("https://example.com/cat.png", |image| {
//!     if let Some(image) = image {
//!         println!("{}x{}", image.width(), image.height());
//!     }
//! });
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cache;
pub mod callback;
pub mod config;
pub mod decoded;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod registry;

#[cfg(test)]
mod test_utils;

pub use builder::{DownloaderConfigBuilder, LoaderConfigBuilder};
pub use config::{DEFAULT_CACHE_DIR_NAME, DownloaderConfig, LoaderConfig};
pub use error::{DownloadError, LoaderError};

pub use callback::{DisplayOutcome, SourceCallback, ThumbnailCallback};
pub use decoded::DecodedImage;
pub use loader::ImageLoader;
pub use registry::CallbackRegistry;

// Re-export the cache and downloader building blocks
pub use cache::{CacheEvictor, CacheLocator, CacheMaterializer, CacheResolver, Materialization};
pub use downloader::{
    DataSource, DownloadEvent, DownloadMode, DownloadProgress, DownloadStream, DownloadedFile,
    HttpDownloader, ImageDownloader, create_client,
};
