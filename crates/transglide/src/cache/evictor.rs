use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::downloader::ImageDownloader;

/// Wipes the cache directory and the downloader's own caches.
///
/// Eviction does not wait for in-flight loads; one finishing afterwards may
/// re-create its entry.
#[derive(Clone)]
pub struct CacheEvictor {
    cache_dir: PathBuf,
    downloader: Arc<dyn ImageDownloader>,
    runtime: Handle,
}

impl CacheEvictor {
    pub fn new(cache_dir: PathBuf, downloader: Arc<dyn ImageDownloader>, runtime: Handle) -> Self {
        Self {
            cache_dir,
            downloader,
            runtime,
        }
    }

    /// Start a detached sweep. The handle may be dropped.
    pub fn clear_all(&self) -> JoinHandle<()> {
        let cache_dir = self.cache_dir.clone();
        let downloader = Arc::clone(&self.downloader);

        self.runtime.spawn(async move {
            if let Err(e) = downloader.drop_caches().await {
                warn!(error = %e, "Downloader failed to drop its caches");
            }

            match fs::remove_dir_all(&cache_dir).await {
                Ok(()) => info!(dir = ?cache_dir, "Cache directory cleared"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(dir = ?cache_dir, "Cache directory already absent")
                }
                Err(e) => warn!(dir = ?cache_dir, error = %e, "Failed to clear cache directory"),
            }
        })
    }
}
