use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressBar;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use transglide_engine::{DisplayOutcome, DownloadProgress, ImageLoader, SourceCallback};

use crate::error::AppError;
use crate::utils::format_bytes;
use crate::utils::progress::{self, ProgressManager};

/// Forwards the outcome of one display request back to the command
struct FetchCallback {
    url: String,
    bar: ProgressBar,
    tx: mpsc::UnboundedSender<(String, DisplayOutcome)>,
}

impl SourceCallback for FetchCallback {
    fn on_start(&self) {
        debug!(url = %self.url, "Fetch started");
    }

    fn on_progress(&self, progress: &DownloadProgress) {
        progress::update(&self.bar, progress);
    }

    fn on_delivered(&self, outcome: DisplayOutcome) {
        self.bar.finish_and_clear();
        let _ = self.tx.send((self.url.clone(), outcome));
    }
}

/// Fetch every URL concurrently and wait until their cache copies have landed
pub async fn fetch(
    loader: &ImageLoader,
    urls: &[String],
    progress: &ProgressManager,
) -> Result<(), AppError> {
    // a repeated URL would replace the first request's callback
    let mut unique: Vec<&String> = Vec::with_capacity(urls.len());
    for url in urls {
        if !unique.contains(&url) {
            unique.push(url);
        }
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    for url in &unique {
        let callback = Arc::new(FetchCallback {
            url: url.to_string(),
            bar: progress.add(url),
            tx: tx.clone(),
        });
        loader.show(url, callback);
    }
    drop(tx);

    let total = unique.len();
    let mut failed = 0;
    while let Some((url, outcome)) = rx.recv().await {
        match outcome {
            DisplayOutcome::Succeeded(path) => {
                let size = tokio::fs::metadata(&path)
                    .await
                    .map(|m| format_bytes(m.len()))
                    .unwrap_or_else(|_| "unknown size".to_owned());
                info!(url = %url, size = %size, "Fetched");
            }
            DisplayOutcome::Failed(e) => {
                failed += 1;
                error!(url = %url, error = %e, "Fetch failed");
            }
        }
    }

    while loader.pending_copies() > 0 {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    for url in &unique {
        match loader.get_cache(url) {
            Some(path) => println!("{url}\t{}", path.display()),
            None => println!("{url}\t-"),
        }
    }

    if failed > 0 {
        return Err(AppError::Failed { failed, total });
    }
    Ok(())
}

/// Decode the cached copy of `url` and print its dimensions
pub async fn get(loader: &ImageLoader, url: String) -> Result<(), AppError> {
    let loader = loader.clone();
    let image = tokio::task::spawn_blocking(move || loader.load_sync(&url)).await??;
    println!(
        "{}x{}\t{}",
        image.width(),
        image.height(),
        image.path().display()
    );
    Ok(())
}

/// Print the cache path of `url`
pub fn path(loader: &ImageLoader, url: &str) -> Result<PathBuf, AppError> {
    let path = loader
        .get_cache(url)
        .ok_or_else(|| transglide_engine::LoaderError::CacheMiss {
            url: url.to_owned(),
        })?;
    println!("{}", path.display());
    Ok(path)
}

/// Wipe the cache directory and the downloader's caches
pub async fn clear(loader: &ImageLoader) -> Result<(), AppError> {
    loader.clear_cache().await?;
    info!(dir = %loader.cache_dir().display(), "Cache cleared");
    Ok(())
}
