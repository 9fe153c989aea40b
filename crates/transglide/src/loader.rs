//! # Image Loader
//!
//! Entry point for UI code. Display requests are tracked in a
//! [`CallbackRegistry`] keyed by URL; background loads close over their
//! callback directly. Every successful download is copied into the cache
//! directory on the side, without delaying the caller's notification.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::cache::{CacheEvictor, CacheLocator, CacheMaterializer, CacheResolver};
use crate::callback::{DisplayOutcome, SourceCallback};
use crate::decoded::DecodedImage;
use crate::downloader::{
    DownloadEvent, DownloadMode, DownloadProgress, DownloadedFile, ImageDownloader,
};
use crate::registry::CallbackRegistry;
use crate::{DownloadError, LoaderConfig, LoaderError};

/// Deduplicating image loader backed by a flat file cache.
///
/// Cloning is cheap; clones share the registry and the cache.
#[derive(Clone)]
pub struct ImageLoader {
    inner: Arc<Inner>,
}

struct Inner {
    config: LoaderConfig,
    downloader: Arc<dyn ImageDownloader>,
    registry: CallbackRegistry,
    locator: CacheLocator,
    materializer: CacheMaterializer,
    evictor: CacheEvictor,
    runtime: Handle,
}

impl ImageLoader {
    /// Create a loader bound to the current tokio runtime
    pub fn new(
        config: LoaderConfig,
        downloader: Arc<dyn ImageDownloader>,
    ) -> Result<Self, LoaderError> {
        let runtime = Handle::try_current().map_err(|e| LoaderError::Runtime(e.to_string()))?;
        Ok(Self::with_runtime(config, downloader, runtime))
    }

    /// Create a loader that spawns its work on `runtime`.
    ///
    /// The loader's methods may then be called from any thread.
    pub fn with_runtime(
        config: LoaderConfig,
        downloader: Arc<dyn ImageDownloader>,
        runtime: Handle,
    ) -> Self {
        let resolver = CacheResolver::new(config.cache_dir());
        let evictor = CacheEvictor::new(
            resolver.cache_dir().to_path_buf(),
            Arc::clone(&downloader),
            runtime.clone(),
        );

        Self {
            inner: Arc::new(Inner {
                locator: CacheLocator::new(resolver.clone()),
                materializer: CacheMaterializer::new(resolver),
                registry: CallbackRegistry::new(),
                evictor,
                downloader,
                config,
                runtime,
            }),
        }
    }

    /// Load `url` for display.
    ///
    /// `callback` gets `on_start` before this returns, then a single
    /// `on_delivered` unless another `show` for the same URL replaces it
    /// while the download is in flight.
    pub fn show(&self, url: &str, callback: Arc<dyn SourceCallback>) {
        let url = url.to_owned();
        self.inner.registry.register(&url, Arc::clone(&callback));
        callback.on_start();

        let inner = Arc::clone(&self.inner);
        self.inner
            .runtime
            .spawn(async move { inner.complete_display(url).await });
    }

    /// Load and decode `url` in the background.
    ///
    /// `callback` runs exactly once, with `None` if the download or the decode
    /// failed.
    pub fn load_async<F>(&self, url: &str, callback: F)
    where
        F: FnOnce(Option<DecodedImage>) + Send + 'static,
    {
        let url = url.to_owned();
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            let image = inner.load_decoded(&url).await;
            callback(image);
        });
    }

    /// Decode the cached entry for `url`. Blocking; never touches the network.
    pub fn load_sync(&self, url: &str) -> Result<DecodedImage, LoaderError> {
        let path = self
            .inner
            .locator
            .lookup(url)
            .ok_or_else(|| LoaderError::CacheMiss {
                url: url.to_owned(),
            })?;
        DecodedImage::open(&path)
    }

    /// Path of the cached entry for `url`, if one exists
    pub fn get_cache(&self, url: &str) -> Option<PathBuf> {
        self.inner.locator.lookup(url)
    }

    /// Clear the cache directory and the downloader's caches in the background.
    ///
    /// The returned handle may be dropped; nothing else signals completion.
    pub fn clear_cache(&self) -> JoinHandle<()> {
        self.inner.evictor.clear_all()
    }

    pub fn cache_dir(&self) -> &Path {
        self.inner.locator.cache_dir()
    }

    /// Number of display requests holding a registered callback
    pub fn in_flight(&self) -> usize {
        self.inner.registry.len()
    }

    /// Number of cache copies still running
    pub fn pending_copies(&self) -> usize {
        self.inner.materializer.in_flight()
    }
}

impl Inner {
    async fn complete_display(&self, url: String) {
        let result = self
            .fetch(&url, DownloadMode::Preload, |progress| {
                self.registry.progress(&url, progress)
            })
            .await;

        match result {
            Ok(file) => {
                self.materializer.materialize(&file.path, &url).await;
                match self
                    .registry
                    .deliver(&url, DisplayOutcome::Succeeded(file.path))
                {
                    Some(delivered) => {
                        self.registry.remove_delivered(&url, &delivered);
                    }
                    None => debug!(url, "Display request finished with no callback left"),
                }
            }
            Err(source) => {
                let error = LoaderError::DownloadFailed {
                    url: url.clone(),
                    source,
                };
                warn!(error = %error, "Display request failed");
                let delivered = self.registry.deliver(&url, DisplayOutcome::Failed(error));
                if let Some(delivered) = delivered.filter(|_| self.config.release_on_failure) {
                    self.registry.remove_delivered(&url, &delivered);
                }
            }
        }
    }

    async fn load_decoded(&self, url: &str) -> Option<DecodedImage> {
        let file = match self.fetch(url, DownloadMode::Decode, |_| {}).await {
            Ok(file) => file,
            Err(source) => {
                let error = LoaderError::DownloadFailed {
                    url: url.to_owned(),
                    source,
                };
                warn!(error = %error, "Background load failed");
                return None;
            }
        };

        self.materializer.materialize(&file.path, url).await;

        let DownloadedFile { path, data, .. } = file;
        let decoded = tokio::task::spawn_blocking(move || match data {
            Some(bytes) => DecodedImage::decode(path, &bytes),
            None => DecodedImage::open(&path),
        })
        .await;

        match decoded {
            Ok(Ok(image)) => Some(image),
            Ok(Err(e)) => {
                warn!(url, error = %e, "Downloaded file is not a decodable image");
                None
            }
            Err(e) => {
                warn!(url, error = %e, "Image decode task failed");
                None
            }
        }
    }

    /// Drive a download to its terminal event
    async fn fetch<F>(
        &self,
        url: &str,
        mode: DownloadMode,
        on_progress: F,
    ) -> Result<DownloadedFile, DownloadError>
    where
        F: Fn(&DownloadProgress),
    {
        let mut events = self.downloader.download(url, mode).await?;

        while let Some(event) = events.next().await {
            match event {
                DownloadEvent::Started => trace!(url, "Download started"),
                DownloadEvent::Progress(progress) => on_progress(&progress),
                DownloadEvent::Succeeded(file) => {
                    debug!(url, source = ?file.source, path = ?file.path, "Download finished");
                    return Ok(file);
                }
                DownloadEvent::Failed(e) => return Err(e),
            }
        }

        Err(DownloadError::Interrupted(url.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ThumbnailCallback;
    use crate::cache::Materialization;
    use crate::test_utils::{
        MockDownloader, RecordingCallback, init_tracing, png_bytes, wait_until,
    };
    use std::time::Duration;
    use tokio::sync::oneshot;

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct Fixture {
        root: tempfile::TempDir,
        downloader: Arc<MockDownloader>,
        loader: ImageLoader,
    }

    impl Fixture {
        fn new(downloader: MockDownloader) -> Self {
            Self::with_config(downloader, |builder| builder)
        }

        fn with_config(
            downloader: MockDownloader,
            configure: impl FnOnce(crate::LoaderConfigBuilder) -> crate::LoaderConfigBuilder,
        ) -> Self {
            init_tracing();
            let root = tempfile::tempdir().unwrap();
            let config = configure(LoaderConfig::builder().with_cache_root(root.path())).build();
            let downloader = Arc::new(downloader);
            let loader = ImageLoader::new(config, downloader.clone()).unwrap();
            Self {
                root,
                downloader,
                loader,
            }
        }

        fn temp_file(&self, name: &str, contents: &[u8]) -> PathBuf {
            let path = self.root.path().join(name);
            std::fs::write(&path, contents).unwrap();
            path
        }

        async fn settle(&self) {
            assert!(
                wait_until(TIMEOUT, || self.downloader.finished() == self.downloader.calls()
                    && self.loader.pending_copies() == 0)
                .await
            );
            // let the completion tasks run past their last await
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    #[tokio::test]
    async fn test_show_success_materializes_and_releases() {
        let fixture = Fixture::new(MockDownloader::new());
        let temp = fixture.temp_file("download.tmp", b"0123456789");
        fixture.downloader.succeed("https://x/a.jpg", &temp);

        let callback = Arc::new(RecordingCallback::default());
        fixture.loader.show("https://x/a.jpg", callback.clone());
        assert_eq!(callback.started_count(), 1);

        assert!(wait_until(TIMEOUT, || callback.terminal_count() == 1).await);
        let outcomes = callback.outcomes();
        match &outcomes[0] {
            DisplayOutcome::Succeeded(path) => assert_eq!(path, &temp),
            other => panic!("Expected success, got {other:?}"),
        }
        drop(outcomes);

        assert!(wait_until(TIMEOUT, || fixture.loader.get_cache("https://x/a.jpg").is_some()).await);
        let cached = fixture.loader.get_cache("https://x/a.jpg").unwrap();
        assert_eq!(cached.file_name().unwrap(), "a.jpg");
        assert_eq!(std::fs::read(cached).unwrap(), b"0123456789");

        fixture.settle().await;
        assert_eq!(fixture.loader.in_flight(), 0);
        assert_eq!(callback.started_count(), 1);
        assert_eq!(callback.terminal_count(), 1);
        assert!(callback.progress_count() >= 1);
    }

    #[tokio::test]
    async fn test_show_failure_delivers_once_and_releases() {
        let fixture = Fixture::new(MockDownloader::new());
        fixture.downloader.fail("https://x/missing.jpg");

        let callback = Arc::new(RecordingCallback::default());
        fixture.loader.show("https://x/missing.jpg", callback.clone());

        assert!(wait_until(TIMEOUT, || callback.terminal_count() == 1).await);
        assert!(matches!(
            callback.outcomes()[0],
            DisplayOutcome::Failed(LoaderError::DownloadFailed { .. })
        ));

        fixture.settle().await;
        assert_eq!(callback.terminal_count(), 1);
        assert_eq!(fixture.loader.in_flight(), 0);
        assert!(fixture.loader.get_cache("https://x/missing.jpg").is_none());
    }

    #[tokio::test]
    async fn test_show_failure_can_keep_callback_registered() {
        let fixture = Fixture::with_config(MockDownloader::new(), |builder| {
            builder.with_release_on_failure(false)
        });
        fixture.downloader.fail("https://x/missing.jpg");

        let callback = Arc::new(RecordingCallback::default());
        fixture.loader.show("https://x/missing.jpg", callback.clone());

        assert!(wait_until(TIMEOUT, || callback.terminal_count() == 1).await);
        fixture.settle().await;
        assert_eq!(fixture.loader.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_overwritten_show_only_notifies_latest_caller() {
        let fixture = Fixture::new(MockDownloader::gated());
        let temp = fixture.temp_file("download.tmp", b"0123456789");
        fixture.downloader.succeed("https://x/a.jpg", &temp);

        let first = Arc::new(RecordingCallback::default());
        let second = Arc::new(RecordingCallback::default());
        fixture.loader.show("https://x/a.jpg", first.clone());
        fixture.loader.show("https://x/a.jpg", second.clone());
        assert_eq!(fixture.loader.in_flight(), 1);

        fixture.downloader.release(2);

        assert!(wait_until(TIMEOUT, || second.terminal_count() == 1).await);
        fixture.settle().await;

        assert_eq!(first.started_count(), 1);
        assert_eq!(first.terminal_count(), 0);
        assert_eq!(second.started_count(), 1);
        assert_eq!(second.terminal_count(), 1);
        assert_eq!(fixture.loader.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_show_from_non_runtime_thread() {
        let fixture = Fixture::new(MockDownloader::new());
        let temp = fixture.temp_file("download.tmp", b"abc");
        fixture.downloader.succeed("https://x/ui.jpg", &temp);

        let callback = Arc::new(RecordingCallback::default());
        let loader = fixture.loader.clone();
        let ui_callback = callback.clone();
        std::thread::spawn(move || loader.show("https://x/ui.jpg", ui_callback))
            .join()
            .unwrap();

        assert!(wait_until(TIMEOUT, || callback.terminal_count() == 1).await);
        assert!(callback.outcomes()[0].is_success());
    }

    #[tokio::test]
    async fn test_load_async_decodes_and_caches() {
        let fixture = Fixture::new(MockDownloader::new());
        let temp = fixture.temp_file("download.tmp", &png_bytes(4, 3));
        fixture.downloader.succeed("https://x/thumb.png", &temp);

        let (tx, rx) = oneshot::channel();
        fixture.loader.load_async("https://x/thumb.png", move |image| {
            let _ = tx.send(image);
        });

        let image = tokio::time::timeout(TIMEOUT, rx).await.unwrap().unwrap();
        let image = image.expect("image should decode");
        assert_eq!((image.width(), image.height()), (4, 3));

        assert!(
            wait_until(TIMEOUT, || fixture.loader.get_cache("https://x/thumb.png").is_some()).await
        );
        // the registry is not involved in background loads
        assert_eq!(fixture.loader.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_load_async_failure_yields_none() {
        let fixture = Fixture::new(MockDownloader::new());

        let (tx, rx) = oneshot::channel();
        let callback: ThumbnailCallback = Box::new(move |image| {
            let _ = tx.send(image);
        });
        fixture.loader.load_async("bad-url", callback);

        let image = tokio::time::timeout(TIMEOUT, rx).await.unwrap().unwrap();
        assert!(image.is_none());
    }

    #[tokio::test]
    async fn test_load_async_undecodable_yields_none() {
        let fixture = Fixture::new(MockDownloader::new());
        let temp = fixture.temp_file("download.tmp", b"not an image");
        fixture.downloader.succeed("https://x/broken.jpg", &temp);

        let (tx, rx) = oneshot::channel();
        fixture.loader.load_async("https://x/broken.jpg", move |image| {
            let _ = tx.send(image);
        });

        let image = tokio::time::timeout(TIMEOUT, rx).await.unwrap().unwrap();
        assert!(image.is_none());
    }

    #[tokio::test]
    async fn test_load_sync_hit_and_miss() {
        let fixture = Fixture::new(MockDownloader::new());

        let err = fixture.loader.load_sync("https://x/pic.png").unwrap_err();
        assert!(matches!(err, LoaderError::CacheMiss { .. }));
        assert_eq!(fixture.downloader.calls(), 0);

        std::fs::create_dir_all(fixture.loader.cache_dir()).unwrap();
        std::fs::write(fixture.loader.cache_dir().join("pic.png"), png_bytes(2, 5)).unwrap();

        let image = fixture.loader.load_sync("https://x/pic.png").unwrap();
        assert_eq!((image.width(), image.height()), (2, 5));
    }

    #[tokio::test]
    async fn test_clear_cache_evicts_everything() {
        let fixture = Fixture::new(MockDownloader::new());
        let materializer = CacheMaterializer::new(CacheResolver::new(fixture.loader.cache_dir()));
        for name in ["a.jpg", "b.jpg"] {
            let temp = fixture.temp_file(name, name.as_bytes());
            let url = format!("https://x/{name}");
            match materializer.materialize(&temp, &url).await {
                Materialization::Scheduled(handle) => handle.await.unwrap(),
                other => panic!("Expected a scheduled copy, got {other:?}"),
            }
            assert!(fixture.loader.get_cache(&url).is_some());
        }

        fixture.loader.clear_cache().await.unwrap();

        assert!(fixture.loader.get_cache("https://x/a.jpg").is_none());
        assert!(fixture.loader.get_cache("https://x/b.jpg").is_none());
        assert!(!fixture.loader.cache_dir().exists());
        assert_eq!(fixture.downloader.drop_count(), 1);
    }

    #[test]
    fn test_new_requires_runtime() {
        let result = ImageLoader::new(LoaderConfig::default(), Arc::new(MockDownloader::new()));
        assert!(matches!(result, Err(LoaderError::Runtime(_))));
    }
}
