//! # Test Utilities
//!
//! Shared fixtures for the loader tests: a scripted downloader, a recording
//! callback and small filesystem helpers.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use image::{DynamicImage, ImageFormat, RgbaImage};
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::DownloadError;
use crate::callback::{DisplayOutcome, SourceCallback};
use crate::downloader::{
    DataSource, DownloadEvent, DownloadMode, DownloadProgress, DownloadStream, DownloadedFile,
    ImageDownloader,
};

/// Initialize tracing for tests with appropriate settings
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer() // Write to test output
        .try_init();
}

/// Number of regular files directly inside `dir`
pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|entry| entry.path().is_file())
                .count()
        })
        .unwrap_or(0)
}

/// Encode a solid `width` x `height` PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        image::Rgba([200, 40, 40, 255]),
    ));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Callback that records everything it is told
#[derive(Default)]
pub struct RecordingCallback {
    started: AtomicUsize,
    progress: AtomicUsize,
    outcomes: Mutex<Vec<DisplayOutcome>>,
}

impl RecordingCallback {
    pub fn started_count(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn progress_count(&self) -> usize {
        self.progress.load(Ordering::SeqCst)
    }

    pub fn terminal_count(&self) -> usize {
        self.outcomes.lock().len()
    }

    pub fn outcomes(&self) -> MutexGuard<'_, Vec<DisplayOutcome>> {
        self.outcomes.lock()
    }
}

impl SourceCallback for RecordingCallback {
    fn on_start(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_progress(&self, _progress: &DownloadProgress) {
        self.progress.fetch_add(1, Ordering::SeqCst);
    }

    fn on_delivered(&self, outcome: DisplayOutcome) {
        self.outcomes.lock().push(outcome);
    }
}

#[derive(Clone)]
enum Scripted {
    Succeed(PathBuf),
    Fail,
}

/// Downloader answering from a per-URL script.
///
/// Unscripted URLs are rejected up front, like a malformed URL would be. A
/// gated downloader holds every terminal event until [`release`](Self::release)
/// hands out a permit.
pub struct MockDownloader {
    script: Mutex<HashMap<String, Scripted>>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    finished: Arc<AtomicUsize>,
    drops: AtomicUsize,
}

impl MockDownloader {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn gated() -> Self {
        Self::build(Some(Arc::new(Semaphore::new(0))))
    }

    fn build(gate: Option<Arc<Semaphore>>) -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            gate,
            calls: AtomicUsize::new(0),
            finished: Arc::new(AtomicUsize::new(0)),
            drops: AtomicUsize::new(0),
        }
    }

    /// Serve `url` from `path`
    pub fn succeed(&self, url: &str, path: &Path) {
        self.script
            .lock()
            .insert(url.to_owned(), Scripted::Succeed(path.to_path_buf()));
    }

    /// Answer `url` with a server error
    pub fn fail(&self, url: &str) {
        self.script.lock().insert(url.to_owned(), Scripted::Fail);
    }

    /// Let `n` held downloads finish
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Number of `download` calls
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of downloads that produced a terminal result
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn drop_count(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageDownloader for MockDownloader {
    async fn download(
        &self,
        url: &str,
        mode: DownloadMode,
    ) -> Result<DownloadStream, DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let Some(scripted) = self.script.lock().get(url).cloned() else {
            self.finished.fetch_add(1, Ordering::SeqCst);
            return Err(DownloadError::UrlError(url.to_owned()));
        };

        let gate = self.gate.clone();
        let finished = Arc::clone(&self.finished);
        let terminal = async move {
            if let Some(gate) = gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }

            let event = match scripted {
                Scripted::Succeed(path) => {
                    let data = match mode {
                        DownloadMode::Preload => None,
                        DownloadMode::Decode => std::fs::read(&path).ok().map(Into::into),
                    };
                    DownloadEvent::Succeeded(DownloadedFile {
                        path,
                        source: DataSource::Remote,
                        data,
                    })
                }
                Scripted::Fail => DownloadEvent::Failed(DownloadError::StatusCode(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                )),
            };
            finished.fetch_add(1, Ordering::SeqCst);
            event
        };

        let progress = DownloadEvent::Progress(DownloadProgress {
            bytes_received: 1,
            total_bytes: None,
        });
        let events = stream::iter([DownloadEvent::Started, progress]).chain(stream::once(terminal));
        Ok(events.boxed())
    }

    async fn drop_caches(&self) -> Result<(), DownloadError> {
        self.drops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
