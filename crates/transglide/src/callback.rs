use std::path::PathBuf;

use crate::LoaderError;
use crate::decoded::DecodedImage;
use crate::downloader::DownloadProgress;

/// Terminal result of a display request
#[derive(Debug)]
pub enum DisplayOutcome {
    /// Local file holding the downloaded image
    Succeeded(PathBuf),
    Failed(LoaderError),
}

impl DisplayOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DisplayOutcome::Succeeded(_))
    }
}

/// Receiver of display request notifications.
///
/// A request signals `on_start` once, then at most one `on_delivered`.
/// Implementations are called from runtime worker threads.
pub trait SourceCallback: Send + Sync {
    fn on_start(&self);

    fn on_progress(&self, _progress: &DownloadProgress) {}

    fn on_delivered(&self, outcome: DisplayOutcome);
}

/// Completion handler of a background load; `None` means the load failed.
pub type ThumbnailCallback = Box<dyn FnOnce(Option<DecodedImage>) + Send + 'static>;
