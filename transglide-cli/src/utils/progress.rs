use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;
use transglide_engine::DownloadProgress;

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.green/white}] {bytes}/{total_bytes} @ {bytes_per_sec}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

#[derive(Clone)]
pub struct ProgressManager {
    multi: MultiProgress,
    disabled: bool,
}

impl ProgressManager {
    pub fn new(multi: MultiProgress) -> Self {
        Self {
            multi,
            disabled: false,
        }
    }

    pub fn new_disabled(multi: MultiProgress) -> Self {
        Self {
            multi,
            disabled: true,
        }
    }

    /// Bar tracking the download of `url`; hidden when progress is disabled
    pub fn add(&self, url: &str) -> ProgressBar {
        if self.disabled {
            return ProgressBar::hidden();
        }

        let bar = self.multi.add(ProgressBar::new(0));
        bar.set_style(download_style());
        bar.set_message(format!("Fetching {url}"));
        bar.enable_steady_tick(Duration::from_millis(500));
        bar
    }
}

/// Apply a downloader progress report to `bar`
pub fn update(bar: &ProgressBar, progress: &DownloadProgress) {
    if let Some(total) = progress.total_bytes {
        bar.set_length(total);
    }
    bar.set_position(progress.bytes_received);
}
