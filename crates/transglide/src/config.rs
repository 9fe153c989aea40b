use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::builder::{DownloaderConfigBuilder, LoaderConfigBuilder};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Name of the cache directory created under the cache root
pub const DEFAULT_CACHE_DIR_NAME: &str = "TransGlide";

/// Configuration for the image loader and its file cache
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Root the cache directory lives under. Defaults to [`default_cache_root`].
    pub cache_root: PathBuf,

    /// Name of the flat cache directory inside `cache_root`
    pub cache_dir_name: String,

    /// Whether a failed display request releases its registered callback.
    ///
    /// When `false` the callback stays registered after `Failed` was delivered,
    /// until a later request for the same URL replaces it.
    pub release_on_failure: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root(),
            cache_dir_name: DEFAULT_CACHE_DIR_NAME.to_owned(),
            release_on_failure: true,
        }
    }
}

/// Per-user cache directory of the platform, or the temp dir where there is none
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir().unwrap_or_else(std::env::temp_dir)
}

impl LoaderConfig {
    pub fn builder() -> LoaderConfigBuilder {
        LoaderConfigBuilder::new()
    }

    /// Full path of the cache directory
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_root.join(&self.cache_dir_name)
    }
}

/// Configurable options for the HTTP downloader
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Overall timeout for the entire HTTP request
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Read timeout (maximum idle time of a pooled connection)
    pub read_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,

    /// Retries for connect errors, timeouts and 5xx responses
    pub max_retries: u32,

    /// Base delay of the exponential retry backoff
    pub retry_delay_base: Duration,

    /// Directory for downloaded files. If None, a directory under the system temp dir is used
    pub disk_cache_path: Option<PathBuf>,

    /// Maximum size of the in-memory byte cache; 0 disables it
    pub max_memory_cache_size: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: DownloaderConfig::get_default_headers(),
            max_retries: 2,
            retry_delay_base: Duration::from_millis(500),
            disk_cache_path: None,
            max_memory_cache_size: 30 * 1024 * 1024, // 30MB
        }
    }
}

impl DownloaderConfig {
    pub fn builder() -> DownloaderConfigBuilder {
        DownloaderConfigBuilder::new()
    }

    /// Directory downloaded files are written to
    pub fn download_dir(&self) -> PathBuf {
        self.disk_cache_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("transglide-downloads"))
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("image/avif,image/webp,image/png,image/*;q=0.8,*/*;q=0.5"),
        );

        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );

        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        default_headers
    }
}
