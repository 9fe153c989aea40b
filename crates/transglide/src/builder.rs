//! # Configuration builders
//!
//! Fluent builders for [`LoaderConfig`] and [`DownloaderConfig`].
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use transglide_engine::{DownloaderConfig, LoaderConfig};
//!
//! let loader_config = LoaderConfig::builder()
//!     .with_cache_root("/var/cache/gallery")
//!     .with_cache_dir_name("thumbs")
//!     .build();
//! assert!(loader_config.cache_dir().ends_with("thumbs"));
//!
//! let downloader_config = DownloaderConfig::builder()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_user_agent("Gallery/1.0")
//!     .with_header("X-Api-Key", "my-secret-key")
//!     .with_max_retries(4)
//!     .build();
//! assert_eq!(downloader_config.max_retries, 4);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::{DownloaderConfig, LoaderConfig};

/// Builder for creating LoaderConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct LoaderConfigBuilder {
    config: LoaderConfig,
}

impl LoaderConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
        }
    }

    /// Set the root directory the cache directory is created under
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.cache_root = root.into();
        self
    }

    /// Set the name of the cache directory
    pub fn with_cache_dir_name(mut self, name: impl Into<String>) -> Self {
        self.config.cache_dir_name = name.into();
        self
    }

    /// Set whether failed display requests release their callback
    pub fn with_release_on_failure(mut self, release: bool) -> Self {
        self.config.release_on_failure = release;
        self
    }

    pub fn build(self) -> LoaderConfig {
        self.config
    }
}

impl Default for LoaderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating DownloaderConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct DownloaderConfigBuilder {
    /// Internal config being built
    config: DownloaderConfig,
}

impl DownloaderConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: DownloaderConfig::default(),
        }
    }

    /// Set the overall timeout for the entire HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout (time to establish initial connection)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set whether to follow redirects
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.headers.insert(name, value);
        }
        self
    }

    /// Merge headers into the configured set, overriding existing names
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.config.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Set how many times transient failures are retried
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the base delay of the retry backoff
    pub fn with_retry_delay_base(mut self, delay: Duration) -> Self {
        self.config.retry_delay_base = delay;
        self
    }

    /// Set the directory downloaded files are stored in
    pub fn with_disk_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.disk_cache_path = Some(path.into());
        self
    }

    /// Set the memory cache budget in bytes
    pub fn with_max_memory_cache_size(mut self, bytes: u64) -> Self {
        self.config.max_memory_cache_size = bytes;
        self
    }

    /// Build the DownloaderConfig instance
    pub fn build(self) -> DownloaderConfig {
        self.config
    }
}

impl Default for DownloaderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
