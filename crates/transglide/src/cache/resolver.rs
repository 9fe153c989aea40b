//! Mapping from source URLs to cache file paths.
//!
//! The mapping is simple: the file name is whatever follows the
//! last `/` of the URL. It is not injective (`https://a/x.jpg` and
//! `https://b/x.jpg` share an entry) and nothing is escaped, so callers must
//! use URLs whose tails are unique, non-empty file names.

use std::path::{Path, PathBuf};

/// Last `/`-delimited segment of `url`, or the whole string if it has none.
pub fn file_name_for_url(url: &str) -> &str {
    match url.rfind('/') {
        Some(pos) => &url[pos + 1..],
        None => url,
    }
}

/// Whether `name` can address an entry inside the cache directory.
pub fn is_valid_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}

#[derive(Debug, Clone)]
pub struct CacheResolver {
    cache_dir: PathBuf,
}

impl CacheResolver {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Canonical cache path for `url`. Pure; performs no I/O.
    pub fn resolve(&self, url: &str) -> PathBuf {
        self.cache_dir.join(file_name_for_url(url))
    }
}
