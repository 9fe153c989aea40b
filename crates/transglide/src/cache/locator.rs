use std::path::{Path, PathBuf};

use tracing::trace;

use super::CacheResolver;

/// Reports whether a materialized entry exists for a URL.
///
/// Presence is decided by existence alone: any regular file at the canonical
/// path counts as the complete image for that URL.
#[derive(Debug, Clone)]
pub struct CacheLocator {
    resolver: CacheResolver,
}

impl CacheLocator {
    pub fn new(resolver: CacheResolver) -> Self {
        Self { resolver }
    }

    pub fn cache_dir(&self) -> &Path {
        self.resolver.cache_dir()
    }

    /// Blocking lookup. A missing cache directory is a miss.
    pub fn lookup(&self, url: &str) -> Option<PathBuf> {
        let path = self.resolver.resolve(url);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Some(path),
            _ => {
                trace!(url, "Cache miss");
                None
            }
        }
    }
}
