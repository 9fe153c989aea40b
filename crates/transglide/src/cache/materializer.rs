//! # Cache Materializer
//!
//! Promotes a completed download into the cache directory. The copy runs on a
//! detached task and its failures are logged and dropped; the outcome delivered
//! to callers never depends on it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashSet;
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{CacheResolver, file_name_for_url, is_valid_file_name};
use crate::LoaderError;

/// What a call to [`CacheMaterializer::materialize`] did
#[derive(Debug)]
pub enum Materialization {
    /// A background copy was started
    Scheduled(JoinHandle<()>),
    /// An entry already exists at the target path
    AlreadyCached,
    /// Another copy to the same target is still running
    InFlight,
    /// The entry cannot be written (invalid name or unusable cache directory)
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct CacheMaterializer {
    resolver: CacheResolver,
    // targets with a copy in progress
    pending: Arc<DashSet<PathBuf>>,
}

impl CacheMaterializer {
    pub fn new(resolver: CacheResolver) -> Self {
        Self {
            resolver,
            pending: Arc::new(DashSet::new()),
        }
    }

    /// Copy `temp_file` to the cache entry for `url` unless it is already present.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn materialize(&self, temp_file: &Path, url: &str) -> Materialization {
        if !is_valid_file_name(file_name_for_url(url)) {
            warn!(url, "URL does not end in a usable file name, not caching");
            return Materialization::Unavailable;
        }

        let cache_dir = self.resolver.cache_dir();
        if let Err(source) = fs::create_dir_all(cache_dir).await {
            let err = LoaderError::MaterializationFailed {
                path: cache_dir.to_path_buf(),
                source,
            };
            warn!(error = %err, "Failed to create cache directory");
            return Materialization::Unavailable;
        }

        let target = self.resolver.resolve(url);

        // Claim the target before checking existence so a copy finishing in
        // between is observed by the check below.
        if !self.pending.insert(target.clone()) {
            debug!(url, "Cache copy already in flight");
            return Materialization::InFlight;
        }

        if fs::try_exists(&target).await.unwrap_or(false) {
            self.pending.remove(&target);
            debug!(url, path = ?target, "Cache entry already present");
            return Materialization::AlreadyCached;
        }

        let pending = Arc::clone(&self.pending);
        let source = temp_file.to_path_buf();
        let handle = tokio::spawn(async move {
            match copy_into_place(&source, &target).await {
                Ok(bytes) => debug!(path = ?target, bytes, "Materialized cache entry"),
                Err(source) => {
                    let err = LoaderError::MaterializationFailed {
                        path: target.clone(),
                        source,
                    };
                    warn!(error = %err, "Dropping failed cache copy");
                }
            }
            pending.remove(&target);
        });

        Materialization::Scheduled(handle)
    }

    /// Number of copies currently running
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}

/// Copies through a uniquely named sibling and renames it over `target`, so the
/// entry only ever appears complete.
async fn copy_into_place(source: &Path, target: &Path) -> std::io::Result<u64> {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = target.with_file_name(format!(".{name}.{}.part", Uuid::new_v4().simple()));

    let bytes = match fs::copy(source, &temp).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = fs::remove_file(&temp).await;
            return Err(e);
        }
    };

    if let Err(e) = fs::rename(&temp, target).await {
        let _ = fs::remove_file(&temp).await;
        return Err(e);
    }

    Ok(bytes)
}
