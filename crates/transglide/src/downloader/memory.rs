//! Size-bounded in-memory cache of downloaded image bytes, using Moka.

use bytes::Bytes;
use moka::future::Cache as MokaCache;
use tracing::debug;

#[derive(Clone)]
pub(crate) struct MemoryCache {
    cache: MokaCache<String, Bytes>,
    max_size: u64,
}

impl MemoryCache {
    pub(crate) fn new(max_size_bytes: u64) -> Self {
        // Size based eviction
        let cache = MokaCache::builder()
            .weigher(|_k, v: &Bytes| v.len().try_into().unwrap_or(u32::MAX))
            .max_capacity(max_size_bytes)
            .build();

        debug!(max_size = max_size_bytes, "Memory cache created");

        Self {
            cache,
            max_size: max_size_bytes,
        }
    }

    pub(crate) async fn get(&self, url: &str) -> Option<Bytes> {
        self.cache.get(url).await
    }

    pub(crate) async fn put(&self, url: String, data: Bytes) {
        // A single entry shouldn't be larger than the total cache size
        if data.len() as u64 > self.max_size {
            debug!(
                url,
                size = data.len(),
                max_size = self.max_size,
                "Entry too large for memory cache, skipping"
            );
            return;
        }
        self.cache.insert(url, data).await;
    }

    pub(crate) async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}
