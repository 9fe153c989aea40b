//! # Callback Registry
//!
//! Routes asynchronous completions back to the caller that asked for them.
//! Keys are request URLs, so there is at most one callback per URL: a second
//! registration for a key that is still in flight replaces the first, and the
//! replaced caller receives no terminal delivery.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::callback::{DisplayOutcome, SourceCallback};
use crate::downloader::DownloadProgress;

pub type CallbackRef = Arc<dyn SourceCallback>;

#[derive(Default)]
pub struct CallbackRegistry {
    entries: DashMap<String, CallbackRef>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `callback` under `key`, returning the callback it replaced.
    pub fn register(&self, key: &str, callback: CallbackRef) -> Option<CallbackRef> {
        let displaced = self.entries.insert(key.to_owned(), callback);
        if displaced.is_some() {
            warn!(key, "In-flight callback replaced by a newer request for the same URL");
        }
        displaced
    }

    /// Hand `outcome` to the callback registered under `key`, if any.
    ///
    /// The entry is left in place; returns the callback that was invoked.
    pub fn deliver(&self, key: &str, outcome: DisplayOutcome) -> Option<CallbackRef> {
        // clone out of the shard guard so the callback may re-enter the registry
        let Some(callback) = self.lookup(key) else {
            debug!(key, "No callback registered, dropping outcome");
            return None;
        };
        callback.on_delivered(outcome);
        Some(callback)
    }

    /// Forward download progress to the registered callback
    pub fn progress(&self, key: &str, progress: &DownloadProgress) {
        if let Some(callback) = self.lookup(key) {
            callback.on_progress(progress);
        }
    }

    /// Unconditionally remove the entry for `key`
    pub fn remove(&self, key: &str) -> Option<CallbackRef> {
        self.entries.remove(key).map(|(_, callback)| callback)
    }

    /// Remove the entry for `key` only if it still holds `delivered`.
    ///
    /// A registration that replaced `delivered` after delivery is kept.
    pub fn remove_delivered(&self, key: &str, delivered: &CallbackRef) -> bool {
        self.entries
            .remove_if(key, |_, current| Arc::ptr_eq(current, delivered))
            .is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, key: &str) -> Option<CallbackRef> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }
}
