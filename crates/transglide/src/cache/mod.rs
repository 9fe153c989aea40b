//! # Cache System
//!
//! The durable image cache: a single flat directory whose entries are named
//! after the last path segment of the source URL. Entries are write-once and
//! only disappear when the whole directory is evicted.

mod evictor;
mod locator;
mod materializer;
mod resolver;

pub use evictor::CacheEvictor;
pub use locator::CacheLocator;
pub use materializer::{CacheMaterializer, Materialization};
pub use resolver::{CacheResolver, file_name_for_url, is_valid_file_name};
