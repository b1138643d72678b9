//! Content Cache - two-tier cache for generated content
//!
//! Caches generated captions and rendered image URLs in a bounded in-process
//! LRU store, optionally backed by Redis. Redis faults degrade to the local
//! store and never reach the caller.

pub mod accessors;
pub mod cache;
pub mod config;
pub mod distributed;
pub mod error;
pub mod facade;
pub mod keys;
pub mod tasks;

pub use cache::{CacheStats, LocalStore};
pub use config::Config;
pub use distributed::{DistributedStore, RedisStore};
pub use error::{CacheError, Result};
pub use facade::ContentCache;
pub use keys::{build_key, normalize};
pub use tasks::spawn_cleanup_task;
