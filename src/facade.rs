//! Cache Facade
//!
//! [`ContentCache`] puts the local store and the optional distributed store
//! behind one get/set/delete/clear contract. Backend faults never reach the
//! caller: reads fall back to the local store, distributed writes are
//! best-effort, and only caller mistakes surface as errors.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, LocalStore};
use crate::config::Config;
use crate::distributed::{DistributedStore, RedisStore};
use crate::error::{CacheError, Result};
use crate::keys::all_keys_prefix;
use crate::tasks::spawn_cleanup_task;

// == Content Cache ==
/// Two-tier cache shared by every request handler in the process.
///
/// Build one at startup with [`ContentCache::from_config`], share it behind an
/// `Arc`, and call [`ContentCache::close`] on shutdown. Tests build isolated
/// instances with [`ContentCache::new`] or [`ContentCache::local_only`].
///
/// Expired local entries are dropped when read. Nothing sweeps them in the
/// background until the owner calls [`ContentCache::spawn_cleanup`].
#[derive(Clone)]
pub struct ContentCache {
    local: LocalStore,
    remote: Option<Arc<dyn DistributedStore>>,
}

impl ContentCache {
    // == Constructors ==
    pub fn new(local: LocalStore, remote: Option<Arc<dyn DistributedStore>>) -> Self {
        Self { local, remote }
    }

    /// Cache without a distributed store.
    pub fn local_only(max_entries: usize) -> Self {
        Self::new(LocalStore::new(max_entries), None)
    }

    /// Builds the cache from configuration.
    ///
    /// No connection is opened here. A missing `redis_url` selects local-only
    /// mode, and so does an unparsable one (after a warning).
    pub fn from_config(config: &Config) -> Self {
        let local = LocalStore::new(config.max_entries);

        let remote = config.redis_url.as_deref().and_then(|url| {
            match RedisStore::open(url, config.connect_timeout(), config.operation_timeout()) {
                Ok(store) => {
                    info!("Distributed cache configured");
                    Some(Arc::new(store) as Arc<dyn DistributedStore>)
                }
                Err(err) => {
                    warn!(error = %err, "Invalid REDIS_URL, running with local cache only");
                    None
                }
            }
        });

        if remote.is_none() {
            info!("Running with local cache only");
        }

        Self::new(local, remote)
    }

    pub fn has_distributed(&self) -> bool {
        self.remote.is_some()
    }

    /// Handle to the local store, e.g. for the cleanup task.
    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn stats(&self) -> CacheStats {
        self.local.stats()
    }

    /// Starts the periodic sweep of expired local entries.
    ///
    /// Must be called from inside a Tokio runtime. Abort the returned handle
    /// on shutdown.
    pub fn spawn_cleanup(&self, config: &Config) -> JoinHandle<()> {
        spawn_cleanup_task(self.local.clone(), config.cleanup_interval)
    }

    // == Get ==
    /// Looks up `key`, preferring the distributed store.
    ///
    /// Returns `None` on a miss in both stores. A stored JSON `null` is a hit:
    /// request `Option<T>` or `Value` to observe it as `Some(None)` /
    /// `Some(Value::Null)`. A payload that does not decode into `T` counts as
    /// a miss for that store.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(remote) = &self.remote {
            match remote.get(key).await {
                Ok(Some(value)) => match serde_json::from_value(value) {
                    Ok(decoded) => {
                        debug!(key, "Distributed cache hit");
                        return Some(decoded);
                    }
                    Err(err) => {
                        warn!(key, error = %err, "Distributed cache value has unexpected shape");
                    }
                },
                Ok(None) => debug!(key, "Distributed cache miss"),
                Err(err) => {
                    warn!(key, error = %err, "Distributed cache read failed, using local store");
                }
            }
        }

        // Decoded under the store lock so a wrong shape is counted as a miss
        self.local.get_with(key, |value| match T::deserialize(value) {
            Ok(decoded) => {
                debug!(key, "Local cache hit");
                Some(decoded)
            }
            Err(err) => {
                warn!(key, error = %err, "Local cache value has unexpected shape");
                None
            }
        })
    }

    // == Set ==
    /// Stores `value` for `ttl_seconds` in the local store and, best-effort,
    /// in the distributed store.
    ///
    /// # Errors
    /// `InvalidRequest` for an empty key or a zero TTL, and
    /// `Serialization` when `value` cannot be represented as JSON. Distributed
    /// store failures are logged and never returned.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> Result<()> {
        validate_key(key)?;
        if ttl_seconds == 0 {
            return Err(CacheError::InvalidRequest(
                "TTL must be at least one second".to_string(),
            ));
        }

        let value = serde_json::to_value(value)?;
        self.local.set(key, value.clone(), ttl_seconds);

        if let Some(remote) = &self.remote {
            if let Err(err) = remote.set(key, &value, ttl_seconds).await {
                warn!(key, error = %err, "Distributed cache write skipped");
            }
        }

        Ok(())
    }

    // == Delete ==
    /// Removes `key` from both stores, returning whether either held it.
    pub async fn delete(&self, key: &str) -> bool {
        let remote_existed = match &self.remote {
            Some(remote) => remote.delete(key).await.unwrap_or_else(|err| {
                warn!(key, error = %err, "Distributed cache delete failed");
                false
            }),
            None => false,
        };

        let local_existed = self.local.delete(key);
        remote_existed || local_existed
    }

    // == Clear ==
    /// Removes every `cache:` key from the distributed store and flushes the
    /// local store.
    pub async fn clear(&self) {
        if let Some(remote) = &self.remote {
            match remote.keys_with_prefix(&all_keys_prefix()).await {
                Ok(keys) => match remote.delete_many(&keys).await {
                    Ok(removed) => info!(removed, "Cleared distributed cache"),
                    Err(err) => warn!(error = %err, "Distributed cache clear failed"),
                },
                Err(err) => warn!(error = %err, "Listing distributed cache keys failed"),
            }
        }

        self.local.clear();
        info!("Cleared local cache");
    }

    // == Availability ==
    /// Whether the distributed store is configured and answering.
    ///
    /// Returns `false` without any network activity in local-only mode.
    pub async fn is_redis_available(&self) -> bool {
        match &self.remote {
            Some(remote) => remote.is_available().await,
            None => false,
        }
    }

    // == Close ==
    /// Tears down the distributed connection. Idempotent.
    pub async fn close(&self) {
        if let Some(remote) = &self.remote {
            remote.close().await;
        }
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest(
            "Key must not be empty".to_string(),
        ));
    }
    Ok(())
}
