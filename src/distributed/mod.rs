//! Distributed Store Module
//!
//! The optional shared backend behind the local store. Implementations report
//! every fault as an `Err`; the facade decides how to degrade.

mod redis;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use self::redis::{ConnectionState, RedisStore};

/// A remote key/value service holding JSON payloads with a TTL.
#[async_trait]
pub trait DistributedStore: Send + Sync {
    /// Returns the decoded payload, `Ok(None)` on a miss.
    ///
    /// A stored JSON `null` is `Ok(Some(Value::Null))`.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Stores a payload expiring after `ttl_seconds`.
    async fn set(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<()>;

    /// Removes a key, returning whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Removes a batch of keys, returning how many existed.
    async fn delete_many(&self, keys: &[String]) -> Result<u64>;

    /// Lists every key starting with `prefix`, sorted ascending.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Connects if needed and reports whether the backend answers.
    async fn is_available(&self) -> bool;

    /// Drops the connection. Safe to call when never connected.
    async fn close(&self);
}
