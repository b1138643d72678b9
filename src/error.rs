//! Error types for the content cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Only `InvalidRequest` and `Serialization` are ever returned to callers of
/// [`ContentCache`](crate::ContentCache). The remaining variants describe
/// backend faults and are contained inside the facade.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Caller passed a key or TTL the cache cannot accept
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Value could not be encoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Redis client or command failure
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Connection or command exceeded its deadline
    #[error("Distributed store operation timed out")]
    Timeout,

    /// Backend is not reachable
    #[error("Distributed store unavailable: {0}")]
    Unavailable(String),
}

impl CacheError {
    /// Returns true for errors that originate from a backend rather than the caller.
    pub fn is_backend_fault(&self) -> bool {
        !matches!(
            self,
            CacheError::InvalidRequest(_) | CacheError::Serialization(_)
        )
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
