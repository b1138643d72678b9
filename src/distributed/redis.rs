//! Redis Store
//!
//! [`DistributedStore`] over a single lazily-opened multiplexed Redis connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ::redis::aio::MultiplexedConnection;
use ::redis::{Client, Cmd, FromRedisValue};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use super::DistributedStore;
use crate::error::{CacheError, Result};

/// Number of keys requested per SCAN round trip.
const SCAN_BATCH: usize = 200;

// == Connection State ==
/// Observable lifecycle of the Redis connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected, or closed
    Idle,
    Connected,
    /// Last attempt failed; the next operation reconnects
    Disconnected(String),
}

enum Link {
    Idle,
    Connected(MultiplexedConnection),
    Disconnected(String),
}

// == Redis Store ==
pub struct RedisStore {
    client: Client,
    /// Held only to read or swap the link, never across network I/O
    link: Mutex<Link>,
    /// Serializes connection attempts
    connecting: Mutex<()>,
    /// Count of failed connection attempts
    failed_attempts: AtomicU64,
    connect_timeout: Duration,
    operation_timeout: Duration,
}

impl RedisStore {
    // == Constructor ==
    /// Parses the endpoint without connecting.
    ///
    /// # Arguments
    /// * `url` - Redis URL such as `redis://127.0.0.1:6379/0`
    /// * `connect_timeout` - Deadline for establishing the connection
    /// * `operation_timeout` - Deadline for each command
    pub fn open(url: &str, connect_timeout: Duration, operation_timeout: Duration) -> Result<Self> {
        let client = Client::open(url)?;
        Ok(Self {
            client,
            link: Mutex::new(Link::Idle),
            connecting: Mutex::new(()),
            failed_attempts: AtomicU64::new(0),
            connect_timeout,
            operation_timeout,
        })
    }

    pub async fn state(&self) -> ConnectionState {
        match &*self.link.lock().await {
            Link::Idle => ConnectionState::Idle,
            Link::Connected(_) => ConnectionState::Connected,
            Link::Disconnected(reason) => ConnectionState::Disconnected(reason.clone()),
        }
    }

    // == Connection ==
    /// Returns the shared connection, opening it first if needed.
    ///
    /// At most one attempt runs at a time. Callers that queued behind an
    /// attempt which then failed return `Unavailable` instead of starting
    /// their own. Waiting plus connecting is bounded by `connect_timeout`.
    /// The next call after a failure tries again.
    async fn connection(&self) -> Result<MultiplexedConnection> {
        let deadline = Instant::now() + self.connect_timeout;
        let failures_seen = self.failed_attempts.load(Ordering::SeqCst);

        if let Some(conn) = self.current().await {
            return Ok(conn);
        }

        let _attempt = timeout_at(deadline, self.connecting.lock())
            .await
            .map_err(|_| {
                CacheError::Unavailable("connection attempt still in progress".to_string())
            })?;

        // Another caller finished an attempt while we waited
        if let Some(conn) = self.current().await {
            return Ok(conn);
        }
        if self.failed_attempts.load(Ordering::SeqCst) != failures_seen {
            return Err(CacheError::Unavailable(self.last_failure().await));
        }

        match timeout_at(deadline, self.client.get_multiplexed_async_connection()).await {
            Ok(Ok(conn)) => {
                info!("Connected to Redis");
                *self.link.lock().await = Link::Connected(conn.clone());
                Ok(conn)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "Redis connection failed");
                self.record_failure(err.to_string()).await;
                Err(err.into())
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.connect_timeout.as_millis() as u64,
                    "Redis connection timed out"
                );
                self.record_failure("connection timed out".to_string()).await;
                Err(CacheError::Timeout)
            }
        }
    }

    async fn current(&self) -> Option<MultiplexedConnection> {
        match &*self.link.lock().await {
            Link::Connected(conn) => Some(conn.clone()),
            _ => None,
        }
    }

    async fn record_failure(&self, reason: String) {
        *self.link.lock().await = Link::Disconnected(reason);
        self.failed_attempts.fetch_add(1, Ordering::SeqCst);
    }

    async fn last_failure(&self) -> String {
        match &*self.link.lock().await {
            Link::Disconnected(reason) => reason.clone(),
            _ => "connection attempt failed".to_string(),
        }
    }

    async fn mark_disconnected(&self, reason: String) {
        let mut link = self.link.lock().await;
        if matches!(*link, Link::Connected(_)) {
            *link = Link::Disconnected(reason);
        }
    }

    // == Query ==
    /// Runs one command under the operation deadline.
    ///
    /// I/O failures and timeouts drop the connection so the next call reconnects.
    async fn query<T>(&self, cmd: &Cmd) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        let mut conn = self.connection().await?;

        match timeout(self.operation_timeout, cmd.query_async::<_, T>(&mut conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
                    self.mark_disconnected(err.to_string()).await;
                }
                Err(err.into())
            }
            Err(_) => {
                self.mark_disconnected("operation timed out".to_string())
                    .await;
                Err(CacheError::Timeout)
            }
        }
    }
}

#[async_trait]
impl DistributedStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut cmd = ::redis::cmd("GET");
        cmd.arg(key);

        let raw: Option<String> = self.query(&cmd).await?;
        raw.map(|payload| {
            serde_json::from_str(&payload).map_err(|err| CacheError::Decode(err.to_string()))
        })
        .transpose()
    }

    async fn set(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<()> {
        let payload = serde_json::to_string(value)?;

        let mut cmd = ::redis::cmd("SET");
        cmd.arg(key).arg(payload).arg("EX").arg(ttl_seconds);

        self.query::<()>(&cmd).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut cmd = ::redis::cmd("DEL");
        cmd.arg(key);

        let removed: u64 = self.query(&cmd).await?;
        Ok(removed > 0)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut cmd = ::redis::cmd("DEL");
        cmd.arg(keys);

        self.query(&cmd).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let mut cmd = ::redis::cmd("SCAN");
            cmd.arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH);

            let (next, batch): (u64, Vec<String>) = self.query(&cmd).await?;
            keys.extend(batch);

            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn is_available(&self) -> bool {
        match self.query::<String>(&::redis::cmd("PING")).await {
            Ok(_) => true,
            Err(err) => {
                debug!(error = %err, "Redis availability check failed");
                false
            }
        }
    }

    async fn close(&self) {
        let mut link = self.link.lock().await;
        if matches!(*link, Link::Connected(_)) {
            info!("Closing Redis connection");
        }
        *link = Link::Idle;
    }
}

/// Escapes Redis glob metacharacters so `prefix` matches literally.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
