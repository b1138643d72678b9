//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// A missing `REDIS_URL` is a supported setup: the cache runs on its local store only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Redis endpoint, e.g. `redis://127.0.0.1:6379`
    pub redis_url: Option<String>,
    /// Maximum number of entries the local store can hold
    pub max_entries: usize,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Deadline for establishing the Redis connection, in milliseconds
    pub connect_timeout_ms: u64,
    /// Deadline for a single Redis command, in milliseconds
    pub operation_timeout_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - Distributed store endpoint (default: unset, local only)
    /// - `CACHE_MAX_ENTRIES` - Maximum local entries (default: 1000)
    /// - `CACHE_CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 60)
    /// - `REDIS_CONNECT_TIMEOUT_MS` - Connect deadline (default: 2000)
    /// - `REDIS_OPERATION_TIMEOUT_MS` - Command deadline (default: 1000)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |name: &str, fallback: u64| {
            lookup(name)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(fallback)
        };

        Self {
            redis_url: lookup("REDIS_URL")
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            max_entries: lookup("CACHE_MAX_ENTRIES")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(defaults.max_entries)
                .max(1),
            cleanup_interval: parsed("CACHE_CLEANUP_INTERVAL", defaults.cleanup_interval),
            connect_timeout_ms: parsed("REDIS_CONNECT_TIMEOUT_MS", defaults.connect_timeout_ms),
            operation_timeout_ms: parsed(
                "REDIS_OPERATION_TIMEOUT_MS",
                defaults.operation_timeout_ms,
            ),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: None,
            max_entries: 1000,
            cleanup_interval: 60,
            connect_timeout_ms: 2000,
            operation_timeout_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.redis_url, None);
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.cleanup_interval, 60);
        assert_eq!(config.connect_timeout(), Duration::from_secs(2));
        assert_eq!(config.operation_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_from_lookup_empty() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_from_lookup_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("REDIS_URL", "redis://cache.internal:6379"),
            ("CACHE_MAX_ENTRIES", "50"),
            ("CACHE_CLEANUP_INTERVAL", "5"),
            ("REDIS_CONNECT_TIMEOUT_MS", "250"),
            ("REDIS_OPERATION_TIMEOUT_MS", "100"),
        ]));

        assert_eq!(
            config.redis_url.as_deref(),
            Some("redis://cache.internal:6379")
        );
        assert_eq!(config.max_entries, 50);
        assert_eq!(config.cleanup_interval, 5);
        assert_eq!(config.connect_timeout_ms, 250);
        assert_eq!(config.operation_timeout_ms, 100);
    }

    #[test]
    fn test_blank_redis_url_means_local_only() {
        let config = Config::from_lookup(lookup_from(&[("REDIS_URL", "   ")]));
        assert_eq!(config.redis_url, None);
    }

    #[test]
    fn test_invalid_numbers_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("CACHE_MAX_ENTRIES", "lots"),
            ("REDIS_OPERATION_TIMEOUT_MS", "-3"),
        ]));
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.operation_timeout_ms, 1000);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let config = Config::from_lookup(lookup_from(&[("CACHE_MAX_ENTRIES", "0")]));
        assert_eq!(config.max_entries, 1);
    }
}
