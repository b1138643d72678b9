//! Content Cache - operator tool
//!
//! Checks the configured cache backends from the same environment the
//! application runs with.
//!
//! # Commands
//! - `probe` (default) - Report whether Redis is reachable and print local stats
//! - `clear` - Remove every `cache:` key from Redis and the local store

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use content_cache::{Config, ContentCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "content_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: redis={}, max_entries={}, connect_timeout={}ms, operation_timeout={}ms",
        config.redis_url.is_some(),
        config.max_entries,
        config.connect_timeout_ms,
        config.operation_timeout_ms
    );

    let cache = ContentCache::from_config(&config);
    let command = std::env::args().nth(1);

    let outcome = match command.as_deref() {
        None | Some("probe") => probe(&cache).await,
        Some("clear") => {
            cache.clear().await;
            Ok(())
        }
        Some(other) => Err(anyhow::anyhow!("Unknown command: {other}")),
    };

    cache.close().await;
    outcome
}

async fn probe(cache: &ContentCache) -> anyhow::Result<()> {
    let reachable = cache.is_redis_available().await;
    if !cache.has_distributed() {
        info!("REDIS_URL not set, local store only");
    } else if reachable {
        info!("Redis is reachable");
    } else {
        warn!("Redis is configured but unreachable, requests will use the local store");
    }

    let stats = serde_json::to_string_pretty(&cache.stats())
        .context("Failed to encode cache stats")?;
    println!("{stats}");

    if cache.has_distributed() && !reachable {
        bail!("Redis unavailable");
    }
    Ok(())
}
