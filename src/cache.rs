use std::{
    collections::HashMap,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{configuration::Config, error::Error};

/// Below this many entries expired ones are only dropped when read past.
const SWEEP_THRESHOLD: usize = 4_096;

/// Minimum time between two sweeps, however large the map grows.
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Opportunistic TTL cache in front of chain reads. Never authoritative:
/// a miss, an expiry or a backend error all mean "read the chain".
#[async_trait]
pub trait ReadCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), Error>;
}

/// A cache entry with expiration time
struct CacheEntry {
    data: String,
    expires_at: Instant,
}

struct Entries {
    map: HashMap<String, CacheEntry>,
    last_sweep: Instant,
}

impl Entries {
    fn sweep(&mut self, now: Instant) {
        self.map.retain(|_, entry| entry.expires_at > now);
        self.last_sweep = now;
    }
}

/// In-process expiring map; the default backend. Large maps are swept of
/// expired entries on write, at most once per sweep interval.
pub struct MemoryCache {
    entries: RwLock<Entries>,
    sweep_threshold: usize,
    sweep_interval: Duration,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_sweep(SWEEP_THRESHOLD, SWEEP_INTERVAL)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep(threshold: usize, interval: Duration) -> Self {
        MemoryCache {
            entries: RwLock::new(Entries {
                map: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            sweep_threshold: threshold,
            sweep_interval: interval,
        }
    }

    /// Remove all expired entries from the cache
    pub async fn cleanup_expired(&self) {
        self.entries.write().await.sweep(Instant::now());
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.map.len()
    }
}

#[async_trait]
impl ReadCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let entries = self.entries.read().await;
        if let Some(entry) = entries.map.get(key) {
            if Instant::now() < entry.expires_at {
                return Ok(Some(entry.data.clone()));
            }
        }
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), Error> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if entries.map.len() >= self.sweep_threshold
            && now.duration_since(entries.last_sweep) >= self.sweep_interval
        {
            entries.sweep(now);
        }

        entries.map.insert(
            key.to_string(),
            CacheEntry {
                data: value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache").finish()
    }
}

/// Redis backend; expiry is delegated to `SET EX`.
pub struct RedisCache {
    conn: MultiplexedConnection,
    prefix: String,
}

impl RedisCache {
    pub async fn connect(url: &str, prefix: &str) -> Result<Self, Error> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;

        Ok(RedisCache {
            conn,
            prefix: prefix.to_string(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }
}

#[async_trait]
impl ReadCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(self.key(key)).await?;
        Ok(value)
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(self.key(key), value, seconds).await?;
        Ok(())
    }
}

/// Builds the configured backend once per process.
pub async fn connect(config: &Config) -> Result<Arc<dyn ReadCache>, Error> {
    match &config.redis_url {
        Some(url) => {
            let cache = RedisCache::connect(url, &config.cache_prefix).await?;
            info!(prefix = %config.cache_prefix, "read cache: redis");
            Ok(Arc::new(cache))
        },
        None => {
            info!("read cache: in-memory");
            Ok(Arc::new(MemoryCache::new()))
        },
    }
}

/// Serves `key` from the cache or runs `load` and caches its success.
/// Cache failures are logged and treated as misses; errors from `load`
/// are never cached.
pub async fn cached_read<T, F, Fut>(
    cache: &dyn ReadCache,
    key: &str,
    ttl: Duration,
    load: F,
) -> Result<T, Error>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "cache hit");
                return Ok(value);
            },
            Err(e) => warn!(key, "discarding unreadable cache entry: {}", e),
        },
        Ok(None) => {},
        Err(e) => warn!(key, "cache read failed: {}", e),
    }

    let value = load().await?;

    match serde_json::to_string(&value) {
        Ok(raw) => {
            if let Err(e) = cache.set(key, raw, ttl).await {
                warn!(key, "cache write failed: {}", e);
            }
        },
        Err(e) => warn!(key, "value not cacheable: {}", e),
    }

    Ok(value)
}
