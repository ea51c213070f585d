//! Query cache shared by the page modules
//!
//! Results are keyed by a hierarchical [`QueryKey`]. A cached value is served
//! until it is older than the stale time; after that the loader runs again.
//! Mutations drop whole key prefixes through [`QueryCache::invalidate`].

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// One segment of a query key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySegment {
    Str(String),
    Int(i64),
}

impl From<&str> for KeySegment {
    fn from(s: &str) -> Self {
        KeySegment::Str(s.to_string())
    }
}

impl From<String> for KeySegment {
    fn from(s: String) -> Self {
        KeySegment::Str(s)
    }
}

impl From<i64> for KeySegment {
    fn from(v: i64) -> Self {
        KeySegment::Int(v)
    }
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Str(s) => f.write_str(s),
            KeySegment::Int(v) => write!(f, "{v}"),
        }
    }
}

/// Ordered list of segments, e.g. `["sensorData", 3, start, end]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
    pub fn new(root: impl Into<KeySegment>) -> Self {
        Self(vec![root.into()])
    }

    pub fn with(mut self, segment: impl Into<KeySegment>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Keys used by the page modules
pub mod keys {
    use super::QueryKey;

    pub fn machines() -> QueryKey {
        QueryKey::new("machines")
    }

    pub fn machine(id: i64) -> QueryKey {
        machines().with(id)
    }

    pub fn dcp_configs() -> QueryKey {
        QueryKey::new("dcpConfigs")
    }

    pub fn dcp_config(id: i64) -> QueryKey {
        dcp_configs().with(id)
    }

    pub fn sensor_data(machine_id: i64, start: &str, end: &str) -> QueryKey {
        QueryKey::new("sensorData").with(machine_id).with(start).with(end)
    }

    pub fn anomalies() -> QueryKey {
        QueryKey::new("anomalies")
    }

    pub fn anomaly_search(start: &str, end: &str) -> QueryKey {
        anomalies().with("search").with(start).with(end)
    }
}

/// Cache behaviour
#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    /// How long a result is served without refetching
    pub stale_time: Duration,
    /// Extra attempts after a failed load
    pub retry: u32,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(30),
            retry: 1,
        }
    }
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    fetched_at: Instant,
}

/// Stale-time query cache with prefix invalidation
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, Entry>>,
    options: CacheOptions,
}

impl QueryCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            options,
        }
    }

    pub fn options(&self) -> CacheOptions {
        self.options
    }

    /// Return the fresh cached value for `key`, or run `loader` and cache its result.
    ///
    /// Failed loads are retried `retry` times and never cached.
    pub async fn fetch<T, E, F, Fut>(&self, key: QueryKey, loader: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        if let Some(value) = self.get_fresh::<T>(&key).await {
            debug!("cache hit for {}", key);
            return Ok(value);
        }

        let mut attempt = 0;
        let value = loop {
            match loader().await {
                Ok(value) => break value,
                Err(e) if attempt < self.options.retry => {
                    attempt += 1;
                    debug!("load of {} failed ({}), retry {}", key, e, attempt);
                }
                Err(e) => return Err(e),
            }
        };

        self.entries.write().await.insert(
            key,
            Entry {
                value: Arc::new(value.clone()),
                fetched_at: Instant::now(),
            },
        );
        Ok(value)
    }

    async fn get_fresh<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.fetched_at.elapsed() >= self.options.stale_time {
            return None;
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    /// Drop every entry whose key starts with `prefix`. Returns how many were dropped.
    pub async fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        debug!("invalidated {} entries under {}", removed, prefix);
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}
