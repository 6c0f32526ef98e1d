// ── Short-TTL status cache ──
//
// Shields the cloud platform from redundant reads of the same device
// within a few seconds (background poll, on-demand poll, detail view).
// Concurrent misses on one key may each fetch; only the last store wins.

use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::trace;

/// Validity window of a cached status.
pub const STATUS_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
}

/// Per-key cache of fetched values with a caller-supplied TTL.
pub struct StatusCache<V: Clone + Send + Sync + 'static> {
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V: Clone + Send + Sync + 'static> Default for StatusCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> StatusCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Return the live entry for `key`, or run `fetch` and store its
    /// result. Failed fetches are not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, ttl: Duration, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get_fresh(key, ttl) {
            trace!(key, "status cache hit");
            return Ok(value);
        }

        // The shard lock is not held across the fetch.
        let value = fetch().await?;
        self.entries.insert(
            key.to_owned(),
            CacheEntry {
                value: value.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(value)
    }

    /// The cached value if it is younger than `ttl`.
    pub fn get_fresh(&self, key: &str, ttl: Duration) -> Option<V> {
        let entry = self.entries.get(key)?;
        (entry.fetched_at.elapsed() < ttl).then(|| entry.value.clone())
    }

    /// Drop the entry for `key` so the next read goes to the network.
    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    async fn read(cache: &StatusCache<usize>, calls: &Arc<AtomicUsize>) -> usize {
        let calls = Arc::clone(calls);
        cache
            .get_or_fetch("dev", STATUS_TTL, || async move {
                Ok::<_, ()>(calls.fetch_add(1, Ordering::SeqCst))
            })
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn reads_within_ttl_fetch_once() {
        let cache = StatusCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        read(&cache, &calls).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        read(&cache, &calls).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reads_past_ttl_fetch_again() {
        let cache = StatusCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        read(&cache, &calls).await;
        tokio::time::advance(Duration::from_secs(6)).await;
        let second = read(&cache, &calls).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(second, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_are_not_cached() {
        let cache: StatusCache<u32> = StatusCache::new();
        let first: Result<u32, &str> = cache.get_or_fetch("k", STATUS_TTL, || async { Err("down") }).await;
        assert!(first.is_err());
        let second: Result<u32, &str> = cache.get_or_fetch("k", STATUS_TTL, || async { Ok(7) }).await;
        assert_eq!(second.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_forces_refetch() {
        let cache = StatusCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        read(&cache, &calls).await;
        cache.invalidate("dev");
        read(&cache, &calls).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
