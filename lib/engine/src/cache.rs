//! Process-wide cache of fetch results with LRU eviction and TTL expiration.

use lru::LruCache;
use rdf_gateway_model::EntryMap;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Identifies a cached fetch result.
///
/// Next to the rendered query, the key contains the resource that issued it and the forwarded
/// `Authorization` value. Two resources can render the same query against different endpoints,
/// and two identities may see different data for the same query.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    resource: String,
    authorization: Option<Vec<u8>>,
    query: String,
}

impl CacheKey {
    pub fn new(resource: impl Into<String>, headers: &HeaderMap, query: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            authorization: headers
                .get(AUTHORIZATION)
                .map(|value| value.as_bytes().to_vec()),
            query: query.into(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

struct CacheEntry {
    entries: Arc<EntryMap>,
    inserted_at: Instant,
}

/// Caches the entries of fetches by [CacheKey].
///
/// A capacity of zero disables the cache. Concurrent misses for the same key are not deduplicated;
/// the last insert wins.
pub struct QueryCache {
    inner: Option<Mutex<LruCache<CacheKey, CacheEntry>>>,
    ttl: Duration,
}

impl QueryCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(|capacity| Mutex::new(LruCache::new(capacity))),
            ttl,
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Returns the cached entries for `key` unless they have expired.
    ///
    /// Expired entries are removed on access.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<EntryMap>> {
        let mut cache = lock(self.inner.as_ref()?);
        if let Some(entry) = cache.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(Arc::clone(&entry.entries));
            }
            cache.pop(key);
        }
        None
    }

    /// Stores `entries` under `key`, evicting the least recently used entry if the cache is full.
    pub fn insert(&self, key: CacheKey, entries: Arc<EntryMap>) {
        let Some(inner) = &self.inner else {
            return;
        };
        lock(inner).put(
            key,
            CacheEntry {
                entries,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |inner| lock(inner).len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A panic while holding the lock cannot leave the LRU in an inconsistent state.
fn lock(
    inner: &Mutex<LruCache<CacheKey, CacheEntry>>,
) -> MutexGuard<'_, LruCache<CacheKey, CacheEntry>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
