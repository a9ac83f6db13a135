// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::store::KvStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Persisted shape of every cache value: `{"data": ..., "timestamp": epochMillis}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    For(Duration),
    Indefinite,
}

impl Ttl {
    pub fn secs(secs: u64) -> Self {
        Ttl::For(Duration::from_secs(secs))
    }

    /// An entry is fresh while its age is strictly below the TTL; at exactly
    /// the TTL it is expired.
    pub fn is_fresh(&self, fetched_at_ms: i64, now_ms: i64) -> bool {
        match self {
            Ttl::Indefinite => true,
            Ttl::For(ttl) => {
                let age = now_ms.saturating_sub(fetched_at_ms);
                (age as i128) < ttl.as_millis() as i128
            }
        }
    }
}

/// Cache namespaces. Each has its own key prefix and TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCategory {
    TrendingWeek,
    TrendingDay,
    Discover,
    Details,
    Recommendations,
    Season,
    Search,
    ProviderList,
    IdMap,
}

impl CacheCategory {
    pub fn prefix(&self) -> &'static str {
        match self {
            CacheCategory::TrendingWeek => "trending-week",
            CacheCategory::TrendingDay => "trending-day",
            CacheCategory::Discover => "discover",
            CacheCategory::Details => "details",
            CacheCategory::Recommendations => "recs",
            CacheCategory::Season => "season",
            CacheCategory::Search => "search",
            CacheCategory::ProviderList => "wm_top",
            CacheCategory::IdMap => "wm_id_map",
        }
    }

    pub fn ttl(&self, config: &CacheConfig) -> Ttl {
        match self {
            CacheCategory::TrendingWeek => Ttl::secs(config.trending_week_secs),
            CacheCategory::TrendingDay => Ttl::secs(config.trending_day_secs),
            CacheCategory::Discover => Ttl::secs(config.discover_secs),
            CacheCategory::Details => Ttl::secs(config.details_secs),
            CacheCategory::Recommendations => Ttl::secs(config.recommendations_secs),
            CacheCategory::Season => Ttl::secs(config.season_secs),
            CacheCategory::Search => Ttl::secs(config.search_secs),
            CacheCategory::ProviderList => Ttl::secs(config.provider_list_secs),
            CacheCategory::IdMap => Ttl::Indefinite,
        }
    }

    pub fn key(&self, suffix: &str) -> String {
        format!("{}:{}", self.prefix(), suffix)
    }
}

/// Timestamped JSON cache over a [`KvStore`].
///
/// Reads check age against the caller's TTL and drop stale entries on the
/// spot; there is no background sweep. Writes are best effort: a store
/// failure is logged and the value is simply not cached. Concurrent misses
/// for the same key are not coalesced, so both callers fetch.
#[derive(Debug, Clone)]
pub struct TtlCache {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl TtlCache {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, config: CacheConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn ttl_for(&self, category: CacheCategory) -> Ttl {
        category.ttl(&self.config)
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn get<T>(&self, key: &str, ttl: Ttl) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Discarding unreadable cache entry {}: {}", key, e);
                let _ = self.store.remove(key);
                return None;
            }
        };

        if !ttl.is_fresh(entry.timestamp, self.clock.now_ms()) {
            debug!("Cache entry {} expired", key);
            if let Err(e) = self.store.remove(key) {
                warn!("Failed to evict expired cache entry {}: {}", key, e);
            }
            return None;
        }

        debug!("Cache hit: {}", key);
        Some(entry.data)
    }

    pub fn put<T>(&self, key: &str, payload: &T)
    where
        T: Serialize + ?Sized,
    {
        let entry = CacheEntry {
            data: payload,
            timestamp: self.clock.now_ms(),
        };

        let content = match serde_json::to_string(&entry) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to serialize cache entry {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.store.set(key, &content) {
            warn!("Dropping cache write for {}: {}", key, e);
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!("Failed to remove cache entry {}: {}", key, e);
        }
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        self.store.clear()?;
        Ok(())
    }

    pub fn keys(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.store.keys()?)
    }

    /// Returns the cached value when fresh, otherwise runs `fetch` and caches
    /// its result. Errors from `fetch` pass through and nothing is cached.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Ttl,
        force_refresh: bool,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !force_refresh && let Some(cached) = self.get::<T>(key, ttl) {
            return Ok(cached);
        }

        let fresh = fetch().await?;
        self.put(key, &fresh);
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DAY_MS: i64 = 86_400_000;

    fn cache_with(store: MemoryStore, clock: &ManualClock) -> TtlCache {
        TtlCache::new(
            Arc::new(store),
            Arc::new(clock.clone()),
            CacheConfig::default(),
        )
    }

    #[test]
    fn trending_entry_expires_after_one_day() {
        let clock = ManualClock::new(0);
        let cache = cache_with(MemoryStore::new(), &clock);
        let ttl = Ttl::For(Duration::from_millis(DAY_MS as u64));

        cache.put("trending-movies", &vec![1, 2, 3]);

        clock.set(DAY_MS - 1);
        assert_eq!(cache.get::<Vec<u32>>("trending-movies", ttl), Some(vec![1, 2, 3]));

        clock.set(DAY_MS + 1);
        assert_eq!(cache.get::<Vec<u32>>("trending-movies", ttl), None);
    }

    #[test]
    fn exact_ttl_boundary_is_expired() {
        let clock = ManualClock::new(0);
        let cache = cache_with(MemoryStore::new(), &clock);
        let ttl = Ttl::For(Duration::from_millis(DAY_MS as u64));

        cache.put("trending-movies", &"payload");
        clock.set(DAY_MS);
        assert_eq!(cache.get::<String>("trending-movies", ttl), None);

        // Evicted on read, so the key is gone from the store too.
        assert!(cache.keys().unwrap().is_empty());
    }

    #[test]
    fn boundary_is_exclusive_for_every_ttl() {
        for ttl_ms in [1_i64, 1_000, DAY_MS, 7 * DAY_MS] {
            let ttl = Ttl::For(Duration::from_millis(ttl_ms as u64));
            assert!(ttl.is_fresh(0, ttl_ms - 1));
            assert!(!ttl.is_fresh(0, ttl_ms));
            assert!(!ttl.is_fresh(0, ttl_ms + 1));
        }
    }

    #[test]
    fn missing_key_is_absent() {
        let clock = ManualClock::new(0);
        let cache = cache_with(MemoryStore::new(), &clock);
        assert_eq!(cache.get::<String>("nope", Ttl::Indefinite), None);
    }

    #[test]
    fn indefinite_never_expires() {
        let clock = ManualClock::new(0);
        let cache = cache_with(MemoryStore::new(), &clock);
        cache.put("wm_id_map", &serde_json::json!({"358": {"canonicalId": 1}}));

        clock.set(i64::MAX / 2);
        assert!(cache.get::<serde_json::Value>("wm_id_map", Ttl::Indefinite).is_some());
    }

    #[test]
    fn quota_failure_drops_write_silently() {
        let clock = ManualClock::new(0);
        let cache = cache_with(MemoryStore::with_quota(32), &clock);

        cache.put("big", &"x".repeat(1024));
        assert_eq!(cache.get::<String>("big", Ttl::Indefinite), None);
    }

    #[test]
    fn persisted_shape_has_data_and_timestamp() {
        let clock = ManualClock::new(1234);
        let store = Arc::new(MemoryStore::new());
        let cache = TtlCache::new(store.clone(), Arc::new(clock), CacheConfig::default());

        cache.put("k", &vec!["a"]);

        let raw = store.get("k").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["data"], serde_json::json!(["a"]));
        assert_eq!(value["timestamp"], serde_json::json!(1234));
    }

    #[test]
    fn category_ttls_follow_config() {
        let config = CacheConfig::default();
        assert_eq!(CacheCategory::TrendingDay.ttl(&config), Ttl::secs(86_400));
        assert_eq!(CacheCategory::Details.ttl(&config), Ttl::secs(7 * 86_400));
        assert_eq!(CacheCategory::IdMap.ttl(&config), Ttl::Indefinite);
        assert_eq!(CacheCategory::Season.key("1399:1"), "season:1399:1");
    }

    #[tokio::test]
    async fn get_or_fetch_hits_cache_on_second_call() {
        let clock = ManualClock::new(0);
        let cache = cache_with(MemoryStore::new(), &clock);
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..2 {
            let value: Result<u32, anyhow::Error> = cache
                .get_or_fetch("k", Ttl::secs(60), false, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(value.unwrap(), 7);
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_caches_nothing() {
        let clock = ManualClock::new(0);
        let cache = cache_with(MemoryStore::new(), &clock);

        let value: Result<u32, &str> = cache
            .get_or_fetch("k", Ttl::secs(60), false, || async { Err("boom") })
            .await;

        assert!(value.is_err());
        assert!(cache.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_misses_both_fetch() {
        let clock = ManualClock::new(0);
        let cache = cache_with(MemoryStore::new(), &clock);
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok::<_, anyhow::Error>(1u32)
        };

        let (a, b) = tokio::join!(
            cache.get_or_fetch("same", Ttl::secs(60), false, fetch),
            cache.get_or_fetch("same", Ttl::secs(60), false, fetch),
        );

        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn force_refresh_bypasses_fresh_entry() {
        let clock = ManualClock::new(0);
        let cache = cache_with(MemoryStore::new(), &clock);
        cache.put("k", &1u32);

        let value: Result<u32, anyhow::Error> = cache
            .get_or_fetch("k", Ttl::secs(60), true, || async { Ok(2) })
            .await;

        assert_eq!(value.unwrap(), 2);
        assert_eq!(cache.get::<u32>("k", Ttl::secs(60)), Some(2));
    }
}
