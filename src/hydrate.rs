// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

//! Cross-provider ID hydration.
//!
//! Watch-provider titles carry the provider's own IDs. To link them into the
//! player they need the metadata provider's ID and a normalized kind. The
//! mapping between the two never changes, so it is cached forever in a single
//! table and the first mapping written for an ID is the one that sticks.

use crate::cache::{CacheCategory, Ttl, TtlCache};
use crate::error::ApiError;
use crate::media::MediaKind;
use futures_util::{StreamExt, future, stream};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use tracing::{debug, warn};

pub const ID_MAP_KEY: &str = "wm_id_map";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMapping {
    pub external_id: u64,
    pub canonical_id: u64,
    pub kind: MediaKind,
}

/// Value shape of one row in the persisted table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MappingRecord {
    canonical_id: u64,
    kind: MediaKind,
}

/// The persisted `{ "<externalId>": {"canonicalId": .., "kind": ..} }` table.
#[derive(Debug, Clone)]
pub struct IdMappingStore {
    cache: TtlCache,
}

impl IdMappingStore {
    pub fn new(cache: TtlCache) -> Self {
        Self { cache }
    }

    fn key() -> &'static str {
        CacheCategory::IdMap.prefix()
    }

    fn load(&self) -> BTreeMap<u64, MappingRecord> {
        self.cache
            .get(Self::key(), Ttl::Indefinite)
            .unwrap_or_default()
    }

    pub fn lookup(&self, external_id: u64) -> Option<IdMapping> {
        self.load().get(&external_id).map(|record| IdMapping {
            external_id,
            canonical_id: record.canonical_id,
            kind: record.kind,
        })
    }

    /// Stores `mapping` unless the external ID is already mapped. Returns the
    /// mapping that is in effect afterwards.
    pub fn record(&self, mapping: IdMapping) -> IdMapping {
        let mut table = self.load();
        if let Some(existing) = table.get(&mapping.external_id) {
            if existing.canonical_id != mapping.canonical_id {
                debug!(
                    "Keeping existing mapping {} -> {} (ignoring {})",
                    mapping.external_id, existing.canonical_id, mapping.canonical_id
                );
            }
            return IdMapping {
                external_id: mapping.external_id,
                canonical_id: existing.canonical_id,
                kind: existing.kind,
            };
        }

        table.insert(
            mapping.external_id,
            MappingRecord {
                canonical_id: mapping.canonical_id,
                kind: mapping.kind,
            },
        );
        self.cache.put(Self::key(), &table);
        mapping
    }

    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedId {
    pub canonical_id: u64,
    pub kind: MediaKind,
}

/// Looks up the canonical ID for one external ID, usually one network call.
pub trait TitleResolver {
    fn resolve(&self, external_id: u64) -> impl Future<Output = Result<ResolvedId, ApiError>>;
}

/// Anything keyed by an external provider ID.
pub trait ExternalTitle {
    fn external_id(&self) -> u64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hydrated<T> {
    #[serde(flatten)]
    pub item: T,
    pub tmdb_id: u64,
    pub media_type: MediaKind,
}

/// Annotates external items with canonical IDs through a bounded pool of
/// lookups. With `concurrency == 1` lookups run strictly one after another.
#[derive(Debug)]
pub struct IdHydrator<'a, R> {
    resolver: &'a R,
    mappings: &'a IdMappingStore,
    concurrency: usize,
}

impl<'a, R> IdHydrator<'a, R>
where
    R: TitleResolver,
{
    pub fn new(resolver: &'a R, mappings: &'a IdMappingStore, concurrency: usize) -> Self {
        Self {
            resolver,
            mappings,
            concurrency: concurrency.max(1),
        }
    }

    /// Output keeps input order. Items that cannot be resolved are dropped,
    /// never retried.
    pub async fn hydrate<T>(&self, items: Vec<T>) -> Vec<Hydrated<T>>
    where
        T: ExternalTitle,
    {
        let total = items.len();
        let lookups = items.into_iter().map(|item| self.hydrate_one(item));
        let hydrated: Vec<Hydrated<T>> = stream::iter(lookups)
            .buffered(self.concurrency)
            .filter_map(future::ready)
            .collect()
            .await;

        debug!("Hydrated {} of {} titles", hydrated.len(), total);
        hydrated
    }

    async fn hydrate_one<T>(&self, item: T) -> Option<Hydrated<T>>
    where
        T: ExternalTitle,
    {
        let external_id = item.external_id();

        let mapping = match self.mappings.lookup(external_id) {
            Some(mapping) => mapping,
            None => match self.resolver.resolve(external_id).await {
                Ok(resolved) => self.mappings.record(IdMapping {
                    external_id,
                    canonical_id: resolved.canonical_id,
                    kind: resolved.kind,
                }),
                Err(e) => {
                    warn!("Dropping title {}: {}", external_id, e);
                    return None;
                }
            },
        };

        Some(Hydrated {
            item,
            tmdb_id: mapping.canonical_id,
            media_type: mapping.kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::CacheConfig;
    use crate::store::{KvStore, MemoryStore};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Item(u64);

    impl ExternalTitle for Item {
        fn external_id(&self) -> u64 {
            self.0
        }
    }

    #[derive(Default)]
    struct FakeResolver {
        answers: HashMap<u64, ResolvedId>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeResolver {
        fn with(answers: &[(u64, u64, MediaKind)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|&(ext, canonical_id, kind)| (ext, ResolvedId { canonical_id, kind }))
                    .collect(),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TitleResolver for FakeResolver {
        async fn resolve(&self, external_id: u64) -> Result<ResolvedId, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            tokio::task::yield_now().await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.answers
                .get(&external_id)
                .copied()
                .ok_or(ApiError::MissingField("tmdb_id"))
        }
    }

    fn mapping_store() -> (IdMappingStore, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = TtlCache::new(
            store.clone(),
            Arc::new(ManualClock::new(0)),
            CacheConfig::default(),
        );
        (IdMappingStore::new(cache), store)
    }

    #[tokio::test]
    async fn second_resolution_is_a_cache_hit() {
        let (mappings, _) = mapping_store();
        let resolver = FakeResolver::with(&[(358, 1399, MediaKind::Tv)]);
        let hydrator = IdHydrator::new(&resolver, &mappings, 1);

        let first = hydrator.hydrate(vec![Item(358)]).await;
        let second = hydrator.hydrate(vec![Item(358)]).await;

        assert_eq!(resolver.calls(), 1);
        assert_eq!(first, second);
        assert_eq!(first[0].tmdb_id, 1399);
        assert_eq!(first[0].media_type, MediaKind::Tv);
    }

    #[tokio::test]
    async fn first_write_wins_even_if_upstream_changes() {
        let (mappings, _) = mapping_store();
        let before = FakeResolver::with(&[(358, 100, MediaKind::Movie)]);
        IdHydrator::new(&before, &mappings, 1)
            .hydrate(vec![Item(358)])
            .await;

        let after = FakeResolver::with(&[(358, 200, MediaKind::Tv)]);
        let out = IdHydrator::new(&after, &mappings, 1)
            .hydrate(vec![Item(358)])
            .await;

        assert_eq!(after.calls(), 0);
        assert_eq!(out[0].tmdb_id, 100);
        assert_eq!(out[0].media_type, MediaKind::Movie);
    }

    #[test]
    fn record_never_overwrites() {
        let (mappings, _) = mapping_store();
        let first = IdMapping {
            external_id: 7,
            canonical_id: 1,
            kind: MediaKind::Movie,
        };
        let second = IdMapping {
            canonical_id: 2,
            kind: MediaKind::Tv,
            ..first
        };

        assert_eq!(mappings.record(first), first);
        assert_eq!(mappings.record(second), first);
        assert_eq!(mappings.lookup(7), Some(first));
        assert_eq!(mappings.len(), 1);
    }

    #[test]
    fn table_is_persisted_under_one_key() {
        let (mappings, store) = mapping_store();
        mappings.record(IdMapping {
            external_id: 358,
            canonical_id: 42,
            kind: MediaKind::Tv,
        });

        let raw = store.get(ID_MAP_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value["data"]["358"],
            serde_json::json!({"canonicalId": 42, "kind": "tv"})
        );
    }

    #[tokio::test]
    async fn failures_are_dropped_and_order_kept() {
        let (mappings, _) = mapping_store();
        let resolver = FakeResolver::with(&[(1, 11, MediaKind::Movie), (3, 33, MediaKind::Tv)]);
        let out = IdHydrator::new(&resolver, &mappings, 1)
            .hydrate(vec![Item(1), Item(2), Item(3)])
            .await;

        let ids: Vec<u64> = out.iter().map(|h| h.item.0).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(out.len() <= 3);
        // The failed item is not remembered, so it is attempted again next time.
        assert_eq!(mappings.lookup(2), None);
    }

    #[tokio::test]
    async fn concurrency_one_is_sequential() {
        let (mappings, _) = mapping_store();
        let resolver = FakeResolver::with(&[
            (1, 11, MediaKind::Movie),
            (2, 22, MediaKind::Movie),
            (3, 33, MediaKind::Movie),
        ]);
        IdHydrator::new(&resolver, &mappings, 1)
            .hydrate(vec![Item(1), Item(2), Item(3)])
            .await;

        assert_eq!(resolver.calls(), 3);
        assert_eq!(resolver.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wider_pool_overlaps_lookups() {
        let (mappings, _) = mapping_store();
        let resolver = FakeResolver::with(&[
            (1, 11, MediaKind::Movie),
            (2, 22, MediaKind::Movie),
            (3, 33, MediaKind::Movie),
        ]);
        let out = IdHydrator::new(&resolver, &mappings, 3)
            .hydrate(vec![Item(1), Item(2), Item(3)])
            .await;

        assert_eq!(out.len(), 3);
        assert_eq!(resolver.max_in_flight.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_concurrency_is_clamped() {
        let (mappings, _) = mapping_store();
        let resolver = FakeResolver::with(&[(1, 11, MediaKind::Movie)]);
        let out = IdHydrator::new(&resolver, &mappings, 0)
            .hydrate(vec![Item(1)])
            .await;
        assert_eq!(out.len(), 1);
    }
}
