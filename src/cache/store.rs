// file: src/cache/store.rs
// description: fingerprint-keyed result cache with at-most-once computation and LRU eviction
// reference: https://docs.rs/futures/latest/futures/future/struct.Shared.html

use crate::cache::persistence::DiskStore;
use crate::config::CacheConfig;
use crate::error::{PipelineError, Result};
use crate::models::{CacheEntry, ProductionBreakdown};
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

type SharedComputation = Shared<BoxFuture<'static, Result<Arc<CacheEntry>>>>;

enum Slot {
    Ready {
        entry: Arc<CacheEntry>,
        last_access: u64,
    },
    Pending(SharedComputation),
}

enum Lookup {
    Hit(Arc<CacheEntry>),
    Joined(SharedComputation),
    Expired,
    Miss,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Callers that attached to a computation already in flight.
    pub coalesced: u64,
    pub computations: u64,
    pub restored: u64,
    pub evictions: u64,
    pub entries: usize,
    pub in_flight: usize,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    computations: AtomicU64,
    restored: AtomicU64,
    evictions: AtomicU64,
}

struct Inner {
    slots: Mutex<HashMap<String, Slot>>,
    max_entries: usize,
    max_age_secs: u64,
    store: Option<DiskStore>,
    clock: AtomicU64,
    counters: Counters,
}

/// Process-scoped cache handle. Clones share the same map.
#[derive(Clone)]
pub struct ResultCache {
    inner: Arc<Inner>,
}

impl ResultCache {
    /// Opens the cache described by `config`. When the persistent store
    /// cannot be prepared the cache runs in memory only.
    pub async fn open(config: &CacheConfig) -> Self {
        let store = if config.persist {
            match DiskStore::open(config.directory.clone()).await {
                Ok(store) => Some(store),
                Err(e) => {
                    warn!("Persistent cache disabled, running in memory only: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self::build(config.max_entries, config.max_age_secs, store)
    }

    pub fn in_memory(max_entries: usize, max_age_secs: u64) -> Self {
        Self::build(max_entries, max_age_secs, None)
    }

    pub fn with_store(max_entries: usize, max_age_secs: u64, store: DiskStore) -> Self {
        Self::build(max_entries, max_age_secs, Some(store))
    }

    fn build(max_entries: usize, max_age_secs: u64, store: Option<DiskStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                max_entries: max_entries.max(1),
                max_age_secs,
                store,
                clock: AtomicU64::new(0),
                counters: Counters::default(),
            }),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.inner.store.is_some()
    }

    pub fn store(&self) -> Option<&DiskStore> {
        self.inner.store.as_ref()
    }

    /// Returns the breakdown for `fingerprint`, running `compute` at most once
    /// no matter how many callers ask concurrently. A failed computation is
    /// handed to every waiter and leaves no entry behind.
    pub async fn get_or_compute<F>(
        &self,
        fingerprint: &str,
        compute: F,
    ) -> Result<Arc<ProductionBreakdown>>
    where
        F: FnOnce() -> Result<ProductionBreakdown> + Send + 'static,
    {
        let computation = {
            let mut slots = self.inner.slots();
            let now = unix_now();

            let lookup = match slots.get(fingerprint) {
                Some(Slot::Ready { entry, .. })
                    if entry.is_expired(self.inner.max_age_secs, now) =>
                {
                    debug!("Cache entry for {} expired", fingerprint);
                    Lookup::Expired
                }
                Some(Slot::Ready { entry, .. }) => Lookup::Hit(Arc::clone(entry)),
                Some(Slot::Pending(shared)) => Lookup::Joined(shared.clone()),
                None => Lookup::Miss,
            };

            match lookup {
                Lookup::Hit(entry) => {
                    let tick = self.inner.tick();
                    if let Some(Slot::Ready { last_access, .. }) = slots.get_mut(fingerprint) {
                        *last_access = tick;
                    }
                    self.inner.counters.hits.fetch_add(1, Ordering::Relaxed);
                    debug!("Cache hit for {}", fingerprint);
                    return Ok(Arc::clone(&entry.breakdown));
                }
                Lookup::Joined(shared) => {
                    self.inner.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                    debug!("Joining in-flight computation for {}", fingerprint);
                    shared
                }
                Lookup::Expired | Lookup::Miss => {
                    self.inner.counters.misses.fetch_add(1, Ordering::Relaxed);
                    let shared = self.spawn_computation(fingerprint.to_string(), compute);
                    slots.insert(fingerprint.to_string(), Slot::Pending(shared.clone()));
                    shared
                }
            }
        };

        computation
            .await
            .map(|entry| Arc::clone(&entry.breakdown))
    }

    fn spawn_computation<F>(&self, fingerprint: String, compute: F) -> SharedComputation
    where
        F: FnOnce() -> Result<ProductionBreakdown> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);

        // The task owns the work; callers dropping their futures does not cancel it.
        let handle = tokio::spawn(async move {
            let resolved = inner.resolve(&fingerprint, compute).await;
            let result = resolved.as_ref().map(|(entry, _)| Arc::clone(entry)).map_err(Clone::clone);
            inner.settle(&fingerprint, &result);

            if let Ok((entry, true)) = &resolved {
                inner.persist(entry).await;
            }

            result
        });

        async move {
            handle.await.map_err(|e| {
                PipelineError::Internal(format!("cache computation task failed: {}", e))
            })?
        }
        .boxed()
        .shared()
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        matches!(
            self.inner.slots().get(fingerprint),
            Some(Slot::Ready { .. })
        )
    }

    pub fn stats(&self) -> CacheStats {
        let slots = self.inner.slots();
        let in_flight = slots
            .values()
            .filter(|slot| matches!(slot, Slot::Pending(_)))
            .count();
        let counters = &self.inner.counters;

        CacheStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            coalesced: counters.coalesced.load(Ordering::Relaxed),
            computations: counters.computations.load(Ordering::Relaxed),
            restored: counters.restored.load(Ordering::Relaxed),
            evictions: counters.evictions.load(Ordering::Relaxed),
            entries: slots.len() - in_flight,
            in_flight,
        }
    }

    /// Waits for in-flight computations, then drops every in-memory entry.
    /// Persisted entries stay on disk.
    pub async fn shutdown(&self) {
        let pending: Vec<SharedComputation> = self
            .inner
            .slots()
            .values()
            .filter_map(|slot| match slot {
                Slot::Pending(shared) => Some(shared.clone()),
                Slot::Ready { .. } => None,
            })
            .collect();

        if !pending.is_empty() {
            info!("Waiting for {} in-flight computations", pending.len());
            join_all(pending).await;
        }

        let mut slots = self.inner.slots();
        let dropped = slots.len();
        slots.clear();
        debug!("Cache shut down, {} entries released", dropped);
    }
}

impl Inner {
    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Loads from disk when possible, otherwise computes on the blocking pool.
    /// The flag is true when the entry was freshly computed.
    async fn resolve<F>(&self, fingerprint: &str, compute: F) -> Result<(Arc<CacheEntry>, bool)>
    where
        F: FnOnce() -> Result<ProductionBreakdown> + Send + 'static,
    {
        if let Some(store) = &self.store {
            match store.load(fingerprint).await {
                Ok(Some(entry)) if !entry.is_expired(self.max_age_secs, unix_now()) => {
                    self.counters.restored.fetch_add(1, Ordering::Relaxed);
                    debug!("Restored {} from persistent cache", fingerprint);
                    return Ok((Arc::new(entry), false));
                }
                Ok(_) => {}
                Err(e) => warn!("Persistent cache read failed for {}: {}", fingerprint, e),
            }
        }

        self.counters.computations.fetch_add(1, Ordering::Relaxed);
        let breakdown = tokio::task::spawn_blocking(compute)
            .await
            .map_err(|e| PipelineError::Internal(format!("analysis task failed: {}", e)))??;

        Ok((
            Arc::new(CacheEntry::new(fingerprint.to_string(), breakdown)),
            true,
        ))
    }

    fn settle(&self, fingerprint: &str, result: &Result<Arc<CacheEntry>>) {
        let mut slots = self.slots();

        match result {
            Ok(entry) => {
                let last_access = self.tick();
                slots.insert(
                    fingerprint.to_string(),
                    Slot::Ready {
                        entry: Arc::clone(entry),
                        last_access,
                    },
                );
                self.evict_excess(&mut slots);
            }
            Err(e) => {
                slots.remove(fingerprint);
                debug!("Computation for {} failed, no entry kept: {}", fingerprint, e);
            }
        }
    }

    /// Evicts least recently used ready entries. Pending slots are never
    /// candidates and do not count toward the bound.
    fn evict_excess(&self, slots: &mut HashMap<String, Slot>) {
        loop {
            let ready = slots
                .values()
                .filter(|slot| matches!(slot, Slot::Ready { .. }))
                .count();
            if ready <= self.max_entries {
                return;
            }

            let oldest = slots
                .iter()
                .filter_map(|(key, slot)| match slot {
                    Slot::Ready { last_access, .. } => Some((*last_access, key.clone())),
                    Slot::Pending(_) => None,
                })
                .min();

            let Some((_, key)) = oldest else {
                return;
            };

            slots.remove(&key);
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            debug!("Evicted {} from cache", key);
        }
    }

    async fn persist(&self, entry: &CacheEntry) {
        if let Some(store) = &self.store
            && let Err(e) = store.save(entry).await
        {
            warn!("Persistent cache write failed for {}: {}", entry.fingerprint, e);
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::models::BreakdownTotals;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use tempfile::tempdir;

    fn breakdown(scene_count: usize) -> ProductionBreakdown {
        ProductionBreakdown {
            totals: BreakdownTotals {
                scene_count,
                character_count: 0,
                location_count: 0,
                dialogue_line_count: 0,
                page_eighths: 0,
                estimated_runtime_secs: 0,
            },
            scenes: vec![],
            characters: vec![],
            locations: vec![],
            production_elements: vec![],
        }
    }

    fn fingerprint(seed: u8) -> String {
        format!("{:02x}", seed).repeat(32)
    }

    async fn wait_for_in_flight(cache: &ResultCache, expected: usize) {
        for _ in 0..200 {
            if cache.stats().in_flight == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("in-flight count never reached {}", expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_compute_once() {
        let cache = ResultCache::in_memory(8, 0);
        let runs = Arc::new(AtomicUsize::new(0));
        let key = fingerprint(1);

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                let runs = Arc::clone(&runs);
                let key = key.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_compute(&key, move || {
                            runs.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(50));
                            Ok(breakdown(2))
                        })
                        .await
                })
            })
            .collect();

        let results: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        assert_eq!(cache.stats().computations, 1);
        assert_eq!(cache.stats().entries, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failure_is_shared_and_not_cached() {
        let cache = ResultCache::in_memory(8, 0);
        let runs = Arc::new(AtomicUsize::new(0));
        let key = fingerprint(2);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let runs = Arc::clone(&runs);
                let key = key.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_compute(&key, move || {
                            runs.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(50));
                            Err(ParseError::NoStructureDetected.into())
                        })
                        .await
                })
            })
            .collect();

        for joined in join_all(tasks).await {
            let err = joined.unwrap().unwrap_err();
            assert!(matches!(
                err,
                PipelineError::Parse(ParseError::NoStructureDetected)
            ));
        }

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!cache.contains(&key));
        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.stats().in_flight, 0);
    }

    #[tokio::test]
    async fn test_hit_does_not_recompute() {
        let cache = ResultCache::in_memory(8, 0);
        let key = fingerprint(3);

        let first = cache.get_or_compute(&key, || Ok(breakdown(1))).await.unwrap();
        let second = cache
            .get_or_compute(&key, || Err(PipelineError::Internal("recomputed".to_string())))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_lru_evicts_least_recently_used() {
        let cache = ResultCache::in_memory(2, 0);

        cache.get_or_compute(&fingerprint(1), || Ok(breakdown(1))).await.unwrap();
        cache.get_or_compute(&fingerprint(2), || Ok(breakdown(2))).await.unwrap();
        // Touch 1 so 2 becomes the eviction candidate
        cache.get_or_compute(&fingerprint(1), || Ok(breakdown(1))).await.unwrap();
        cache.get_or_compute(&fingerprint(3), || Ok(breakdown(3))).await.unwrap();

        assert!(cache.contains(&fingerprint(1)));
        assert!(!cache.contains(&fingerprint(2)));
        assert!(cache.contains(&fingerprint(3)));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pending_slots_are_never_evicted() {
        let cache = ResultCache::in_memory(1, 0);
        let slow_key = fingerprint(10);
        let (release, gate) = mpsc::channel::<()>();

        let slow = {
            let cache = cache.clone();
            let slow_key = slow_key.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute(&slow_key, move || {
                        gate.recv().ok();
                        Ok(breakdown(10))
                    })
                    .await
            })
        };

        wait_for_in_flight(&cache, 1).await;

        for seed in 11..14 {
            cache
                .get_or_compute(&fingerprint(seed), move || Ok(breakdown(seed as usize)))
                .await
                .unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.in_flight, 1);
        assert_eq!(stats.entries, 1);

        release.send(()).unwrap();
        let slow_result = slow.await.unwrap().unwrap();

        assert_eq!(slow_result.totals.scene_count, 10);
        assert!(cache.contains(&slow_key));
        assert_eq!(cache.stats().entries, 1);
    }

    #[tokio::test]
    async fn test_persisted_entry_restores_without_recompute() {
        let dir = tempdir().unwrap();
        let key = fingerprint(20);

        let first = ResultCache::with_store(8, 0, DiskStore::open(dir.path().to_path_buf()).await.unwrap());
        first.get_or_compute(&key, || Ok(breakdown(4))).await.unwrap();
        first.shutdown().await;

        let second = ResultCache::with_store(8, 0, DiskStore::open(dir.path().to_path_buf()).await.unwrap());
        let restored = second
            .get_or_compute(&key, || Err(PipelineError::Internal("recomputed".to_string())))
            .await
            .unwrap();

        assert_eq!(restored.totals.scene_count, 4);
        assert_eq!(second.stats().computations, 0);
        assert_eq!(second.stats().restored, 1);
    }

    #[tokio::test]
    async fn test_expired_persisted_entry_is_recomputed() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path().to_path_buf()).await.unwrap();
        let key = fingerprint(21);

        let mut stale = CacheEntry::new(key.clone(), breakdown(1));
        stale.created_at = 0;
        store.save(&stale).await.unwrap();

        let cache = ResultCache::with_store(8, 60, store);
        let fresh = cache.get_or_compute(&key, || Ok(breakdown(2))).await.unwrap();

        assert_eq!(fresh.totals.scene_count, 2);
        assert_eq!(cache.stats().computations, 1);
    }

    #[tokio::test]
    async fn test_shutdown_clears_memory() {
        let cache = ResultCache::in_memory(8, 0);
        cache.get_or_compute(&fingerprint(30), || Ok(breakdown(1))).await.unwrap();

        cache.shutdown().await;

        assert_eq!(cache.stats().entries, 0);
        assert!(!cache.contains(&fingerprint(30)));
    }
}
