//! Intersection cache.
//!
//! Memoizes the intersection of a set of membership indexes under the
//! canonical key of their names. Entries are created on the first miss and
//! built by a fixed pool of background workers. Once built they are kept
//! current by single-document change events routed through per-source
//! change buckets, and evicted by a maintenance thread once they go unused
//! for longer than the staleness window.

pub mod bucket;
pub mod item;
mod worker;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use crossbeam::channel::{bounded, Sender};
use log::{debug, info, warn};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use crate::cache::bucket::Buckets;
use crate::cache::item::CacheItem;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::stats::CacheStats;
use crate::core::types::DocId;
use crate::index::membership::Index;
use crate::index::registry::IndexFetcher;

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Sorted, de-duplicated names joined with `&`.
pub fn canonical_key(names: &[String]) -> String {
    canonical_names(names).join("&")
}

pub(crate) fn canonical_names(names: &[String]) -> Vec<String> {
    let mut names = names.to_vec();
    names.sort();
    names.dedup();
    names
}

#[derive(Default)]
pub(crate) struct Counters {
    hits: AtomicUsize,
    misses: AtomicUsize,
    enqueued: AtomicUsize,
    dropped: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    evictions: AtomicUsize,
}

impl Counters {
    pub(crate) fn completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }
}

/// State shared between callers, build workers and the maintenance thread.
///
/// Lock order when more than one is held: an item's result lock, then lru,
/// then lookup, then buckets.
pub(crate) struct CacheState {
    lookup: RwLock<HashMap<String, Arc<CacheItem>>>,
    buckets: Buckets,
    lru: Mutex<LruCache<String, Arc<CacheItem>>>,
    staleness_ms: i64,
    max_per_sweep: usize,
    pub(crate) counters: Counters,
}

impl CacheState {
    fn is_live(&self, item: &Arc<CacheItem>) -> bool {
        self.lookup
            .read()
            .get(&item.key)
            .is_some_and(|held| Arc::ptr_eq(held, item))
    }

    /// Builds `item` in place. Returns `Ok(false)` if the item was
    /// discarded before the build started.
    pub(crate) fn build(&self, item: &Arc<CacheItem>) -> Result<bool> {
        let mut out = item.lock_result();
        if !self.is_live(item) {
            return Ok(false);
        }
        // registered before reading the sources so no change is missed;
        // change events queue behind the result lock held here
        self.buckets.register(item);
        if let Err(e) = item.intersect_into(&mut out) {
            drop(out);
            self.discard(item);
            return Err(e);
        }
        item.mark_ready(now_ms());
        Ok(true)
    }

    /// Removes the item from the lookup, its buckets and the LRU.
    pub(crate) fn discard(&self, item: &Arc<CacheItem>) {
        {
            let mut lru = self.lru.lock();
            if lru.peek(&item.key).is_some_and(|held| Arc::ptr_eq(held, item)) {
                lru.pop(&item.key);
            }
        }
        self.evict(item);
    }

    fn evict(&self, item: &Arc<CacheItem>) {
        {
            let mut lookup = self.lookup.write();
            if lookup.get(&item.key).is_some_and(|held| Arc::ptr_eq(held, item)) {
                lookup.remove(&item.key);
            }
        }
        self.buckets.unregister(item);
    }

    /// Puts a built item under LRU management.
    pub(crate) fn track(&self, item: &Arc<CacheItem>) {
        if !self.is_live(item) {
            return;
        }
        self.lru.lock().put(item.key.clone(), item.clone());
    }

    /// Walks the LRU from its cold end. Items idle past the staleness window
    /// are evicted, the rest are moved to the warm end. Then discards
    /// placeholders abandoned for as long. Returns the number removed.
    pub(crate) fn sweep(&self, now_ms: i64) -> usize {
        let cutoff = now_ms.saturating_sub(self.staleness_ms);
        let mut evicted = self.sweep_lru(cutoff);
        if evicted < self.max_per_sweep {
            evicted += self.reap_abandoned(cutoff, self.max_per_sweep - evicted);
        }
        self.counters.evictions.fetch_add(evicted, Ordering::Relaxed);
        evicted
    }

    fn sweep_lru(&self, cutoff: i64) -> usize {
        let mut lru = self.lru.lock();
        let len = lru.len();
        let mut evicted = 0;

        for _ in 0..len {
            if evicted >= self.max_per_sweep {
                break;
            }
            let (key, item) = match lru.peek_lru() {
                Some((key, item)) => (key.clone(), item.clone()),
                None => break,
            };
            if !self.is_live(&item) {
                lru.pop(&key);
                continue;
            }
            if item.promoted_at() < cutoff {
                lru.pop(&key);
                self.evict(&item);
                evicted += 1;
            } else {
                lru.promote(&key);
            }
        }
        evicted
    }

    /// Placeholders whose builds were all dropped never reach the LRU.
    fn reap_abandoned(&self, cutoff: i64, budget: usize) -> usize {
        let abandoned: Vec<Arc<CacheItem>> = self
            .lookup
            .read()
            .values()
            .filter(|item| item.is_abandoned(cutoff))
            .take(budget)
            .cloned()
            .collect();

        let mut reaped = 0;
        for item in &abandoned {
            let _building = item.lock_result();
            // a get may have re-offered it meanwhile
            if item.is_abandoned(cutoff) {
                self.discard(item);
                reaped += 1;
            }
        }
        if reaped > 0 {
            debug!("reaped {} abandoned cache entries", reaped);
        }
        reaped
    }
}

/// Cache of materialized multi-index intersections.
pub struct IntersectionCache {
    state: Arc<CacheState>,
    builds: RwLock<Option<Sender<Arc<CacheItem>>>>,
    shutdown: Mutex<Option<Sender<()>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    maintenance: Mutex<Option<JoinHandle<()>>>,
}

impl IntersectionCache {
    pub fn new(config: &Config) -> Self {
        let state = Arc::new(CacheState {
            lookup: RwLock::new(HashMap::new()),
            buckets: Buckets::default(),
            lru: Mutex::new(LruCache::unbounded()),
            staleness_ms: (config.cache_staleness_secs as i64).saturating_mul(1000),
            max_per_sweep: config.cache_max_evictions_per_sweep,
            counters: Counters::default(),
        });

        let (build_tx, build_rx) = bounded(config.cache_queue_size);
        let (lru_tx, lru_rx) = bounded(config.cache_queue_size);
        let (shutdown_tx, shutdown_rx) = bounded(1);

        let workers = worker::spawn_builders(config.cache_workers, build_rx, state.clone(), lru_tx);
        let maintenance = worker::spawn_maintenance(
            state.clone(),
            lru_rx,
            shutdown_rx,
            Duration::from_millis(config.cache_sweep_interval_ms),
        );
        info!("intersection cache started with {} build workers", config.cache_workers);

        IntersectionCache {
            state,
            builds: RwLock::new(Some(build_tx)),
            shutdown: Mutex::new(Some(shutdown_tx)),
            workers: Mutex::new(workers),
            maintenance: Mutex::new(Some(maintenance)),
        }
    }

    /// Looks up the intersection of `names`.
    ///
    /// Returns the cached index only when its entry is built. On a miss the
    /// caller is expected to compute the answer itself; a first miss also
    /// registers a placeholder and queues a background build. Fails if any
    /// name is unknown to `fetcher`.
    pub fn get(&self, names: &[String], fetcher: &dyn IndexFetcher) -> Result<Option<Arc<Index>>> {
        let names = canonical_names(names);
        let key = names.join("&");

        let existing = self.state.lookup.read().get(&key).cloned();
        if let Some(item) = existing {
            if item.is_ready() {
                item.touch(now_ms());
                self.state.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!("cache hit for {}", key);
                return Ok(Some(item.result()));
            }
            self.state.counters.misses.fetch_add(1, Ordering::Relaxed);
            // no-op unless an earlier request was dropped
            self.enqueue(&item);
            return Ok(None);
        }

        self.state.counters.misses.fetch_add(1, Ordering::Relaxed);
        let mut sources = Vec::with_capacity(names.len());
        fetcher.load_indexes(&names, &mut sources)?;
        sources.sort_by_key(|s| s.len());

        let item = {
            let mut lookup = self.state.lookup.write();
            if lookup.contains_key(&key) {
                return Ok(None);
            }
            let item = Arc::new(CacheItem::new(key.clone(), sources));
            lookup.insert(key, item.clone());
            item
        };
        debug!("cache miss for {}; entry registered", item.key);
        self.enqueue(&item);
        Ok(None)
    }

    fn enqueue(&self, item: &Arc<CacheItem>) {
        if !item.claim_build() {
            return;
        }
        let sent = match &*self.builds.read() {
            Some(tx) => tx.try_send(item.clone()).is_ok(),
            None => false,
        };
        if sent {
            self.state.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        } else {
            item.release_build();
            self.state.counters.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("cache build queue full; dropped build for {}", item.key);
        }
    }

    /// Reports that `id` entered (`added`) or left the index `name`. Must be
    /// called after the index itself was updated.
    pub fn changed(&self, name: &str, id: DocId, added: bool) {
        for item in self.state.buckets.items_for(name) {
            item.apply_change(name, id, added);
        }
    }

    /// Discards every entry built over `source`. Returns the number removed.
    pub fn invalidate(&self, source: &str) -> usize {
        let doomed: Vec<Arc<CacheItem>> = self
            .state
            .lookup
            .read()
            .values()
            .filter(|item| item.sources.iter().any(|s| s.name == source))
            .cloned()
            .collect();
        for item in &doomed {
            // waits out a running build so it cannot re-register afterwards
            let _building = item.lock_result();
            self.state.discard(item);
        }
        if !doomed.is_empty() {
            debug!("invalidated {} cache entries over {}", doomed.len(), source);
        }
        doomed.len()
    }

    /// Runs one eviction pass now instead of waiting for the next tick.
    pub fn sweep(&self) -> usize {
        self.state.sweep(now_ms())
    }

    pub(crate) fn sweep_at(&self, now_ms: i64) -> usize {
        self.state.sweep(now_ms)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.state.lookup.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.state.lookup.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let counters = &self.state.counters;
        CacheStats {
            hit_count: counters.hits.load(Ordering::Relaxed),
            miss_count: counters.misses.load(Ordering::Relaxed),
            builds_enqueued: counters.enqueued.load(Ordering::Relaxed),
            builds_dropped: counters.dropped.load(Ordering::Relaxed),
            builds_completed: counters.completed.load(Ordering::Relaxed),
            builds_failed: counters.failed.load(Ordering::Relaxed),
            evictions: counters.evictions.load(Ordering::Relaxed),
            entries: self.state.lookup.read().len(),
            lru_len: self.state.lru.lock().len(),
        }
    }

    /// Stops the workers after they drain the build queue, then stops the
    /// maintenance thread. Later misses are counted as dropped builds.
    pub fn shutdown(&self) {
        let builds = self.builds.write().take();
        if builds.is_none() {
            return;
        }
        drop(builds);

        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in workers {
            if handle.join().is_err() {
                warn!("cache build worker exited abnormally");
            }
        }

        drop(self.shutdown.lock().take());
        if let Some(handle) = self.maintenance.lock().take() {
            if handle.join().is_err() {
                warn!("cache maintenance thread exited abnormally");
            }
        }
        info!("intersection cache stopped");
    }
}

impl Drop for IntersectionCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}
