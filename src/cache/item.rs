use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use parking_lot::RwLockWriteGuard;
use roaring::RoaringBitmap;
use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::membership::{Index, IndexReadGuard};

/// One cached intersection, addressed by the canonical key of its sources.
pub struct CacheItem {
    pub key: String,
    /// Ascending by cardinality at creation time
    pub sources: Vec<Arc<Index>>,
    result: Arc<Index>,
    ready: AtomicBool,
    queued: AtomicBool,
    promoted: AtomicI64,
    created: i64,
}

impl CacheItem {
    pub fn new(key: String, sources: Vec<Arc<Index>>) -> Self {
        let result = Arc::new(Index::new(&key));
        CacheItem {
            key,
            sources,
            result,
            ready: AtomicBool::new(false),
            queued: AtomicBool::new(false),
            promoted: AtomicI64::new(0),
            created: crate::cache::now_ms(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// The materialized intersection, usable as an ordinary index.
    pub fn result(&self) -> Arc<Index> {
        self.result.clone()
    }

    pub fn promoted_at(&self) -> i64 {
        self.promoted.load(Ordering::Acquire)
    }

    pub(crate) fn touch(&self, now_ms: i64) {
        self.promoted.store(now_ms, Ordering::Release);
    }

    /// Unbuilt, with no build queued or running, and created before
    /// `cutoff`. Left behind when every build request for it was dropped.
    pub(crate) fn is_abandoned(&self, cutoff: i64) -> bool {
        !self.is_ready() && !self.queued.load(Ordering::Acquire) && self.created < cutoff
    }

    /// Claims the right to queue a build. Fails while a build is queued,
    /// running or done.
    pub(crate) fn claim_build(&self) -> bool {
        self.queued
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Gives the claim back after the build request was dropped.
    pub(crate) fn release_build(&self) {
        self.queued.store(false, Ordering::Release);
    }

    /// Exclusive access to the result for the duration of a build. Change
    /// events for this item wait on the same lock.
    pub(crate) fn lock_result(&self) -> RwLockWriteGuard<'_, RoaringBitmap> {
        self.result.write()
    }

    /// Recomputes the intersection into `out`, iterating the smallest
    /// source and probing the others.
    pub(crate) fn intersect_into(&self, out: &mut RoaringBitmap) -> Result<()> {
        if let Some(gone) = self.sources.iter().find(|s| s.is_retired()) {
            return Err(Error::unknown_reference(&gone.name));
        }

        let mut guards: Vec<IndexReadGuard<'_>> = self.sources.iter().map(|s| s.read()).collect();
        guards.sort_by_key(|g| g.len());

        out.clear();
        if let Some((smallest, rest)) = guards.split_first() {
            for id in smallest.iter() {
                if rest.iter().all(|g| g.contains(id)) {
                    out.insert(id.0);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn mark_ready(&self, now_ms: i64) {
        self.touch(now_ms);
        self.ready.store(true, Ordering::Release);
    }

    /// Applies a single-document change reported for `source`.
    ///
    /// An added id joins the intersection only if every other source
    /// already holds it; a removed id always leaves.
    pub(crate) fn apply_change(&self, source: &str, id: DocId, added: bool) {
        let mut out = self.result.write();
        if !added {
            out.remove(id.0);
            return;
        }
        let in_all_others = self
            .sources
            .iter()
            .filter(|s| s.name != source)
            .all(|s| s.contains(id));
        if in_all_others {
            out.insert(id.0);
        }
    }
}
