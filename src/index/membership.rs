use std::sync::atomic::{AtomicBool, Ordering};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use roaring::RoaringBitmap;
use crate::core::types::DocId;

/// Unordered membership index: the set of ids that belong to one name.
#[derive(Debug)]
pub struct Index {
    pub name: String,
    ids: RwLock<RoaringBitmap>,
    retired: AtomicBool,
}

/// Shared view over an index held for a bulk pass (intersections, scans).
/// Taken recursively so a scan holding several views never queues behind
/// a pending writer.
pub struct IndexReadGuard<'a> {
    ids: RwLockReadGuard<'a, RoaringBitmap>,
}

impl Index {
    pub fn new(name: &str) -> Self {
        Index {
            name: name.to_string(),
            ids: RwLock::new(RoaringBitmap::new()),
            retired: AtomicBool::new(false),
        }
    }

    pub fn from_ids<I>(name: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = DocId>,
    {
        let bitmap: RoaringBitmap = ids.into_iter().map(|id| id.0).collect();
        Index {
            name: name.to_string(),
            ids: RwLock::new(bitmap),
            retired: AtomicBool::new(false),
        }
    }

    /// Returns true if the id was not already present. Callers outside the
    /// crate go through `Engine::add` so cached intersections see the change.
    pub(crate) fn add(&self, id: DocId) -> bool {
        self.ids.write().insert(id.0)
    }

    /// Returns true if the id was present.
    pub(crate) fn remove(&self, id: DocId) -> bool {
        self.ids.write().remove(id.0)
    }

    pub fn contains(&self, id: DocId) -> bool {
        self.ids.read_recursive().contains(id.0)
    }

    pub fn len(&self) -> usize {
        self.ids.read_recursive().len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.ids.read_recursive().is_empty()
    }

    pub fn read(&self) -> IndexReadGuard<'_> {
        IndexReadGuard { ids: self.ids.read_recursive() }
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, RoaringBitmap> {
        self.ids.write()
    }

    /// Snapshot of the members in ascending id order.
    pub fn ids(&self) -> Vec<DocId> {
        self.ids.read_recursive().iter().map(DocId).collect()
    }

    /// Marks the index as no longer registered. Cached intersections bound
    /// to it can no longer be built.
    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }
}

impl<'a> IndexReadGuard<'a> {
    pub fn contains(&self, id: DocId) -> bool {
        self.ids.contains(id.0)
    }

    pub fn len(&self) -> usize {
        self.ids.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = DocId> + '_ {
        self.ids.iter().map(DocId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_remove_contains() {
        let index = Index::new("red");
        assert!(index.add(DocId(3)));
        assert!(!index.add(DocId(3)));
        assert!(index.add(DocId(9)));
        assert_eq!(index.len(), 2);
        assert!(index.contains(DocId(9)));

        assert!(index.remove(DocId(9)));
        assert!(!index.remove(DocId(9)));
        assert!(!index.contains(DocId(9)));
        assert_eq!(index.ids(), vec![DocId(3)]);
    }

    #[test]
    fn read_guard_iterates_in_id_order() {
        let index = Index::from_ids("tags", [DocId(7), DocId(1), DocId(4)]);
        let guard = index.read();
        let ids: Vec<DocId> = guard.iter().collect();
        assert_eq!(ids, vec![DocId(1), DocId(4), DocId(7)]);
        assert!(guard.contains(DocId(4)));
        assert_eq!(guard.len(), 3);
    }

    #[test]
    fn retire_is_sticky() {
        let index = Index::new("gone");
        assert!(!index.is_retired());
        index.retire();
        assert!(index.is_retired());
    }
}
