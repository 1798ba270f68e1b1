use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use crate::cache::item::CacheItem;

/// Cached items that depend on one source index, keyed by item key.
#[derive(Default)]
pub struct ChangeBucket {
    items: RwLock<HashMap<String, Arc<CacheItem>>>,
}

impl ChangeBucket {
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn items(&self) -> Vec<Arc<CacheItem>> {
        self.items.read().values().cloned().collect()
    }
}

/// Reverse index from source name to the change bucket of that source.
#[derive(Default)]
pub struct Buckets {
    map: RwLock<HashMap<String, Arc<ChangeBucket>>>,
}

impl Buckets {
    /// Adds the item to the bucket of each of its sources.
    pub fn register(&self, item: &Arc<CacheItem>) {
        let mut map = self.map.write();
        for source in &item.sources {
            let bucket = map.entry(source.name.clone()).or_default();
            bucket.items.write().insert(item.key.clone(), item.clone());
        }
    }

    /// Removes the item from every bucket that references it, dropping
    /// buckets left empty.
    pub fn unregister(&self, item: &Arc<CacheItem>) {
        let mut map = self.map.write();
        for source in &item.sources {
            let now_empty = match map.get(&source.name) {
                Some(bucket) => {
                    let mut items = bucket.items.write();
                    if items.get(&item.key).is_some_and(|held| Arc::ptr_eq(held, item)) {
                        items.remove(&item.key);
                    }
                    items.is_empty()
                }
                None => false,
            };
            if now_empty {
                map.remove(&source.name);
            }
        }
    }

    pub fn items_for(&self, source: &str) -> Vec<Arc<CacheItem>> {
        let bucket = self.map.read().get(source).cloned();
        bucket.map(|b| b.items()).unwrap_or_default()
    }

    pub fn bucket(&self, source: &str) -> Option<Arc<ChangeBucket>> {
        self.map.read().get(source).cloned()
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::membership::Index;

    fn item(key: &str, sources: &[&str]) -> Arc<CacheItem> {
        let sources = sources.iter().map(|s| Arc::new(Index::new(s))).collect();
        Arc::new(CacheItem::new(key.to_string(), sources))
    }

    #[test]
    fn items_live_in_their_sources_buckets() {
        let buckets = Buckets::default();
        let ab = item("a&b", &["a", "b"]);
        let bc = item("b&c", &["b", "c"]);
        buckets.register(&ab);
        buckets.register(&bc);

        assert_eq!(buckets.items_for("a").len(), 1);
        assert_eq!(buckets.items_for("b").len(), 2);
        assert_eq!(buckets.items_for("c").len(), 1);
        assert!(buckets.items_for("d").is_empty());

        buckets.unregister(&ab);
        assert!(buckets.bucket("a").is_none());
        assert_eq!(buckets.bucket("b").map(|b| b.len()), Some(1));
        assert_eq!(buckets.len(), 2);
    }

    #[test]
    fn unregister_ignores_replaced_items() {
        let buckets = Buckets::default();
        let old = item("a&b", &["a", "b"]);
        let new = item("a&b", &["a", "b"]);
        buckets.register(&new);
        buckets.unregister(&old);
        assert_eq!(buckets.items_for("a").len(), 1);
    }
}
