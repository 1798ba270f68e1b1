use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use crate::core::error::{Error, Result};
use crate::index::membership::Index;
use crate::index::sorted::SortedIndex;

/// Resolves index and sort names to live handles.
///
/// Implementations must fail on the first unknown name instead of handing
/// back an empty stand-in.
pub trait IndexFetcher: Send + Sync {
    /// Appends one handle per name to `out`, in the order given.
    fn load_indexes(&self, names: &[String], out: &mut Vec<Arc<Index>>) -> Result<()>;

    fn load_sort(&self, name: &str) -> Result<Arc<SortedIndex>>;
}

/// Catalog of the named indexes and sorts of one engine.
pub struct Registry {
    indexes: RwLock<HashMap<String, Arc<Index>>>,
    sorts: RwLock<HashMap<String, Arc<SortedIndex>>>,
    max_level: usize,
    probability: f64,
}

impl Registry {
    pub fn new(max_level: usize, probability: f64) -> Self {
        Registry {
            indexes: RwLock::new(HashMap::new()),
            sorts: RwLock::new(HashMap::new()),
            max_level,
            probability,
        }
    }

    /// Returns the index registered under `name`, creating it if needed.
    pub fn create_index(&self, name: &str) -> Arc<Index> {
        if let Some(index) = self.indexes.read().get(name) {
            return index.clone();
        }
        let mut indexes = self.indexes.write();
        indexes
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Index::new(name)))
            .clone()
    }

    /// Returns the sort registered under `name`, creating a dynamic one if
    /// needed.
    pub fn create_sort(&self, name: &str) -> Arc<SortedIndex> {
        if let Some(sort) = self.sorts.read().get(name) {
            return sort.clone();
        }
        let mut sorts = self.sorts.write();
        sorts
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(SortedIndex::dynamic(name, self.max_level, self.probability)))
            .clone()
    }

    /// Installs `sort` under its name, replacing any previous one. Queries
    /// already running keep the handle they resolved.
    pub fn install_sort(&self, sort: SortedIndex) -> Arc<SortedIndex> {
        let sort = Arc::new(sort);
        self.sorts.write().insert(sort.name().to_string(), sort.clone());
        sort
    }

    pub fn index(&self, name: &str) -> Option<Arc<Index>> {
        self.indexes.read().get(name).cloned()
    }

    pub fn sort(&self, name: &str) -> Option<Arc<SortedIndex>> {
        self.sorts.read().get(name).cloned()
    }

    /// Unregisters an index and marks it retired.
    pub fn drop_index(&self, name: &str) -> Option<Arc<Index>> {
        let removed = self.indexes.write().remove(name);
        if let Some(index) = &removed {
            index.retire();
        }
        removed
    }

    pub fn indexes(&self) -> Vec<Arc<Index>> {
        self.indexes.read().values().cloned().collect()
    }

    pub fn sorts(&self) -> Vec<Arc<SortedIndex>> {
        self.sorts.read().values().cloned().collect()
    }

    pub fn index_count(&self) -> usize {
        self.indexes.read().len()
    }

    pub fn sort_count(&self) -> usize {
        self.sorts.read().len()
    }
}

impl IndexFetcher for Registry {
    fn load_indexes(&self, names: &[String], out: &mut Vec<Arc<Index>>) -> Result<()> {
        let indexes = self.indexes.read();
        for name in names {
            match indexes.get(name) {
                Some(index) => out.push(index.clone()),
                None => return Err(Error::unknown_reference(name)),
            }
        }
        Ok(())
    }

    fn load_sort(&self, name: &str) -> Result<Arc<SortedIndex>> {
        self.sort(name).ok_or_else(|| Error::unknown_reference(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::types::DocId;
    use crate::index::static_sort::StaticSort;

    #[test]
    fn create_is_idempotent() {
        let registry = Registry::new(8, 0.5);
        let a = registry.create_index("red");
        let b = registry.create_index("red");
        assert!(Arc::ptr_eq(&a, &b));
        let s1 = registry.create_sort("price");
        let s2 = registry.create_sort("price");
        assert!(Arc::ptr_eq(&s1, &s2));
    }

    #[test]
    fn load_indexes_fails_on_unknown_name() {
        let registry = Registry::new(8, 0.5);
        registry.create_index("red");
        let mut out = Vec::new();
        let names = vec!["red".to_string(), "blue".to_string()];
        let err = registry.load_indexes(&names, &mut out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownReference);
        assert!(err.context.contains("blue"));
    }

    #[test]
    fn install_replaces_sort() {
        let registry = Registry::new(8, 0.5);
        registry.create_sort("recent");
        registry.install_sort(SortedIndex::Static(StaticSort::load("recent", [DocId(4), DocId(2)])));
        let sort = registry.load_sort("recent").unwrap();
        assert!(sort.is_static());
        assert_eq!(sort.rank(DocId(2)), Some(1));
    }

    #[test]
    fn drop_index_retires_handle() {
        let registry = Registry::new(8, 0.5);
        let index = registry.create_index("red");
        registry.drop_index("red");
        assert!(index.is_retired());
        assert!(registry.index("red").is_none());
    }
}
