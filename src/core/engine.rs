use std::sync::Arc;
use log::info;
use crate::cache::IntersectionCache;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::stats::EngineStats;
use crate::core::types::{DocId, Score};
use crate::index::membership::Index;
use crate::index::registry::Registry;
use crate::index::sorted::SortedIndex;
use crate::index::static_sort::StaticSort;
use crate::memory::pool::Pool;
use crate::query::builder::{Query, QueryState};
use crate::query::planner::QueryPlanner;
use crate::search::results::ResultSet;

/// Engine context: the index catalog, the intersection cache, the query
/// planner and the Query/Result pools. Create one per collection and share
/// it by reference.
pub struct Engine {
    config: Config,

    registry: Registry,
    cache: IntersectionCache,      // build workers + maintenance thread
    planner: QueryPlanner,

    queries: Arc<Pool<QueryState>>,
    results: Arc<Pool<ResultSet>>,
}

impl Engine {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let registry = Registry::new(config.skiplist_max_level, config.skiplist_probability);
        let cache = IntersectionCache::new(&config);
        let planner = QueryPlanner::new(&config);
        let queries = Pool::new(config.query_pool_size);
        let results = Pool::new(config.result_pool_size);

        info!(
            "engine started (query pool {}, result pool {})",
            config.query_pool_size, config.result_pool_size
        );

        Ok(Self {
            config,
            registry,
            cache,
            planner,
            queries,
            results,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> &IntersectionCache {
        &self.cache
    }

    pub(crate) fn planner(&self) -> &QueryPlanner {
        &self.planner
    }

    pub(crate) fn results(&self) -> &Arc<Pool<ResultSet>> {
        &self.results
    }

    // Catalog

    /// Registers an empty index. The returned handle is read-only; membership
    /// changes go through `add` and `remove`.
    pub fn create_index(&self, name: &str) -> Arc<Index> {
        self.registry.create_index(name)
    }

    pub fn create_sort(&self, name: &str) -> Arc<SortedIndex> {
        self.registry.create_sort(name)
    }

    /// Replaces the sort `name` with a static one ordered as `ids`. Running
    /// queries finish on the sort they started with.
    pub fn load_static_sort<I>(&self, name: &str, ids: I) -> Arc<SortedIndex>
    where
        I: IntoIterator<Item = DocId>,
    {
        let sort = self.registry.install_sort(SortedIndex::Static(StaticSort::load(name, ids)));
        info!("loaded static sort {} with {} ids", name, sort.len());
        sort
    }

    /// Unregisters an index and discards every cache entry built over it.
    pub fn drop_index(&self, name: &str) -> Result<()> {
        self.registry
            .drop_index(name)
            .ok_or_else(|| Error::unknown_reference(name))?;
        self.cache.invalidate(name);
        info!("dropped index {}", name);
        Ok(())
    }

    pub fn index(&self, name: &str) -> Option<Arc<Index>> {
        self.registry.index(name)
    }

    pub fn sort(&self, name: &str) -> Option<Arc<SortedIndex>> {
        self.registry.sort(name)
    }

    // Mutation. Each helper updates the index first, then reports the
    // change to the cache.

    /// Adds `id` to index `name`. Returns false if it was already there.
    pub fn add(&self, name: &str, id: DocId) -> Result<bool> {
        let index = self.registry.index(name).ok_or_else(|| Error::unknown_reference(name))?;
        let added = index.add(id);
        if added {
            self.cache.changed(name, id, true);
        }
        Ok(added)
    }

    /// Removes `id` from index `name`. Returns false if it was not there.
    pub fn remove(&self, name: &str, id: DocId) -> Result<bool> {
        let index = self.registry.index(name).ok_or_else(|| Error::unknown_reference(name))?;
        let removed = index.remove(id);
        if removed {
            self.cache.changed(name, id, false);
        }
        Ok(removed)
    }

    pub fn set_score(&self, sort: &str, id: DocId, score: Score) -> Result<bool> {
        let sort = self.registry.sort(sort).ok_or_else(|| Error::unknown_reference(sort))?;
        sort.set(id, score)
    }

    pub fn remove_score(&self, sort: &str, id: DocId) -> Result<bool> {
        let sort = self.registry.sort(sort).ok_or_else(|| Error::unknown_reference(sort))?;
        sort.remove(id)
    }

    /// Removes `id` from every index and every dynamic sort.
    pub fn remove_document(&self, id: DocId) -> Result<()> {
        for index in self.registry.indexes() {
            if index.remove(id) {
                self.cache.changed(&index.name, id, false);
            }
        }
        for sort in self.registry.sorts() {
            if !sort.is_static() {
                sort.remove(id)?;
            }
        }
        Ok(())
    }

    // Queries

    /// Starts a query ordered by the sort `name`. The name is resolved when
    /// the query executes.
    pub fn query(&self, sort: &str) -> Query<'_> {
        Query::new(self, self.queries.checkout(), sort)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            index_count: self.registry.index_count(),
            sort_count: self.registry.sort_count(),
            cache: self.cache.stats(),
            query_pool: self.queries.stats(),
            result_pool: self.results.stats(),
        }
    }

    /// Stops the cache workers. Queries keep working without background
    /// builds.
    pub fn shutdown(&self) {
        self.cache.shutdown();
        info!("engine stopped");
    }
}
