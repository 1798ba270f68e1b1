use log::debug;
use crate::cache::canonical_names;
use crate::core::engine::Engine;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Direction;
use crate::index::registry::IndexFetcher;
use crate::memory::pool::{Pooled, Reset};
use crate::query::condition::{BoundCondition, Condition};
use crate::search::executor::{self, Page};
use crate::search::results::ResultSet;

/// Pooled request state behind a `Query`.
#[derive(Debug, Default)]
pub struct QueryState {
    sort: String,
    indexes: Vec<String>,      // selected membership indexes
    filters: Vec<Condition>,   // ranked predicates and unions
    limit: Option<usize>,
    offset: usize,
    direction: Direction,
    include_total: bool,
}

impl Reset for QueryState {
    fn reset(&mut self) {
        self.sort.clear();
        self.indexes.clear();
        self.filters.clear();
        self.limit = None;
        self.offset = 0;
        self.direction = Direction::Asc;
        self.include_total = false;
    }
}

/// A query over one sort, built up then executed exactly once.
///
/// ```ignore
/// let result = engine.query("price")
///     .where_index("red")
///     .where_index("in_stock")
///     .filter(Condition::between("rating", 3, 5))
///     .desc()
///     .limit(20)
///     .execute()?;
/// ```
pub struct Query<'e> {
    engine: &'e Engine,
    state: Pooled<QueryState>,
}

impl<'e> Query<'e> {
    pub(crate) fn new(engine: &'e Engine, mut state: Pooled<QueryState>, sort: &str) -> Self {
        state.sort.push_str(sort);
        Query { engine, state }
    }

    /// Restricts results to members of the named index.
    pub fn where_index(mut self, name: &str) -> Self {
        self.state.indexes.push(name.to_string());
        self
    }

    /// Adds a condition. `Set` conditions are treated like `where_index`.
    pub fn filter(mut self, condition: Condition) -> Self {
        match condition {
            Condition::Set { index } => self.state.indexes.push(index),
            other => self.state.filters.push(other),
        }
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.state.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.state.offset = offset;
        self
    }

    pub fn desc(mut self) -> Self {
        self.state.direction = Direction::Desc;
        self
    }

    /// Counts matches up to the configured maximum total.
    pub fn include_total(mut self) -> Self {
        self.state.include_total = true;
        self
    }

    fn validate(&self) -> Result<()> {
        let state = &self.state;
        if state.sort.is_empty() {
            return Err(Error::new(ErrorKind::InvalidInput, "query has no sort".to_string()));
        }

        let mut referenced = state.indexes.len();
        for filter in &state.filters {
            referenced += match filter {
                Condition::Union { indexes } if indexes.is_empty() => {
                    return Err(Error::new(ErrorKind::InvalidInput, "union of no indexes".to_string()));
                }
                Condition::Union { indexes } => indexes.len(),
                _ => 1,
            };
        }
        let max = self.engine.config().max_indexes_per_query;
        if referenced > max {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("query references {} indexes, at most {} allowed", referenced, max),
            ));
        }
        if state.indexes.iter().any(|name| name.is_empty()) {
            return Err(Error::new(ErrorKind::InvalidInput, "empty index name".to_string()));
        }
        Ok(())
    }

    /// Binds the selected indexes: directly for one, through the
    /// intersection cache for several.
    fn bind_selected(&self, names: &[String], out: &mut Vec<BoundCondition>) -> Result<()> {
        let registry = self.engine.registry();
        if names.len() == 1 {
            let mut loaded = Vec::with_capacity(1);
            registry.load_indexes(names, &mut loaded)?;
            out.extend(loaded.into_iter().map(BoundCondition::from_index));
            return Ok(());
        }

        if let Some(cached) = self.engine.cache().get(names, registry)? {
            out.push(BoundCondition::from_index(cached));
            return Ok(());
        }

        let mut raw = Vec::with_capacity(names.len());
        registry.load_indexes(names, &mut raw)?;
        raw.sort_by_key(|index| index.len());
        out.extend(raw.into_iter().map(BoundCondition::from_index));
        Ok(())
    }

    /// Runs the query. The returned result goes back to its pool when
    /// dropped or closed.
    pub fn execute(self) -> Result<Pooled<ResultSet>> {
        self.validate()?;
        let engine = self.engine;
        let state = &self.state;
        let registry = engine.registry();
        let config = engine.config();

        let sort = registry.load_sort(&state.sort)?;
        let names = canonical_names(&state.indexes);

        let mut conditions = Vec::with_capacity(names.len() + state.filters.len());
        if !names.is_empty() {
            self.bind_selected(&names, &mut conditions)?;
        }
        for filter in &state.filters {
            conditions.push(filter.on(registry)?);
        }

        let planner = engine.planner();
        planner.order(&mut conditions);
        let plan = planner.plan(&conditions, sort.len());
        debug!(
            "query on {} with {} conditions: {:?}",
            sort.name(),
            conditions.len(),
            plan
        );

        let page = Page {
            offset: state.offset,
            limit: state.limit.unwrap_or(config.default_limit).min(config.max_limit),
            direction: state.direction,
            include_total: state.include_total,
            max_total: config.max_total,
        };
        let mut result = engine.results().checkout();
        executor::execute(plan, &sort, &conditions, &page, &mut result)?;
        Ok(result)
    }
}
