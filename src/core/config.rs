use serde::{Serialize, Deserialize};
use crate::core::error::{Error, ErrorKind, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Pagination
    pub default_limit: usize,                   // used when a query sets no limit
    pub max_limit: usize,                       // requested limits are capped to this
    pub max_total: usize,                       // cap on counted totals

    // Planner
    pub index_driven_ratio: f64,                // candidates / sort length below this => index-driven scan
    pub index_driven_cap: usize,                // never index-drive more candidates than this
    pub max_indexes_per_query: usize,

    // Pools
    pub query_pool_size: usize,
    pub result_pool_size: usize,

    // Intersection cache
    pub cache_workers: usize,
    pub cache_queue_size: usize,
    pub cache_staleness_secs: u64,
    pub cache_sweep_interval_ms: u64,
    pub cache_max_evictions_per_sweep: usize,

    // Ranked indexes
    pub skiplist_max_level: usize,
    pub skiplist_probability: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_limit: 10,
            max_limit: 100,
            max_total: 1000,

            index_driven_ratio: 0.05,
            index_driven_cap: 5000,
            max_indexes_per_query: 10,

            query_pool_size: 64,
            result_pool_size: 64,

            cache_workers: num_cpus::get(),
            cache_queue_size: 1024,
            cache_staleness_secs: 300,                 // 5 minutes without a hit
            cache_sweep_interval_ms: 1000,
            cache_max_evictions_per_sweep: 500,

            skiplist_max_level: 32,
            skiplist_probability: 0.5,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.default_limit == 0 || self.max_limit == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "limits must be positive".to_string()));
        }
        if self.default_limit > self.max_limit {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("default_limit {} exceeds max_limit {}", self.default_limit, self.max_limit),
            ));
        }
        if self.max_indexes_per_query == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "max_indexes_per_query must be positive".to_string()));
        }
        if !(self.skiplist_probability > 0.0 && self.skiplist_probability < 1.0) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("skiplist_probability {} outside (0, 1)", self.skiplist_probability),
            ));
        }
        if self.cache_sweep_interval_ms == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "cache_sweep_interval_ms must be positive".to_string()));
        }
        if self.skiplist_max_level == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "skiplist_max_level must be positive".to_string()));
        }
        Ok(())
    }
}
