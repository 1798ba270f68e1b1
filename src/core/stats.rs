use serde::{Serialize, Deserialize};

/// Engine statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub index_count: usize,
    pub sort_count: usize,
    pub cache: CacheStats,
    pub query_pool: PoolStats,
    pub result_pool: PoolStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
    pub builds_enqueued: usize,
    pub builds_dropped: usize,
    pub builds_completed: usize,
    pub builds_failed: usize,
    pub evictions: usize,
    pub entries: usize,       // items in the primary lookup, built or not
    pub lru_len: usize,       // built items tracked for eviction
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStats {
    pub capacity: usize,
    pub available: usize,
    pub checkouts: usize,
    pub transient: usize,     // checkouts served by a fresh allocation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_handles_empty_cache() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        let stats = CacheStats { hit_count: 3, miss_count: 1, ..CacheStats::default() };
        assert_eq!(stats.hit_rate(), 0.75);
    }
}
