use std::cmp::Ordering;
use crate::core::config::Config;
use crate::query::condition::BoundCondition;

/// How a query walks its candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPlan {
    /// No conditions: page straight through the sort.
    Sort,
    /// Iterate the smallest condition, filter, then order survivors by rank.
    IndexDriven,
    /// Walk the sort in order and filter each id against every condition.
    SortDriven,
}

/// Chooses a scan tactic from condition cardinalities.
pub struct QueryPlanner {
    pub index_driven_ratio: f64,
    pub index_driven_cap: usize,
}

impl QueryPlanner {
    pub fn new(config: &Config) -> Self {
        QueryPlanner {
            index_driven_ratio: config.index_driven_ratio,
            index_driven_cap: config.index_driven_cap,
        }
    }

    /// Smallest first; conditions that cannot be iterated always last.
    pub fn order(&self, conditions: &mut [BoundCondition]) {
        conditions.sort_by(|a, b| match (a.can_iterate(), b.can_iterate()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a.len().cmp(&b.len()),
        });
    }

    /// Expects conditions already ordered by `order`.
    pub fn plan(&self, conditions: &[BoundCondition], sort_len: usize) -> ScanPlan {
        let driver = match conditions.first() {
            Some(driver) => driver,
            None => return ScanPlan::Sort,
        };
        if !driver.can_iterate() || driver.len() > self.index_driven_cap {
            return ScanPlan::SortDriven;
        }
        if (driver.len() as f64) <= sort_len as f64 * self.index_driven_ratio {
            ScanPlan::IndexDriven
        } else {
            ScanPlan::SortDriven
        }
    }
}
