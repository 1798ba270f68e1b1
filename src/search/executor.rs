use crate::core::error::Result;
use crate::core::types::{DocId, Direction};
use crate::index::sorted::SortedIndex;
use crate::query::condition::BoundCondition;
use crate::query::planner::ScanPlan;
use crate::search::results::ResultSet;

/// Pagination of one execution.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
    pub direction: Direction,
    pub include_total: bool,
    pub max_total: usize,
}

impl Page {
    /// Matches needed before the page is known to be full.
    fn wanted(&self) -> usize {
        self.offset.saturating_add(self.limit)
    }
}

/// Runs the chosen scan and fills `result`.
pub fn execute(
    plan: ScanPlan,
    sort: &SortedIndex,
    conditions: &[BoundCondition],
    page: &Page,
    result: &mut ResultSet,
) -> Result<()> {
    match plan {
        ScanPlan::Sort => {
            scan_sort(sort, page, result);
            Ok(())
        }
        ScanPlan::IndexDriven => scan_index_driven(sort, conditions, page, result),
        ScanPlan::SortDriven => {
            scan_sort_driven(sort, conditions, page, result);
            Ok(())
        }
    }
}

fn matches_all(conditions: &[BoundCondition], id: DocId) -> bool {
    conditions.iter().all(|c| c.contains(id).is_some())
}

fn scan_sort(sort: &SortedIndex, page: &Page, result: &mut ResultSet) {
    let mut iter = sort.iter(page.direction).offset(page.offset);
    for id in iter.by_ref().take(page.limit) {
        result.push(id);
    }
    result.has_more = iter.next().is_some();
    iter.close();

    let len = sort.len();
    result.found = len.min(page.wanted().saturating_add(1));
    if page.include_total {
        result.total = Some(len);
    }
}

fn scan_index_driven(
    sort: &SortedIndex,
    conditions: &[BoundCondition],
    page: &Page,
    result: &mut ResultSet,
) -> Result<()> {
    let (driver, rest) = match conditions.split_first() {
        Some(split) => split,
        None => {
            scan_sort(sort, page, result);
            return Ok(());
        }
    };

    let mut ranked: Vec<(usize, DocId)> = Vec::with_capacity(driver.len());
    for id in driver.iter(Direction::Asc)? {
        // ranked drivers resolved their window at bind time; recheck it
        if driver.contains(id).is_none() || !matches_all(rest, id) {
            continue;
        }
        if let Some(rank) = sort.rank(id) {
            ranked.push((rank, id));
        }
    }

    ranked.sort_unstable();
    if page.direction.is_desc() {
        ranked.reverse();
    }

    for &(_, id) in ranked.iter().skip(page.offset).take(page.limit) {
        result.push(id);
    }
    result.found = ranked.len();
    result.has_more = ranked.len() > page.wanted();
    if page.include_total {
        result.total = Some(ranked.len().min(page.max_total));
        result.total_capped = ranked.len() > page.max_total;
    }
    Ok(())
}

fn scan_sort_driven(
    sort: &SortedIndex,
    conditions: &[BoundCondition],
    page: &Page,
    result: &mut ResultSet,
) {
    let wanted = page.wanted();
    let mut found = 0usize;
    let mut stopped_early = false;

    let mut iter = sort.iter(page.direction);
    for id in iter.by_ref() {
        if !matches_all(conditions, id) {
            continue;
        }
        found += 1;
        if found > page.offset && result.ids.len() < page.limit {
            result.push(id);
        }
        if found > wanted && (!page.include_total || found >= page.max_total) {
            stopped_early = true;
            break;
        }
    }
    iter.close();

    result.found = found;
    result.has_more = found > wanted;
    if page.include_total {
        result.total = Some(found.min(page.max_total));
        // a full scan can still pass the cap when the page reaches past it
        result.total_capped = found > page.max_total || (stopped_early && found >= page.max_total);
    }
}
