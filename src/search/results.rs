use crate::core::types::DocId;
use crate::memory::pool::Reset;

/// Page of matching ids in result order, with pagination bookkeeping.
#[derive(Debug, Default)]
pub struct ResultSet {
    pub(crate) ids: Vec<DocId>,
    pub(crate) found: usize,             // matches seen while scanning
    pub(crate) total: Option<usize>,     // only when a total was requested
    pub(crate) total_capped: bool,
    pub(crate) has_more: bool,
}

impl ResultSet {
    pub fn ids(&self) -> &[DocId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Matches examined by the scan, including skipped offset entries.
    pub fn found(&self) -> usize {
        self.found
    }

    /// Total number of matches, if requested. Capped totals report the cap.
    pub fn total(&self) -> Option<usize> {
        self.total
    }

    /// True when the total stopped counting at the configured maximum.
    pub fn is_total_capped(&self) -> bool {
        self.total_capped
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub(crate) fn push(&mut self, id: DocId) {
        self.ids.push(id);
    }
}

impl Reset for ResultSet {
    fn reset(&mut self) {
        self.ids.clear();
        self.found = 0;
        self.total = None;
        self.total_capped = false;
        self.has_more = false;
    }
}
