use std::sync::Arc;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, Direction, Score};
use crate::index::membership::Index;
use crate::index::registry::IndexFetcher;
use crate::index::sorted::{SortedIndex, SortIter};

/// A predicate over one named index, not yet resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equal { index: String, value: Score },
    Between { index: String, low: Score, high: Score },
    LessThan { index: String, value: Score },
    LessThanOrEqual { index: String, value: Score },
    GreaterThan { index: String, value: Score },
    GreaterThanOrEqual { index: String, value: Score },
    /// Membership in an unranked index
    Set { index: String },
    /// Membership in any of several unranked indexes
    Union { indexes: Vec<String> },
}

impl Condition {
    pub fn equal(index: &str, value: Score) -> Self {
        Condition::Equal { index: index.to_string(), value }
    }

    pub fn between(index: &str, low: Score, high: Score) -> Self {
        Condition::Between { index: index.to_string(), low, high }
    }

    pub fn less_than(index: &str, value: Score) -> Self {
        Condition::LessThan { index: index.to_string(), value }
    }

    pub fn less_than_or_equal(index: &str, value: Score) -> Self {
        Condition::LessThanOrEqual { index: index.to_string(), value }
    }

    pub fn greater_than(index: &str, value: Score) -> Self {
        Condition::GreaterThan { index: index.to_string(), value }
    }

    pub fn greater_than_or_equal(index: &str, value: Score) -> Self {
        Condition::GreaterThanOrEqual { index: index.to_string(), value }
    }

    pub fn set(index: &str) -> Self {
        Condition::Set { index: index.to_string() }
    }

    pub fn union(indexes: &[&str]) -> Self {
        Condition::Union { indexes: indexes.iter().map(|s| s.to_string()).collect() }
    }

    /// Canonical identity, used in logs.
    pub fn key(&self) -> String {
        match self {
            Condition::Equal { index, value } => format!("{}={}", index, value),
            Condition::Between { index, low, high } => format!("{}[{}:{}]", index, low, high),
            Condition::LessThan { index, value } => format!("{}<{}", index, value),
            Condition::LessThanOrEqual { index, value } => format!("{}<={}", index, value),
            Condition::GreaterThan { index, value } => format!("{}>{}", index, value),
            Condition::GreaterThanOrEqual { index, value } => format!("{}>={}", index, value),
            Condition::Set { index } => index.clone(),
            Condition::Union { indexes } => format!("({})", indexes.join("|")),
        }
    }

    /// Inclusive score window of a ranked predicate; `None` when nothing
    /// can match, or for unranked predicates.
    fn score_window(&self) -> Option<(Score, Score)> {
        match *self {
            Condition::Equal { value, .. } => Some((value, value)),
            Condition::Between { low, high, .. } if low <= high => Some((low, high)),
            Condition::LessThan { value, .. } => value.checked_sub(1).map(|high| (Score::MIN, high)),
            Condition::LessThanOrEqual { value, .. } => Some((Score::MIN, value)),
            Condition::GreaterThan { value, .. } => value.checked_add(1).map(|low| (low, Score::MAX)),
            Condition::GreaterThanOrEqual { value, .. } => Some((value, Score::MAX)),
            _ => None,
        }
    }

    /// Resolves the condition against live indexes.
    pub fn on(&self, fetcher: &dyn IndexFetcher) -> Result<BoundCondition> {
        let key = self.key();
        match self {
            Condition::Set { index } => {
                let mut out = Vec::with_capacity(1);
                fetcher.load_indexes(std::slice::from_ref(index), &mut out)?;
                let index = out.pop().ok_or_else(|| Error::unknown_reference(index))?;
                Ok(BoundCondition::from_index(index))
            }
            Condition::Union { indexes } => {
                let mut members = Vec::with_capacity(indexes.len());
                fetcher.load_indexes(indexes, &mut members)?;
                // longest member, not the size of the union
                let len = members.iter().map(|m| m.len()).max().unwrap_or(0);
                Ok(BoundCondition { key, len, target: Target::Union(members) })
            }
            Condition::Equal { index, .. }
            | Condition::Between { index, .. }
            | Condition::LessThan { index, .. }
            | Condition::LessThanOrEqual { index, .. }
            | Condition::GreaterThan { index, .. }
            | Condition::GreaterThanOrEqual { index, .. } => {
                let sort = fetcher.load_sort(index)?;
                let window = self.score_window();
                let (start, end) = match window {
                    Some((low, high)) => {
                        let first = sort.get_rank(low, true);
                        let last = sort.get_rank(high, false);
                        (first.max(0) as usize, (last + 1).max(0) as usize)
                    }
                    None => (0, 0),
                };
                let len = end.saturating_sub(start);
                Ok(BoundCondition {
                    key,
                    len,
                    target: Target::Ranked { index: sort, window, start, end },
                })
            }
        }
    }
}

enum Target {
    Ranked {
        index: Arc<SortedIndex>,
        window: Option<(Score, Score)>,
        start: usize,
        end: usize,
    },
    Set(Arc<Index>),
    Union(Vec<Arc<Index>>),
}

/// A condition bound to concrete indexes, with its cardinality computed
/// once at bind time.
pub struct BoundCondition {
    key: String,
    len: usize,
    target: Target,
}

impl BoundCondition {
    /// Membership condition over an already resolved index.
    pub fn from_index(index: Arc<Index>) -> Self {
        BoundCondition {
            key: index.name.clone(),
            len: index.len(),
            target: Target::Set(index),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Unions cannot drive a scan: their members live in unrelated orders.
    pub fn can_iterate(&self) -> bool {
        !matches!(self.target, Target::Union(_))
    }

    pub fn is_set(&self) -> bool {
        matches!(self.target, Target::Set(_))
    }

    /// The underlying index of a membership condition.
    pub fn set_index(&self) -> Option<&Arc<Index>> {
        match &self.target {
            Target::Set(index) => Some(index),
            _ => None,
        }
    }

    /// Half-open position window of a ranked condition.
    pub fn range(&self) -> Option<(usize, usize)> {
        match self.target {
            Target::Ranked { start, end, .. } => Some((start, end)),
            _ => None,
        }
    }

    /// Returns the id's score when it satisfies the condition. Membership
    /// conditions report a score of 0.
    pub fn contains(&self, id: DocId) -> Option<Score> {
        match &self.target {
            Target::Ranked { index, window, .. } => {
                let (low, high) = (*window)?;
                index.score(id).filter(|score| *score >= low && *score <= high)
            }
            Target::Set(index) => index.contains(id).then_some(0),
            Target::Union(members) => members.iter().any(|m| m.contains(id)).then_some(0),
        }
    }

    /// Ids satisfying the condition. Ranked conditions yield them in the
    /// index's order; membership conditions in id order.
    pub fn iter(&self, direction: Direction) -> Result<ConditionIter<'_>> {
        match &self.target {
            Target::Ranked { index, start, end, .. } => {
                Ok(ConditionIter::Ranked(index.iter(direction).bounds(*start, *end)))
            }
            Target::Set(index) => Ok(ConditionIter::Set(index.ids().into_iter())),
            Target::Union(_) => Err(Error::illegal_iteration(&self.key)),
        }
    }
}

pub enum ConditionIter<'a> {
    Ranked(SortIter<'a>),
    Set(std::vec::IntoIter<DocId>),
}

impl<'a> Iterator for ConditionIter<'a> {
    type Item = DocId;

    fn next(&mut self) -> Option<DocId> {
        match self {
            ConditionIter::Ranked(iter) => iter.next(),
            ConditionIter::Set(iter) => iter.next(),
        }
    }
}
