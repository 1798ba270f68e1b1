use parking_lot::RwLockReadGuard;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Direction, Score};
use crate::index::skiplist::{SkipList, SkipListInner};
use crate::index::static_sort::{StaticSort, StaticInner};

/// A ranked index: a total order over ids.
pub enum SortedIndex {
    Dynamic(SkipList),
    Static(StaticSort),
}

impl SortedIndex {
    pub fn dynamic(name: &str, max_level: usize, probability: f64) -> Self {
        SortedIndex::Dynamic(SkipList::new(name, max_level, probability))
    }

    pub fn name(&self) -> &str {
        match self {
            SortedIndex::Dynamic(list) => &list.name,
            SortedIndex::Static(sort) => &sort.name,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, SortedIndex::Static(_))
    }

    pub fn len(&self) -> usize {
        match self {
            SortedIndex::Dynamic(list) => list.len(),
            SortedIndex::Static(sort) => sort.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: DocId) -> bool {
        match self {
            SortedIndex::Dynamic(list) => list.contains(id),
            SortedIndex::Static(sort) => sort.contains(id),
        }
    }

    pub fn rank(&self, id: DocId) -> Option<usize> {
        match self {
            SortedIndex::Dynamic(list) => list.rank(id),
            SortedIndex::Static(sort) => sort.rank(id),
        }
    }

    pub fn score(&self, id: DocId) -> Option<Score> {
        match self {
            SortedIndex::Dynamic(list) => list.score(id),
            SortedIndex::Static(sort) => sort.score(id),
        }
    }

    pub fn lower_bound(&self, score: Score) -> usize {
        match self {
            SortedIndex::Dynamic(list) => list.lower_bound(score),
            SortedIndex::Static(sort) => sort.lower_bound(score),
        }
    }

    pub fn upper_bound(&self, score: Score) -> usize {
        match self {
            SortedIndex::Dynamic(list) => list.upper_bound(score),
            SortedIndex::Static(sort) => sort.upper_bound(score),
        }
    }

    /// First (`first = true`) or last position occupied by `score`.
    ///
    /// When the score is absent the two positions cross, so
    /// `get_rank(s, false) - get_rank(s, true) + 1` is the number of
    /// entries holding exactly `s` in every case.
    pub fn get_rank(&self, score: Score, first: bool) -> isize {
        if first {
            self.lower_bound(score) as isize
        } else {
            self.upper_bound(score) as isize - 1
        }
    }

    pub fn set(&self, id: DocId, score: Score) -> Result<bool> {
        match self {
            SortedIndex::Dynamic(list) => Ok(list.set(id, score)),
            SortedIndex::Static(sort) => Err(Error::new(
                ErrorKind::Unsupported,
                format!("static sort {} only supports append and prepend", sort.name),
            )),
        }
    }

    pub fn remove(&self, id: DocId) -> Result<bool> {
        match self {
            SortedIndex::Dynamic(list) => Ok(list.remove(id)),
            SortedIndex::Static(sort) => Err(Error::new(
                ErrorKind::Unsupported,
                format!("static sort {} does not support removal", sort.name),
            )),
        }
    }

    pub fn forwards(&self) -> SortIter<'_> {
        self.iter(Direction::Asc)
    }

    pub fn backwards(&self) -> SortIter<'_> {
        self.iter(Direction::Desc)
    }

    pub fn iter(&self, direction: Direction) -> SortIter<'_> {
        let cursor = match self {
            SortedIndex::Dynamic(list) => Cursor::Dynamic(list.read()),
            SortedIndex::Static(sort) => Cursor::Static(sort.read()),
        };
        let len = cursor.len();
        SortIter {
            cursor,
            direction,
            start: 0,
            end: len,
            offset: 0,
            state: State::Pending,
        }
    }
}

enum Cursor<'a> {
    Dynamic(RwLockReadGuard<'a, SkipListInner>),
    Static(RwLockReadGuard<'a, StaticInner>),
}

impl<'a> Cursor<'a> {
    fn len(&self) -> usize {
        match self {
            Cursor::Dynamic(inner) => inner.len(),
            Cursor::Static(inner) => inner.len(),
        }
    }

    fn seek(&self, position: usize) -> Option<usize> {
        match self {
            Cursor::Dynamic(inner) => inner.seek(position),
            Cursor::Static(inner) => inner.seek(position),
        }
    }

    fn step(&self, slot: usize, direction: Direction) -> Option<usize> {
        match (self, direction) {
            (Cursor::Dynamic(inner), Direction::Asc) => inner.next_slot(slot),
            (Cursor::Dynamic(inner), Direction::Desc) => inner.prev_slot(slot),
            (Cursor::Static(inner), Direction::Asc) => inner.next_slot(slot),
            (Cursor::Static(inner), Direction::Desc) => inner.prev_slot(slot),
        }
    }

    fn id_at(&self, slot: usize) -> DocId {
        match self {
            Cursor::Dynamic(inner) => inner.id_at(slot),
            Cursor::Static(inner) => inner.id_at(slot),
        }
    }
}

#[derive(Clone, Copy)]
enum State {
    Pending,
    Active { slot: usize, remaining: usize },
    Done,
}

/// Ordered cursor over a ranked index.
///
/// Holds the index's shared lock until it is closed or dropped. `range`
/// restricts iteration to positions `from..=to` (always counted in
/// ascending order); `offset` skips that many entries in the iteration
/// direction with a single O(log n) seek.
pub struct SortIter<'a> {
    cursor: Cursor<'a>,
    direction: Direction,
    start: usize,
    end: usize,
    offset: usize,
    state: State,
}

impl<'a> SortIter<'a> {
    pub fn range(self, from: usize, to: usize) -> Self {
        self.bounds(from, to.saturating_add(1))
    }

    /// Half-open position window `start..end`.
    pub(crate) fn bounds(mut self, start: usize, end: usize) -> Self {
        self.start = start;
        self.end = end.min(self.cursor.len());
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Releases the shared lock.
    pub fn close(self) {}

    fn first(&self) -> State {
        if self.start >= self.end || self.offset >= self.end - self.start {
            return State::Done;
        }
        let (position, remaining) = match self.direction {
            Direction::Asc => {
                let position = self.start + self.offset;
                (position, self.end - position)
            }
            Direction::Desc => {
                let position = self.end - 1 - self.offset;
                (position, position - self.start + 1)
            }
        };
        match self.cursor.seek(position) {
            Some(slot) => State::Active { slot, remaining },
            None => State::Done,
        }
    }
}

impl<'a> Iterator for SortIter<'a> {
    type Item = DocId;

    fn next(&mut self) -> Option<DocId> {
        if let State::Pending = self.state {
            self.state = self.first();
        }
        match self.state {
            State::Active { slot, remaining } => {
                let id = self.cursor.id_at(slot);
                self.state = match self.cursor.step(slot, self.direction) {
                    Some(next) if remaining > 1 => State::Active { slot: next, remaining: remaining - 1 },
                    _ => State::Done,
                };
                Some(id)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(scores: &[Score]) -> SortedIndex {
        let list = SkipList::with_seed("scores", 8, 0.5, 3);
        for (i, score) in scores.iter().enumerate() {
            list.set(DocId(i as u32 + 1), *score);
        }
        SortedIndex::Dynamic(list)
    }

    fn scores_of(index: &SortedIndex, ids: Vec<DocId>) -> Vec<Score> {
        ids.into_iter().filter_map(|id| index.score(id)).collect()
    }

    #[test]
    fn range_then_offset() {
        let index = loaded(&[1, 2, 3, 4, 5, 6]);
        let ids: Vec<DocId> = index.forwards().range(1, 3).offset(0).collect();
        assert_eq!(scores_of(&index, ids), vec![2, 3, 4]);
        let ids: Vec<DocId> = index.forwards().range(1, 3).offset(1).collect();
        assert_eq!(scores_of(&index, ids), vec![3, 4]);
    }

    #[test]
    fn backwards_range_walks_down() {
        let index = loaded(&[1, 2, 3, 4, 5, 6]);
        let ids: Vec<DocId> = index.backwards().range(1, 3).collect();
        assert_eq!(scores_of(&index, ids), vec![4, 3, 2]);
        let ids: Vec<DocId> = index.backwards().offset(4).collect();
        assert_eq!(scores_of(&index, ids), vec![2, 1]);
    }

    #[test]
    fn offset_matches_repeated_next() {
        let index = loaded(&[9, 3, 3, 7, 1, 12, 5]);
        let len = index.len();
        for direction in [Direction::Asc, Direction::Desc] {
            for n in 0..=len + 2 {
                let mut stepped = index.iter(direction);
                for _ in 0..n {
                    stepped.next();
                }
                let rest: Vec<DocId> = stepped.collect();
                let offset: Vec<DocId> = index.iter(direction).offset(n).collect();
                assert_eq!(offset, rest, "direction {:?} offset {}", direction, n);
            }
        }
    }

    #[test]
    fn exhausted_iterator_keeps_returning_none() {
        let index = loaded(&[1]);
        let mut iter = index.forwards();
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
        iter.close();
    }

    #[test]
    fn get_rank_counts_exact_scores() {
        let index = loaded(&[1, 3, 3, 3, 8, 8]);
        let count = |s| index.get_rank(s, false) - index.get_rank(s, true) + 1;
        assert_eq!(count(3), 3);
        assert_eq!(count(8), 2);
        assert_eq!(count(1), 1);
        assert_eq!(count(5), 0);
        assert_eq!(count(0), 0);
        assert_eq!(count(100), 0);
    }

    #[test]
    fn static_variant_iterates_and_rejects_set() {
        let index = SortedIndex::Static(StaticSort::load("recent", (10..17).map(DocId)));
        let back: Vec<DocId> = index.backwards().collect();
        assert_eq!(back, (10..17).rev().map(DocId).collect::<Vec<_>>());
        assert_eq!(index.set(DocId(10), 4).unwrap_err().kind(), ErrorKind::Unsupported);
        assert!(index.remove(DocId(10)).is_err());
    }
}
