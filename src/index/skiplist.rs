use std::collections::HashMap;
use parking_lot::{RwLock, RwLockReadGuard};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use crate::core::types::{DocId, Score};

/// Head and tail sentinels occupy the first two arena slots for the
/// lifetime of the list.
pub(crate) const HEAD: usize = 0;
pub(crate) const TAIL: usize = 1;

/// Forward pointer annotated with the number of base-level steps it covers.
#[derive(Debug, Clone, Copy)]
struct Link {
    next: usize,
    width: usize,
}

#[derive(Debug)]
struct Node {
    id: DocId,
    score: Score,
    prev: usize,
    links: Vec<Link>,
}

/// Indexable skip list ordered by (score, id).
///
/// Positions are 1-based inside the structure: the head sits at 0, the
/// n-th entry at n and the tail at len + 1. The width of a link is the
/// difference between the positions of its endpoints, which is what makes
/// rank and offset lookups O(log n).
pub(crate) struct SkipListInner {
    nodes: Vec<Node>,
    free: Vec<usize>,
    lookup: HashMap<DocId, usize>,
    level: usize,
    len: usize,
    max_level: usize,
    probability: f64,
    rng: StdRng,
}

/// Dynamic ranked index guarded by a single reader/writer lock.
pub struct SkipList {
    pub name: String,
    inner: RwLock<SkipListInner>,
}

impl SkipList {
    pub fn new(name: &str, max_level: usize, probability: f64) -> Self {
        Self::with_rng(name, max_level, probability, StdRng::from_entropy())
    }

    /// Deterministic level selection, for tests and benchmarks.
    pub fn with_seed(name: &str, max_level: usize, probability: f64, seed: u64) -> Self {
        Self::with_rng(name, max_level, probability, StdRng::seed_from_u64(seed))
    }

    fn with_rng(name: &str, max_level: usize, probability: f64, rng: StdRng) -> Self {
        SkipList {
            name: name.to_string(),
            inner: RwLock::new(SkipListInner::new(max_level.max(1), probability, rng)),
        }
    }

    /// Sets the score of an id. Returns false when the id already had that
    /// score and nothing changed.
    pub fn set(&self, id: DocId, score: Score) -> bool {
        let mut inner = self.inner.write();
        if let Some(&slot) = inner.lookup.get(&id) {
            if inner.nodes[slot].score == score {
                return false;
            }
            inner.unlink(slot);
        }
        inner.insert(id, score);
        true
    }

    pub fn remove(&self, id: DocId) -> bool {
        let mut inner = self.inner.write();
        match inner.lookup.get(&id) {
            Some(&slot) => {
                inner.unlink(slot);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read_recursive().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: DocId) -> bool {
        self.inner.read_recursive().lookup.contains_key(&id)
    }

    pub fn score(&self, id: DocId) -> Option<Score> {
        let inner = self.inner.read_recursive();
        inner.lookup.get(&id).map(|&slot| inner.nodes[slot].score)
    }

    /// 0-based position of the id in (score, id) order.
    pub fn rank(&self, id: DocId) -> Option<usize> {
        self.inner.read_recursive().rank(id)
    }

    /// Number of entries whose score is strictly below `score`.
    pub fn lower_bound(&self, score: Score) -> usize {
        self.inner.read_recursive().count_below(score, false)
    }

    /// Number of entries whose score is at most `score`.
    pub fn upper_bound(&self, score: Score) -> usize {
        self.inner.read_recursive().count_below(score, true)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, SkipListInner> {
        self.inner.read_recursive()
    }
}

impl SkipListInner {
    fn new(max_level: usize, probability: f64, rng: StdRng) -> Self {
        let head = Node {
            id: DocId(0),
            score: Score::MIN,
            prev: HEAD,
            links: vec![Link { next: TAIL, width: 1 }; max_level],
        };
        let tail = Node {
            id: DocId(0),
            score: Score::MAX,
            prev: HEAD,
            links: Vec::new(),
        };
        SkipListInner {
            nodes: vec![head, tail],
            free: Vec::new(),
            lookup: HashMap::new(),
            level: 1,
            len: 0,
            max_level,
            probability,
            rng,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// True when the node in `slot` sorts strictly before (score, id).
    fn precedes(&self, slot: usize, score: Score, id: DocId) -> bool {
        let node = &self.nodes[slot];
        (node.score, node.id) < (score, id)
    }

    fn random_level(&mut self) -> usize {
        let mut height = 1;
        while height < self.max_level && self.rng.gen_bool(self.probability) {
            height += 1;
        }
        height
    }

    fn alloc(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn insert(&mut self, id: DocId, score: Score) {
        let mut update = vec![HEAD; self.max_level];
        let mut rank = vec![0usize; self.max_level];

        let mut x = HEAD;
        for lvl in (0..self.level).rev() {
            rank[lvl] = if lvl + 1 == self.level { 0 } else { rank[lvl + 1] };
            loop {
                let link = self.nodes[x].links[lvl];
                if link.next != TAIL && self.precedes(link.next, score, id) {
                    rank[lvl] += link.width;
                    x = link.next;
                } else {
                    break;
                }
            }
            update[lvl] = x;
        }

        let height = self.random_level();
        if height > self.level {
            // levels above the current height are stale; rebuild them as
            // a single head -> tail hop
            for lvl in self.level..height {
                rank[lvl] = 0;
                update[lvl] = HEAD;
                self.nodes[HEAD].links[lvl] = Link { next: TAIL, width: self.len + 1 };
            }
            self.level = height;
        }

        let slot = self.alloc(Node {
            id,
            score,
            prev: update[0],
            links: Vec::with_capacity(height),
        });

        for lvl in 0..height {
            let before = self.nodes[update[lvl]].links[lvl];
            let skipped = rank[0] - rank[lvl];
            self.nodes[slot].links.push(Link {
                next: before.next,
                width: before.width - skipped,
            });
            self.nodes[update[lvl]].links[lvl] = Link { next: slot, width: skipped + 1 };
        }
        for lvl in height..self.level {
            self.nodes[update[lvl]].links[lvl].width += 1;
        }

        let next = self.nodes[slot].links[0].next;
        self.nodes[next].prev = slot;
        self.lookup.insert(id, slot);
        self.len += 1;
    }

    fn unlink(&mut self, slot: usize) {
        let (score, id) = (self.nodes[slot].score, self.nodes[slot].id);

        let mut update = vec![HEAD; self.level];
        let mut x = HEAD;
        for lvl in (0..self.level).rev() {
            loop {
                let link = self.nodes[x].links[lvl];
                if link.next != TAIL && self.precedes(link.next, score, id) {
                    x = link.next;
                } else {
                    break;
                }
            }
            update[lvl] = x;
        }

        for lvl in 0..self.level {
            let link = self.nodes[update[lvl]].links[lvl];
            if link.next == slot {
                let removed = self.nodes[slot].links[lvl];
                self.nodes[update[lvl]].links[lvl] = Link {
                    next: removed.next,
                    width: link.width + removed.width - 1,
                };
            } else {
                self.nodes[update[lvl]].links[lvl].width -= 1;
            }
        }

        let next = self.nodes[slot].links[0].next;
        let prev = self.nodes[slot].prev;
        self.nodes[next].prev = prev;

        while self.level > 1 && self.nodes[HEAD].links[self.level - 1].next == TAIL {
            self.level -= 1;
        }

        self.nodes[slot].links.clear();
        self.lookup.remove(&id);
        self.free.push(slot);
        self.len -= 1;
    }

    fn rank(&self, id: DocId) -> Option<usize> {
        let slot = *self.lookup.get(&id)?;
        let score = self.nodes[slot].score;

        let mut x = HEAD;
        let mut position = 0;
        for lvl in (0..self.level).rev() {
            loop {
                let link = self.nodes[x].links[lvl];
                if link.next != TAIL && (link.next == slot || self.precedes(link.next, score, id)) {
                    position += link.width;
                    x = link.next;
                } else {
                    break;
                }
            }
            if x == slot {
                return Some(position - 1);
            }
        }
        None
    }

    /// Counts entries with a score below `score` (or at most `score` when
    /// `inclusive`).
    fn count_below(&self, score: Score, inclusive: bool) -> usize {
        let mut x = HEAD;
        let mut position = 0;
        for lvl in (0..self.level).rev() {
            loop {
                let link = self.nodes[x].links[lvl];
                if link.next == TAIL {
                    break;
                }
                let next_score = self.nodes[link.next].score;
                let before = if inclusive { next_score <= score } else { next_score < score };
                if !before {
                    break;
                }
                position += link.width;
                x = link.next;
            }
        }
        position
    }

    /// Slot of the entry at 0-based `position`, walking widths.
    pub(crate) fn seek(&self, position: usize) -> Option<usize> {
        if position >= self.len {
            return None;
        }
        let target = position + 1;
        let mut x = HEAD;
        let mut traversed = 0;
        for lvl in (0..self.level).rev() {
            loop {
                let link = self.nodes[x].links[lvl];
                if link.next != TAIL && traversed + link.width <= target {
                    traversed += link.width;
                    x = link.next;
                } else {
                    break;
                }
            }
            if traversed == target {
                return Some(x);
            }
        }
        None
    }

    pub(crate) fn next_slot(&self, slot: usize) -> Option<usize> {
        match self.nodes[slot].links[0].next {
            TAIL => None,
            next => Some(next),
        }
    }

    pub(crate) fn prev_slot(&self, slot: usize) -> Option<usize> {
        match self.nodes[slot].prev {
            HEAD => None,
            prev => Some(prev),
        }
    }

    pub(crate) fn id_at(&self, slot: usize) -> DocId {
        self.nodes[slot].id
    }
}
