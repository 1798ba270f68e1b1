use std::collections::HashMap;
use parking_lot::{RwLock, RwLockReadGuard};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Score};

const PADDING: usize = 16;

/// Bulk-loaded ranked index. The position of an id is its score.
///
/// Ids live in a padded array bracketed by `None` sentinels so prepends
/// and appends are amortized O(1) and positional access is O(1).
pub struct StaticSort {
    pub name: String,
    inner: RwLock<StaticInner>,
}

pub(crate) struct StaticInner {
    slots: Vec<Option<DocId>>,
    start: usize,                     // first occupied slot; slots[start - 1] is the head sentinel
    end: usize,                       // one past the last occupied slot; slots[end] is the tail sentinel
    slot_of: HashMap<DocId, usize>,
}

impl StaticSort {
    /// Builds the sort from ids already in rank order. Duplicate ids keep
    /// their first position.
    pub fn load<I>(name: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = DocId>,
    {
        let mut slots = vec![None; PADDING];
        let mut slot_of = HashMap::new();
        for id in ids {
            if slot_of.contains_key(&id) {
                continue;
            }
            slot_of.insert(id, slots.len());
            slots.push(Some(id));
        }
        let end = slots.len();
        slots.resize(end + PADDING, None);

        StaticSort {
            name: name.to_string(),
            inner: RwLock::new(StaticInner { slots, start: PADDING, end, slot_of }),
        }
    }

    pub fn append(&self, id: DocId) -> Result<()> {
        let mut inner = self.inner.write();
        inner.ensure_absent(&self.name, id)?;
        if inner.end + 1 >= inner.slots.len() {
            let grow = (inner.end - inner.start).max(PADDING);
            let size = inner.slots.len() + grow;
            inner.slots.resize(size, None);
        }
        let slot = inner.end;
        inner.slots[slot] = Some(id);
        inner.slot_of.insert(id, slot);
        inner.end += 1;
        Ok(())
    }

    pub fn prepend(&self, id: DocId) -> Result<()> {
        let mut inner = self.inner.write();
        inner.ensure_absent(&self.name, id)?;
        if inner.start <= 1 {
            inner.grow_front();
        }
        inner.start -= 1;
        let slot = inner.start;
        inner.slots[slot] = Some(id);
        inner.slot_of.insert(id, slot);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read_recursive().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: DocId) -> bool {
        self.inner.read_recursive().slot_of.contains_key(&id)
    }

    pub fn rank(&self, id: DocId) -> Option<usize> {
        let inner = self.inner.read_recursive();
        inner.slot_of.get(&id).map(|slot| slot - inner.start)
    }

    pub fn score(&self, id: DocId) -> Option<Score> {
        self.rank(id).map(|rank| rank as Score)
    }

    pub fn lower_bound(&self, score: Score) -> usize {
        let len = self.len();
        score.clamp(0, len as Score) as usize
    }

    pub fn upper_bound(&self, score: Score) -> usize {
        let len = self.len();
        score.saturating_add(1).clamp(0, len as Score) as usize
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, StaticInner> {
        self.inner.read_recursive()
    }
}

impl StaticInner {
    pub(crate) fn len(&self) -> usize {
        self.end - self.start
    }

    fn ensure_absent(&self, name: &str, id: DocId) -> Result<()> {
        if self.slot_of.contains_key(&id) {
            return Err(Error::new(
                ErrorKind::Unsupported,
                format!("static sort {} cannot move existing id {}", name, id.0),
            ));
        }
        Ok(())
    }

    fn grow_front(&mut self) {
        let grow = self.len().max(PADDING);
        let mut slots = vec![None; grow];
        slots.extend(self.slots.drain(..));
        self.slots = slots;
        self.start += grow;
        self.end += grow;
        for slot in self.slot_of.values_mut() {
            *slot += grow;
        }
    }

    /// Slot of the entry at 0-based `position`.
    pub(crate) fn seek(&self, position: usize) -> Option<usize> {
        if position >= self.len() {
            return None;
        }
        Some(self.start + position)
    }

    pub(crate) fn next_slot(&self, slot: usize) -> Option<usize> {
        self.slots[slot + 1].map(|_| slot + 1)
    }

    pub(crate) fn prev_slot(&self, slot: usize) -> Option<usize> {
        self.slots[slot - 1].map(|_| slot - 1)
    }

    pub(crate) fn id_at(&self, slot: usize) -> DocId {
        // slots between start and end are always occupied
        self.slots[slot].unwrap_or(DocId(0))
    }
}
