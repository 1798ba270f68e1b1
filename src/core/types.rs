use serde::{Serialize, Deserialize};

/// Opaque document identifier. Mapping external string ids to these
/// values is the embedder's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u32);

impl DocId {
    pub fn new(id: u32) -> Self {
        DocId(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for DocId {
    fn from(id: u32) -> Self {
        DocId(id)
    }
}

/// Integer ordering key of an id inside a ranked index.
pub type Score = i64;

/// Iteration direction over a ranked index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Asc,   // lowest (score, id) first
    Desc,  // highest (score, id) first
}

impl Direction {
    pub fn is_desc(&self) -> bool {
        matches!(self, Direction::Desc)
    }
}
