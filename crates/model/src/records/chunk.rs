use crate::pagination::cursor::Cursor;
use serde::{Deserialize, Serialize};

/// Ordered, bounded group of records forming one transactional unit.
#[derive(Debug, Clone)]
pub struct Chunk<T> {
    pub index: u64,
    pub items: Vec<T>,
    /// Source position before the first item of this chunk.
    pub start: Cursor,
    /// Source position after the last item of this chunk.
    pub end: Cursor,
    /// The source reported end of stream while filling this chunk.
    pub last: bool,
}

impl<T> Chunk<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Per-chunk counters folded into the execution state on commit.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkTally {
    pub read: u64,
    pub written: u64,
    pub filtered: u64,
    pub skipped: u64,
}
