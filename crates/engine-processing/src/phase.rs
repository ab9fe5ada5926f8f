use std::fmt;

/// Where a chunk currently is in its lifecycle.
///
/// `Idle → Reading → Transforming → Writing → Committed`, then back to
/// `Reading`, or on to `Done` once the source is exhausted. Any phase can move
/// to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkPhase {
    #[default]
    Idle,
    Reading,
    Transforming,
    Writing,
    Committed,
    Done,
    Failed,
}

impl ChunkPhase {
    pub fn is_final(&self) -> bool {
        matches!(self, ChunkPhase::Done | ChunkPhase::Failed)
    }
}

impl fmt::Display for ChunkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChunkPhase::Idle => "idle",
            ChunkPhase::Reading => "reading",
            ChunkPhase::Transforming => "transforming",
            ChunkPhase::Writing => "writing",
            ChunkPhase::Committed => "committed",
            ChunkPhase::Done => "done",
            ChunkPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}
