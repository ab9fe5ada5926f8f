use chrono::{DateTime, Utc};
use model::{
    core::identifiers::InstanceId, execution::status::ErrorKind, pagination::cursor::Cursor,
    records::chunk::ChunkTally,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum WalEntry {
    StepStart {
        instance_id: InstanceId,
        step_name: String,
        attempt: u32,
        from: Cursor,
        at: DateTime<Utc>,
    },
    ChunkCommit {
        instance_id: InstanceId,
        step_name: String,
        chunk_index: u64,
        end: Cursor,
        tally: ChunkTally,
        at: DateTime<Utc>,
    },
    ChunkRollback {
        instance_id: InstanceId,
        step_name: String,
        chunk_index: u64,
        reason: String,
        at: DateTime<Utc>,
    },
    StepDone {
        instance_id: InstanceId,
        step_name: String,
        at: DateTime<Utc>,
    },
    StepFailed {
        instance_id: InstanceId,
        step_name: String,
        kind: ErrorKind,
        at: DateTime<Utc>,
    },
    StepStopped {
        instance_id: InstanceId,
        step_name: String,
        at: DateTime<Utc>,
    },
}

impl WalEntry {
    pub fn instance_id(&self) -> &InstanceId {
        match self {
            WalEntry::StepStart { instance_id, .. }
            | WalEntry::ChunkCommit { instance_id, .. }
            | WalEntry::ChunkRollback { instance_id, .. }
            | WalEntry::StepDone { instance_id, .. }
            | WalEntry::StepFailed { instance_id, .. }
            | WalEntry::StepStopped { instance_id, .. } => instance_id,
        }
    }

    pub fn step_name(&self) -> &str {
        match self {
            WalEntry::StepStart { step_name, .. }
            | WalEntry::ChunkCommit { step_name, .. }
            | WalEntry::ChunkRollback { step_name, .. }
            | WalEntry::StepDone { step_name, .. }
            | WalEntry::StepFailed { step_name, .. }
            | WalEntry::StepStopped { step_name, .. } => step_name,
        }
    }

    pub fn is_chunk_entry(&self) -> bool {
        matches!(
            self,
            WalEntry::ChunkCommit { .. } | WalEntry::ChunkRollback { .. }
        )
    }
}
