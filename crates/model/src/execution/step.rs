use crate::{
    core::identifiers::{InstanceId, StepKey},
    execution::status::{BatchStatus, ErrorKind},
    pagination::cursor::Cursor,
    records::chunk::ChunkTally,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a step stopped making progress.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// Index of the chunk that failed.
    pub chunk_index: u64,
    /// Position after the last successfully committed chunk.
    pub last_committed: Cursor,
    pub kind: ErrorKind,
    /// Offending record, when the failure can be pinned to one.
    pub record_id: Option<String>,
    pub message: String,
}

/// Persisted progress of one step of one job instance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StepExecution {
    pub job_name: String,
    pub instance_id: InstanceId,
    pub step_name: String,
    pub status: BatchStatus,

    pub read_count: u64,
    pub write_count: u64,
    pub filter_count: u64,
    pub skip_count: u64,
    pub commit_count: u64,
    pub rollback_count: u64,

    /// Index of the next chunk to run.
    pub chunk_index: u64,
    pub last_committed: Cursor,
    /// Incremented every time the step is (re)started.
    pub attempt: u32,

    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub failure: Option<FailureRecord>,
}

impl StepExecution {
    pub fn new(key: &StepKey) -> Self {
        let now = Utc::now();
        Self {
            job_name: key.job_name.clone(),
            instance_id: key.instance_id.clone(),
            step_name: key.step_name.clone(),
            status: BatchStatus::Starting,
            read_count: 0,
            write_count: 0,
            filter_count: 0,
            skip_count: 0,
            commit_count: 0,
            rollback_count: 0,
            chunk_index: 0,
            last_committed: Cursor::None,
            attempt: 0,
            started_at: now,
            updated_at: now,
            ended_at: None,
            failure: None,
        }
    }

    pub fn key(&self) -> StepKey {
        StepKey::new(
            self.job_name.clone(),
            self.instance_id.clone(),
            self.step_name.clone(),
        )
    }

    pub fn mark_started(&mut self) {
        self.status = BatchStatus::Started;
        self.attempt += 1;
        self.touch();
    }

    /// Folds a committed chunk into the counters and advances the resume point.
    pub fn record_commit(&mut self, tally: ChunkTally, end: Cursor) {
        self.read_count += tally.read;
        self.write_count += tally.written;
        self.filter_count += tally.filtered;
        self.skip_count += tally.skipped;
        self.commit_count += 1;
        self.chunk_index += 1;
        self.last_committed = end;
        self.touch();
    }

    pub fn record_rollback(&mut self) {
        self.rollback_count += 1;
        self.touch();
    }

    pub fn mark_failed(&mut self, kind: ErrorKind, record_id: Option<String>, message: String) {
        self.status = BatchStatus::Failed;
        self.failure = Some(FailureRecord {
            chunk_index: self.chunk_index,
            last_committed: self.last_committed.clone(),
            kind,
            record_id,
            message,
        });
        self.finish();
    }

    pub fn mark_completed(&mut self) {
        self.status = BatchStatus::Completed;
        self.failure = None;
        self.finish();
    }

    pub fn mark_stopped(&mut self) {
        self.status = BatchStatus::Stopped;
        self.finish();
    }

    /// Prepares a persisted execution for another attempt. Counters and the
    /// committed position carry over; the previous failure is cleared.
    pub fn restart(&mut self) {
        self.status = BatchStatus::Starting;
        self.failure = None;
        self.ended_at = None;
        self.touch();
    }

    pub fn is_completed(&self) -> bool {
        self.status == BatchStatus::Completed
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn finish(&mut self) {
        let now = Utc::now();
        self.updated_at = now;
        self.ended_at = Some(now);
    }
}
