use crate::error::StateError;
use chrono::Utc;
use engine_core::state::{StateStore, WalEntry};
use model::{
    core::identifiers::StepKey,
    execution::{status::ErrorKind, step::StepExecution},
    pagination::cursor::Cursor,
    records::chunk::ChunkTally,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Persists step executions and their WAL entries for one step key.
pub struct StateManager {
    key: StepKey,
    store: Arc<dyn StateStore>,
}

impl StateManager {
    pub fn new(key: StepKey, store: Arc<dyn StateStore>) -> Self {
        Self { key, store }
    }

    pub fn key(&self) -> &StepKey {
        &self.key
    }

    /// Loads the stored execution, folding in chunk commits that reached the
    /// WAL but not the execution record.
    pub async fn load(&self) -> Result<Option<StepExecution>, StateError> {
        let Some(mut exec) = self
            .store
            .load_execution(&self.key)
            .await
            .map_err(|e| StateError::Load(e.to_string()))?
        else {
            return Ok(None);
        };

        let entries = match self.store.iter_wal(&self.key.instance_id).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, step = %self.key, "Failed to read WAL, using stored execution");
                return Ok(Some(exec));
            }
        };

        for entry in entries {
            if let WalEntry::ChunkCommit {
                step_name,
                chunk_index,
                end,
                tally,
                ..
            } = entry
                && step_name == self.key.step_name
                && chunk_index == exec.chunk_index
            {
                warn!(
                    step = %self.key,
                    chunk = chunk_index,
                    cursor = %end,
                    "Recovering chunk commit missing from execution state"
                );
                exec.record_commit(tally, end);
            }
        }

        Ok(Some(exec))
    }

    /// Marks the execution started and persists it.
    pub async fn begin_step(&self, exec: &mut StepExecution) -> Result<(), StateError> {
        exec.mark_started();
        self.append(WalEntry::StepStart {
            instance_id: self.key.instance_id.clone(),
            step_name: self.key.step_name.clone(),
            attempt: exec.attempt,
            from: exec.last_committed.clone(),
            at: Utc::now(),
        })
        .await?;
        self.save(exec).await?;

        info!(
            step = %self.key,
            attempt = exec.attempt,
            cursor = %exec.last_committed,
            "Step started"
        );
        Ok(())
    }

    /// Records a committed chunk. The WAL entry is written before the
    /// execution so that a crash in between is recovered by [`Self::load`].
    pub async fn commit_chunk(
        &self,
        exec: &mut StepExecution,
        tally: ChunkTally,
        end: Cursor,
    ) -> Result<(), StateError> {
        self.append(WalEntry::ChunkCommit {
            instance_id: self.key.instance_id.clone(),
            step_name: self.key.step_name.clone(),
            chunk_index: exec.chunk_index,
            end: end.clone(),
            tally,
            at: Utc::now(),
        })
        .await?;
        exec.record_commit(tally, end);
        self.save(exec).await
    }

    pub async fn rollback_chunk(&self, exec: &mut StepExecution, reason: &str) {
        exec.record_rollback();
        let entry = WalEntry::ChunkRollback {
            instance_id: self.key.instance_id.clone(),
            step_name: self.key.step_name.clone(),
            chunk_index: exec.chunk_index,
            reason: reason.to_string(),
            at: Utc::now(),
        };
        if let Err(err) = self.append(entry).await {
            warn!(error = %err, step = %self.key, "Failed to log chunk rollback");
        }
    }

    pub async fn fail(
        &self,
        exec: &mut StepExecution,
        kind: ErrorKind,
        record_id: Option<String>,
        message: String,
    ) -> Result<(), StateError> {
        exec.mark_failed(kind, record_id, message);
        self.append(WalEntry::StepFailed {
            instance_id: self.key.instance_id.clone(),
            step_name: self.key.step_name.clone(),
            kind,
            at: Utc::now(),
        })
        .await?;
        self.save(exec).await
    }

    /// Marks the execution completed. Once that is saved the step's chunk
    /// entries can no longer be needed for recovery, so they are pruned.
    pub async fn complete(&self, exec: &mut StepExecution) -> Result<(), StateError> {
        exec.mark_completed();
        self.append(WalEntry::StepDone {
            instance_id: self.key.instance_id.clone(),
            step_name: self.key.step_name.clone(),
            at: Utc::now(),
        })
        .await?;
        self.save(exec).await?;

        match self
            .store
            .prune_wal(&self.key.instance_id, &self.key.step_name)
            .await
        {
            Ok(removed) => debug!(step = %self.key, removed, "WAL pruned"),
            Err(err) => warn!(error = %err, step = %self.key, "Failed to prune WAL"),
        }
        Ok(())
    }

    pub async fn stop(&self, exec: &mut StepExecution) -> Result<(), StateError> {
        exec.mark_stopped();
        self.append(WalEntry::StepStopped {
            instance_id: self.key.instance_id.clone(),
            step_name: self.key.step_name.clone(),
            at: Utc::now(),
        })
        .await?;
        self.save(exec).await
    }

    async fn save(&self, exec: &StepExecution) -> Result<(), StateError> {
        self.store
            .save_execution(exec)
            .await
            .map_err(|e| StateError::Save(e.to_string()))
    }

    async fn append(&self, entry: WalEntry) -> Result<(), StateError> {
        self.store
            .append_wal(&entry)
            .await
            .map_err(|e| StateError::WalOperation(e.to_string()))
    }
}
