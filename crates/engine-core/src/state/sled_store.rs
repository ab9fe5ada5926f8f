use crate::{
    error::StateStoreError,
    state::{StateStore, is_stale, models::WalEntry},
};
use async_trait::async_trait;
use model::{
    core::identifiers::{InstanceId, StepKey},
    execution::step::StepExecution,
};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;
use tracing::debug;

pub struct SledStateStore {
    db: sled::Db,
}

impl SledStateStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateStoreError> {
        let db = sled::open(path).map_err(|e| StateStoreError::Open(e.to_string()))?;
        Ok(Self { db })
    }

    #[inline]
    fn exec_key(instance: &InstanceId, step: &str) -> String {
        format!("exec:{instance}:{step}")
    }

    #[inline]
    fn wal_prefix(instance: &InstanceId) -> String {
        format!("wal:{instance}:")
    }
}

#[async_trait]
impl StateStore for SledStateStore {
    async fn save_execution(&self, exec: &StepExecution) -> Result<(), StateStoreError> {
        let key = Self::exec_key(&exec.instance_id, &exec.step_name);
        let bytes =
            bincode::serialize(exec).map_err(|e| StateStoreError::SaveExecution(e.to_string()))?;

        // Check-then-set must be atomic: two writers for the same step would
        // otherwise be able to move the committed position backwards.
        let result = self.db.transaction::<_, (), String>(|tx_db| {
            if let Some(existing_bytes) = tx_db.get(&key)? {
                let existing: StepExecution = bincode::deserialize(&existing_bytes)
                    .map_err(|e| ConflictableTransactionError::Abort(e.to_string()))?;
                if is_stale(&existing, exec) {
                    debug!(
                        step = %exec.step_name,
                        chunk = exec.chunk_index,
                        stored_chunk = existing.chunk_index,
                        "Skipping stale execution update"
                    );
                    return Ok(());
                }
            }
            tx_db.insert(key.as_bytes(), bytes.as_slice())?;
            Ok(())
        });

        match result {
            Ok(()) => {}
            Err(TransactionError::Abort(e)) => return Err(StateStoreError::SaveExecution(e)),
            Err(TransactionError::Storage(e)) => {
                return Err(StateStoreError::SaveExecution(e.to_string()));
            }
        }

        self.db
            .flush_async()
            .await
            .map_err(|e| StateStoreError::SaveExecution(e.to_string()))?;
        Ok(())
    }

    async fn load_execution(
        &self,
        key: &StepKey,
    ) -> Result<Option<StepExecution>, StateStoreError> {
        let key = Self::exec_key(&key.instance_id, &key.step_name);
        match self
            .db
            .get(key)
            .map_err(|e| StateStoreError::LoadExecution(e.to_string()))?
        {
            Some(bytes) => bincode::deserialize(&bytes)
                .map(Some)
                .map_err(|e| StateStoreError::LoadExecution(e.to_string())),
            None => Ok(None),
        }
    }

    async fn list_executions(
        &self,
        instance: &InstanceId,
    ) -> Result<Vec<StepExecution>, StateStoreError> {
        let prefix = format!("exec:{instance}:");
        let mut executions = Vec::new();
        for item in self.db.scan_prefix(prefix) {
            let (_key, value) = item.map_err(|e| StateStoreError::LoadExecution(e.to_string()))?;
            let exec: StepExecution = bincode::deserialize(&value)
                .map_err(|e| StateStoreError::LoadExecution(e.to_string()))?;
            executions.push(exec);
        }
        executions.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(executions)
    }

    async fn append_wal(&self, entry: &WalEntry) -> Result<(), StateStoreError> {
        // Monotonic ids keep the log in append order under prefix scans.
        let seq = self
            .db
            .generate_id()
            .map_err(|e| StateStoreError::AppendWal(e.to_string()))?;
        let key = format!("{}{seq:020}", Self::wal_prefix(entry.instance_id()));
        let value =
            bincode::serialize(entry).map_err(|e| StateStoreError::AppendWal(e.to_string()))?;

        self.db
            .insert(key, value)
            .map_err(|e| StateStoreError::AppendWal(e.to_string()))?;
        Ok(())
    }

    async fn iter_wal(&self, instance: &InstanceId) -> Result<Vec<WalEntry>, StateStoreError> {
        let mut entries = Vec::new();
        for item in self.db.scan_prefix(Self::wal_prefix(instance)) {
            let (_key, value) = item.map_err(|e| StateStoreError::IterateWal(e.to_string()))?;
            let entry: WalEntry = bincode::deserialize(&value)
                .map_err(|e| StateStoreError::IterateWal(e.to_string()))?;
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn prune_wal(
        &self,
        instance: &InstanceId,
        step_name: &str,
    ) -> Result<usize, StateStoreError> {
        let mut batch = sled::Batch::default();
        let mut removed = 0;
        for item in self.db.scan_prefix(Self::wal_prefix(instance)) {
            let (key, value) = item.map_err(|e| StateStoreError::PruneWal(e.to_string()))?;
            let entry: WalEntry = bincode::deserialize(&value)
                .map_err(|e| StateStoreError::PruneWal(e.to_string()))?;
            if entry.is_chunk_entry() && entry.step_name() == step_name {
                batch.remove(key);
                removed += 1;
            }
        }

        self.db
            .apply_batch(batch)
            .map_err(|e| StateStoreError::PruneWal(e.to_string()))?;
        self.db
            .flush_async()
            .await
            .map_err(|e| StateStoreError::PruneWal(e.to_string()))?;
        debug!(instance = %instance, step = step_name, removed, "Pruned WAL");
        Ok(removed)
    }
}
