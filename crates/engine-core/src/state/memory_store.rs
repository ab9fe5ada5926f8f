use crate::{
    error::StateStoreError,
    state::{StateStore, is_stale, models::WalEntry},
};
use async_trait::async_trait;
use model::{
    core::identifiers::{InstanceId, StepKey},
    execution::step::StepExecution,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Volatile store with the same update rules as the sled store.
#[derive(Default)]
pub struct MemoryStateStore {
    executions: RwLock<HashMap<(InstanceId, String), StepExecution>>,
    wal: RwLock<Vec<WalEntry>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn save_execution(&self, exec: &StepExecution) -> Result<(), StateStoreError> {
        let mut executions = self.executions.write().await;
        let key = (exec.instance_id.clone(), exec.step_name.clone());
        match executions.get(&key) {
            Some(existing) if is_stale(existing, exec) => {}
            _ => {
                executions.insert(key, exec.clone());
            }
        }
        Ok(())
    }

    async fn load_execution(
        &self,
        key: &StepKey,
    ) -> Result<Option<StepExecution>, StateStoreError> {
        let executions = self.executions.read().await;
        Ok(executions
            .get(&(key.instance_id.clone(), key.step_name.clone()))
            .cloned())
    }

    async fn list_executions(
        &self,
        instance: &InstanceId,
    ) -> Result<Vec<StepExecution>, StateStoreError> {
        let executions = self.executions.read().await;
        let mut listed: Vec<_> = executions
            .iter()
            .filter(|((id, _), _)| id == instance)
            .map(|(_, exec)| exec.clone())
            .collect();
        listed.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(listed)
    }

    async fn append_wal(&self, entry: &WalEntry) -> Result<(), StateStoreError> {
        self.wal.write().await.push(entry.clone());
        Ok(())
    }

    async fn iter_wal(&self, instance: &InstanceId) -> Result<Vec<WalEntry>, StateStoreError> {
        Ok(self
            .wal
            .read()
            .await
            .iter()
            .filter(|e| e.instance_id() == instance)
            .cloned()
            .collect())
    }

    async fn prune_wal(
        &self,
        instance: &InstanceId,
        step_name: &str,
    ) -> Result<usize, StateStoreError> {
        let mut wal = self.wal.write().await;
        let before = wal.len();
        wal.retain(|e| {
            !(e.is_chunk_entry() && e.instance_id() == instance && e.step_name() == step_name)
        });
        Ok(before - wal.len())
    }
}
