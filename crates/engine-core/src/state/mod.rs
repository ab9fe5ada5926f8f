use crate::error::StateStoreError;
use async_trait::async_trait;
use model::{
    core::identifiers::{InstanceId, StepKey},
    execution::step::StepExecution,
};

pub mod memory_store;
pub mod models;
pub mod sled_store;

pub use models::WalEntry;

/// Durable home of step executions and the write-ahead log.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Persists `exec` unless the stored copy is newer. See [`is_stale`].
    async fn save_execution(&self, exec: &StepExecution) -> Result<(), StateStoreError>;

    async fn load_execution(&self, key: &StepKey)
    -> Result<Option<StepExecution>, StateStoreError>;

    /// All step executions of one job instance.
    async fn list_executions(
        &self,
        instance: &InstanceId,
    ) -> Result<Vec<StepExecution>, StateStoreError>;

    async fn append_wal(&self, entry: &WalEntry) -> Result<(), StateStoreError>;

    async fn iter_wal(&self, instance: &InstanceId) -> Result<Vec<WalEntry>, StateStoreError>;

    /// Drops the chunk entries (commits and rollbacks) of one step and
    /// returns how many were removed. Lifecycle markers stay.
    async fn prune_wal(&self, instance: &InstanceId, step_name: &str)
    -> Result<usize, StateStoreError>;
}

/// An update is stale when it belongs to an older attempt, or to the same
/// attempt but an earlier chunk. Stale updates are dropped so the committed
/// position never moves backwards.
pub fn is_stale(existing: &StepExecution, update: &StepExecution) -> bool {
    if update.attempt != existing.attempt {
        return update.attempt < existing.attempt;
    }
    update.chunk_index < existing.chunk_index
}
