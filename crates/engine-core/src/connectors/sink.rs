use crate::error::SinkError;
use async_trait::async_trait;

/// Acknowledgement of a persisted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteAck {
    pub written: u64,
}

/// Persists bounded batches, one transaction per batch.
#[async_trait]
pub trait ItemSink<O>: Send + Sync
where
    O: Send + Sync + 'static,
{
    fn name(&self) -> &str;

    async fn begin(&self) -> Result<Box<dyn SinkTransaction<O>>, SinkError>;
}

/// A single all-or-nothing write. Nothing written through it is visible
/// until `commit` returns.
#[async_trait]
pub trait SinkTransaction<O>: Send
where
    O: Send + Sync + 'static,
{
    async fn write(&mut self, items: &[O]) -> Result<WriteAck, SinkError>;

    async fn commit(self: Box<Self>) -> Result<(), SinkError>;

    async fn rollback(self: Box<Self>) -> Result<(), SinkError>;
}
