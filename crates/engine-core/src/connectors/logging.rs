use crate::{
    connectors::sink::{ItemSink, SinkTransaction, WriteAck},
    error::SinkError,
};
use async_trait::async_trait;
use model::records::record::DataRecord;
use std::marker::PhantomData;
use tracing::info;

/// Sink that reports records through `tracing` instead of persisting them.
/// Records of a rolled back chunk are never logged.
pub struct LoggingSink<O> {
    name: String,
    _marker: PhantomData<fn(O)>,
}

impl<O> LoggingSink<O> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<O: DataRecord> ItemSink<O> for LoggingSink<O> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn begin(&self) -> Result<Box<dyn SinkTransaction<O>>, SinkError> {
        Ok(Box::new(LoggingTransaction {
            sink: self.name.clone(),
            pending: Vec::new(),
        }))
    }
}

struct LoggingTransaction {
    sink: String,
    pending: Vec<String>,
}

#[async_trait]
impl<O: DataRecord> SinkTransaction<O> for LoggingTransaction {
    async fn write(&mut self, items: &[O]) -> Result<WriteAck, SinkError> {
        self.pending.extend(items.iter().map(|item| format!("{item:?}")));
        Ok(WriteAck {
            written: items.len() as u64,
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), SinkError> {
        for record in &self.pending {
            info!(sink = %self.sink, %record, "Record written");
        }
        info!(sink = %self.sink, rows = self.pending.len(), "Chunk logged");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), SinkError> {
        Ok(())
    }
}
