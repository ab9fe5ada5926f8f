use crate::{
    connectors::{
        sink::{ItemSink, SinkTransaction, WriteAck},
        source::ItemSource,
    },
    error::{SinkError, SourceError},
};
use async_trait::async_trait;
use model::{pagination::cursor::Cursor, records::record::DataRecord};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::Mutex;

/// Source over an in-memory list. Positions are offsets into the list.
pub struct ListSource<T> {
    name: String,
    items: Vec<T>,
    next: usize,
    opened: bool,
    fail_at: Option<usize>,
}

impl<T: Clone> ListSource<T> {
    pub fn new(name: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            name: name.into(),
            items,
            next: 0,
            opened: false,
            fail_at: None,
        }
    }

    /// Makes the read of the item at `index` fail with a query error.
    pub fn with_failure_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> ItemSource<T> for ListSource<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&mut self, position: &Cursor) -> Result<(), SourceError> {
        let consumed = position
            .consumed()
            .ok_or_else(|| SourceError::IncompatiblePosition {
                source_name: self.name.clone(),
                position: position.to_string(),
            })?;
        self.next = (consumed as usize).min(self.items.len());
        self.opened = true;
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<T>, SourceError> {
        if !self.opened {
            return Err(SourceError::NotOpen(self.name.clone()));
        }
        if self.fail_at == Some(self.next) {
            return Err(SourceError::Query {
                source_name: self.name.clone(),
                message: format!("injected failure at index {}", self.next),
            });
        }
        let item = self.items.get(self.next).cloned();
        if item.is_some() {
            self.next += 1;
        }
        Ok(item)
    }

    fn position(&self) -> Cursor {
        Cursor::offset(self.next as u64)
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.opened = false;
        Ok(())
    }
}

/// Sink that keeps committed batches in memory.
///
/// Writes are staged per transaction and only published on commit. Clones
/// share the same storage, so a test can keep a handle while the step owns
/// another.
#[derive(Clone)]
pub struct MemorySink<O> {
    name: String,
    committed: Arc<Mutex<Vec<Vec<O>>>>,
    begins: Arc<AtomicUsize>,
    rollbacks: Arc<AtomicUsize>,
    fail_on: Option<String>,
    write_delay: Option<Duration>,
    commit_delay: Option<Duration>,
}

impl<O> MemorySink<O> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            committed: Arc::new(Mutex::new(Vec::new())),
            begins: Arc::new(AtomicUsize::new(0)),
            rollbacks: Arc::new(AtomicUsize::new(0)),
            fail_on: None,
            write_delay: None,
            commit_delay: None,
        }
    }

    /// Rejects the write of the record with this id.
    pub fn failing_on(mut self, record_id: impl Into<String>) -> Self {
        self.fail_on = Some(record_id.into());
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Delays publishing on commit, as a slow remote commit would.
    pub fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = Some(delay);
        self
    }

    /// Number of transactions opened.
    pub fn begin_count(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn rollback_count(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

impl<O: Clone> MemorySink<O> {
    /// Committed batches in commit order.
    pub async fn batches(&self) -> Vec<Vec<O>> {
        self.committed.lock().await.clone()
    }

    pub async fn items(&self) -> Vec<O> {
        self.committed.lock().await.iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl<O> ItemSink<O> for MemorySink<O>
where
    O: DataRecord + Clone,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn begin(&self) -> Result<Box<dyn SinkTransaction<O>>, SinkError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryTransaction {
            staged: Vec::new(),
            committed: Arc::clone(&self.committed),
            rollbacks: Arc::clone(&self.rollbacks),
            fail_on: self.fail_on.clone(),
            write_delay: self.write_delay,
            commit_delay: self.commit_delay,
        }))
    }
}

struct MemoryTransaction<O> {
    staged: Vec<O>,
    committed: Arc<Mutex<Vec<Vec<O>>>>,
    rollbacks: Arc<AtomicUsize>,
    fail_on: Option<String>,
    write_delay: Option<Duration>,
    commit_delay: Option<Duration>,
}

#[async_trait]
impl<O> SinkTransaction<O> for MemoryTransaction<O>
where
    O: DataRecord + Clone,
{
    async fn write(&mut self, items: &[O]) -> Result<WriteAck, SinkError> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        for item in items {
            let id = item.record_id();
            if self.fail_on.as_deref() == Some(id.as_str()) {
                return Err(SinkError::Rejected {
                    record_id: id,
                    reason: "injected write failure".into(),
                });
            }
            self.staged.push(item.clone());
        }
        Ok(WriteAck {
            written: items.len() as u64,
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), SinkError> {
        let this = *self;
        if let Some(delay) = this.commit_delay {
            tokio::time::sleep(delay).await;
        }
        this.committed.lock().await.push(this.staged);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), SinkError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_source_resumes_from_offset() {
        let mut source = ListSource::new("numbers", vec![1_i64, 2, 3, 4]);
        source.open(&Cursor::offset(2)).await.unwrap();

        assert_eq!(source.read().await.unwrap(), Some(3));
        assert_eq!(source.position(), Cursor::offset(3));
        assert_eq!(source.read().await.unwrap(), Some(4));
        assert_eq!(source.read().await.unwrap(), None);
        assert_eq!(source.position(), Cursor::offset(4));
    }

    #[tokio::test]
    async fn list_source_rejects_sort_key_position() {
        let mut source = ListSource::new("numbers", vec![1_i64]);
        let err = source.open(&Cursor::sort_key("id", 1)).await.unwrap_err();
        assert!(matches!(err, SourceError::IncompatiblePosition { .. }));
    }

    #[tokio::test]
    async fn memory_sink_publishes_only_on_commit() {
        let sink = MemorySink::<i64>::new("mem");

        let mut tx = sink.begin().await.unwrap();
        tx.write(&[1, 2]).await.unwrap();
        assert!(sink.batches().await.is_empty());
        tx.commit().await.unwrap();

        let mut tx = sink.begin().await.unwrap();
        tx.write(&[3]).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(sink.batches().await, vec![vec![1, 2]]);
        assert_eq!(sink.begin_count(), 2);
        assert_eq!(sink.rollback_count(), 1);
    }

    #[tokio::test]
    async fn memory_sink_rejects_configured_record() {
        let sink = MemorySink::<i64>::new("mem").failing_on("2");
        let mut tx = sink.begin().await.unwrap();

        let err = tx.write(&[1, 2, 3]).await.unwrap_err();
        assert_eq!(err.record_id(), Some("2"));
    }
}
