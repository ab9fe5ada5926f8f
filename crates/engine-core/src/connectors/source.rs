use crate::error::SourceError;
use async_trait::async_trait;
use model::pagination::cursor::Cursor;

/// Lazy, restartable sequence of input records in a stable order.
///
/// `open` positions the source just after `position`; `read` yields the next
/// record or `None` at end of stream; `position` reports what has been
/// consumed so far and is what gets persisted on commit.
#[async_trait]
pub trait ItemSource<T: Send>: Send {
    fn name(&self) -> &str;

    async fn open(&mut self, position: &Cursor) -> Result<(), SourceError>;

    async fn read(&mut self) -> Result<Option<T>, SourceError>;

    fn position(&self) -> Cursor;

    async fn close(&mut self) -> Result<(), SourceError>;
}
