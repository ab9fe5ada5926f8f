use crate::{connectors::source::ItemSource, error::SourceError};
use async_trait::async_trait;
use connectors::sql::{
    base::{query::paging::PagingQuery, row::FromPgRow},
    postgres::{client::PgConnection, cursor::PgServerCursor, params::PgParams},
};
use model::pagination::{cursor::Cursor, page::Positioned};
use std::collections::VecDeque;
use tracing::info;

/// Streams a query through a server-side cursor on a dedicated session.
///
/// Positions are sort-key values. Resuming re-declares the cursor with a key
/// predicate, so rows whose state changed since the failed run neither
/// shift nor hide the rows still to be processed.
pub struct PgCursorSource<T> {
    name: String,
    conn: PgConnection,
    query: PagingQuery,
    params: PgParams,
    fetch_size: usize,
    cursor: Option<PgServerCursor>,
    buffer: VecDeque<Positioned<T>>,
    position: Cursor,
}

impl<T> PgCursorSource<T> {
    pub fn new(
        name: impl Into<String>,
        conn: PgConnection,
        query: PagingQuery,
        params: PgParams,
        fetch_size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            conn,
            query,
            params,
            fetch_size: fetch_size.max(1),
            cursor: None,
            buffer: VecDeque::new(),
            position: Cursor::None,
        }
    }
}

#[async_trait]
impl<T> ItemSource<T> for PgCursorSource<T>
where
    T: FromPgRow + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&mut self, position: &Cursor) -> Result<(), SourceError> {
        // A handle from a previous session is never reused.
        self.close().await?;

        let cursor = PgServerCursor::declare(&self.conn, &self.query, &self.params, position)
            .await
            .map_err(|e| SourceError::from_db(&self.name, e))?;
        info!(source = %self.name, cursor = %cursor.name(), from = %position, "Opened cursor source");

        self.cursor = Some(cursor);
        self.position = position.clone();
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<T>, SourceError> {
        if self.buffer.is_empty() {
            let cursor = self
                .cursor
                .as_mut()
                .ok_or_else(|| SourceError::NotOpen(self.name.clone()))?;
            if cursor.is_exhausted() {
                return Ok(None);
            }
            let rows = cursor
                .fetch::<T>(self.fetch_size)
                .await
                .map_err(|e| SourceError::from_db(&self.name, e))?;
            self.buffer.extend(rows);
        }

        Ok(self.buffer.pop_front().map(|row| {
            self.position = row.position;
            row.item
        }))
    }

    fn position(&self) -> Cursor {
        self.position.clone()
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.buffer.clear();
        if let Some(mut cursor) = self.cursor.take() {
            cursor
                .close()
                .await
                .map_err(|e| SourceError::from_db(&self.name, e))?;
        }
        Ok(())
    }
}
