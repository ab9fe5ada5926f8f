use crate::{connectors::source::ItemSource, error::SourceError};
use async_trait::async_trait;
use connectors::sql::{base::row::FromPgRow, postgres::pager::PgPager};
use model::pagination::{cursor::Cursor, page::Positioned};
use std::collections::VecDeque;
use tracing::debug;

pub struct PgPagingSource<T> {
    name: String,
    pager: PgPager,
    page_size: usize,
    buffer: VecDeque<Positioned<T>>,
    /// Cursor addressing the next page to fetch.
    next_page: Cursor,
    /// Position after the last record handed out.
    position: Cursor,
    reached_end: bool,
    opened: bool,
}

impl<T> PgPagingSource<T> {
    pub fn new(name: impl Into<String>, pager: PgPager, page_size: usize) -> Self {
        Self {
            name: name.into(),
            pager,
            page_size: page_size.max(1),
            buffer: VecDeque::new(),
            next_page: Cursor::None,
            position: Cursor::None,
            reached_end: false,
            opened: false,
        }
    }
}

#[async_trait]
impl<T> ItemSource<T> for PgPagingSource<T>
where
    T: FromPgRow + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&mut self, position: &Cursor) -> Result<(), SourceError> {
        self.pager
            .check_cursor(position)
            .map_err(|e| SourceError::from_db(&self.name, e))?;
        self.buffer.clear();
        self.next_page = position.clone();
        self.position = position.clone();
        self.reached_end = false;
        self.opened = true;
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<T>, SourceError> {
        if !self.opened {
            return Err(SourceError::NotOpen(self.name.clone()));
        }

        if self.buffer.is_empty() && !self.reached_end {
            let page = self
                .pager
                .fetch_page::<T>(&self.next_page, self.page_size)
                .await
                .map_err(|e| SourceError::from_db(&self.name, e))?;
            debug!(
                source = %self.name,
                cursor = %self.next_page,
                rows = page.row_count(),
                "Fetched page"
            );
            self.next_page = page.next_cursor;
            self.reached_end = page.reached_end;
            self.buffer.extend(page.rows);
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
        self.opened = false;
        Ok(())
    }
}
