use crate::pagination::cursor::Cursor;

/// One page returned by a paging query.
#[derive(Debug, Clone)]
pub struct FetchResult<T> {
    pub rows: Vec<T>,
    /// Cursor that addresses the page after this one.
    pub next_cursor: Cursor,
    /// The query returned fewer rows than requested.
    pub reached_end: bool,
}

impl<T> FetchResult<T> {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A fetched record together with the source position just after it.
#[derive(Debug, Clone)]
pub struct Positioned<T> {
    pub position: Cursor,
    pub item: T,
}
