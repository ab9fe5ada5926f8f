use crate::sql::{
    base::{
        error::DbError,
        query::paging::{PageStrategy, PagingQuery},
        row::{FromPgRow, integer_key},
    },
    postgres::{client::PgConnection, params::PgParams},
};
use model::pagination::{
    cursor::Cursor,
    page::{FetchResult, Positioned},
};
use tokio_postgres::types::ToSql;
use tracing::debug;

/// Executes a [`PagingQuery`] one page at a time.
///
/// Each page is an independent statement on a shared session; nothing is held
/// open between pages.
pub struct PgPager {
    conn: PgConnection,
    query: PagingQuery,
    params: PgParams,
}

impl PgPager {
    pub fn new(conn: PgConnection, query: PagingQuery, params: PgParams) -> Self {
        Self {
            conn,
            query,
            params,
        }
    }

    pub fn query(&self) -> &PagingQuery {
        &self.query
    }

    /// Fails when `cursor` cannot address a page of this query.
    pub fn check_cursor(&self, cursor: &Cursor) -> Result<(), DbError> {
        self.query.render(cursor, 1, self.params.len()).map(|_| ())
    }

    /// Fetches the page after `cursor`. Every row carries the position just
    /// after it, so a consumer may stop mid-page and resume there.
    pub async fn fetch_page<T: FromPgRow>(
        &self,
        cursor: &Cursor,
        limit: usize,
    ) -> Result<FetchResult<Positioned<T>>, DbError> {
        let page = self.query.render(cursor, limit, self.params.len())?;

        let mut bound: Vec<&(dyn ToSql + Sync)> = self.params.as_refs();
        if let Some(after) = page.after.as_ref() {
            bound.push(after);
        }

        debug!(sql = %page.sql, cursor = %cursor, "Fetching page");
        let rows = {
            let client = self.conn.lock().await;
            client.query(page.sql.as_str(), &bound).await?
        };

        let reached_end = rows.len() < limit;
        let mut positioned = Vec::with_capacity(rows.len());
        let mut position = cursor.clone();
        for (idx, row) in rows.iter().enumerate() {
            let key = match self.query.strategy() {
                PageStrategy::SortKey => Some(integer_key(row, &self.query.sort_key().alias)?),
                PageStrategy::Offset => None,
            };
            position = self.query.advance(cursor, idx + 1, key);
            positioned.push(Positioned {
                position: position.clone(),
                item: T::from_row(row)?,
            });
        }

        Ok(FetchResult {
            rows: positioned,
            next_cursor: position,
            reached_end,
        })
    }
}
