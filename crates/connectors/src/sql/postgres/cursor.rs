use crate::sql::{
    base::{
        error::DbError,
        query::paging::PagingQuery,
        row::{FromPgRow, integer_key},
    },
    postgres::{client::PgConnection, params::PgParams},
};
use model::pagination::{cursor::Cursor, page::Positioned};
use tokio::sync::OwnedMutexGuard;
use tokio_postgres::{Client, types::ToSql};
use tracing::{debug, warn};

/// A `NO SCROLL` server-side cursor inside a read-only transaction.
///
/// The cursor owns its session for as long as it is open. Once closed, the
/// handle cannot be reused; a new one must be declared.
pub struct PgServerCursor {
    name: String,
    session: Option<OwnedMutexGuard<Client>>,
    query: PagingQuery,
    position: Cursor,
    exhausted: bool,
}

impl PgServerCursor {
    /// Opens a transaction and declares the cursor over every row of `query`
    /// after `from`.
    pub async fn declare(
        conn: &PgConnection,
        query: &PagingQuery,
        params: &PgParams,
        from: &Cursor,
    ) -> Result<Self, DbError> {
        let rendered = query.resume(from, params.len())?;
        let mut bound: Vec<&(dyn ToSql + Sync)> = params.as_refs();
        if let Some(after) = rendered.after.as_ref() {
            bound.push(after);
        }

        let name = format!("batch_cur_{}", uuid::Uuid::new_v4().simple());
        let client = conn.lock().await;
        client
            .batch_execute("BEGIN TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .await?;

        // From here on, dropping `cursor` on error rolls the transaction back.
        let cursor = Self {
            name,
            session: Some(client),
            query: query.clone(),
            position: from.clone(),
            exhausted: false,
        };
        let client = cursor.client()?;

        let declare = format!("DECLARE {} NO SCROLL CURSOR FOR {}", cursor.name, rendered.sql);
        client.execute(declare.as_str(), &bound).await?;

        debug!(cursor = %cursor.name, from = %from, "Declared server-side cursor");
        Ok(cursor)
    }

    fn client(&self) -> Result<&Client, DbError> {
        self.session
            .as_deref()
            .ok_or_else(|| DbError::Closed(self.name.clone()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fetches up to `count` rows, each with the position just after it. A
    /// short result marks the cursor exhausted.
    pub async fn fetch<T: FromPgRow>(
        &mut self,
        count: usize,
    ) -> Result<Vec<Positioned<T>>, DbError> {
        if self.exhausted {
            return Ok(Vec::new());
        }
        let rows = self
            .client()?
            .query(
                format!("FETCH FORWARD {count} FROM {}", self.name).as_str(),
                &[],
            )
            .await?;
        if rows.len() < count {
            self.exhausted = true;
        }

        let alias = &self.query.sort_key().alias;
        let mut positioned = Vec::with_capacity(rows.len());
        for row in &rows {
            let key = integer_key(row, alias)?;
            self.position = self.query.advance(&self.position, 1, Some(key));
            positioned.push(Positioned {
                position: self.position.clone(),
                item: T::from_row(row)?,
            });
        }
        Ok(positioned)
    }

    /// Closes the cursor and ends its transaction. Idempotent.
    pub async fn close(&mut self) -> Result<(), DbError> {
        let Some(client) = self.session.take() else {
            return Ok(());
        };
        client
            .batch_execute(&format!("CLOSE {}; COMMIT", self.name))
            .await?;
        debug!(cursor = %self.name, "Closed server-side cursor");
        Ok(())
    }
}

impl Drop for PgServerCursor {
    fn drop(&mut self) {
        let Some(client) = self.session.take() else {
            return;
        };
        let name = self.name.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = client.batch_execute("ROLLBACK").await {
                        warn!(cursor = %name, error = %err, "Failed to release cursor session");
                    }
                });
            }
            Err(_) => warn!(cursor = %name, "Cursor dropped outside a runtime, session left open"),
        }
    }
}
