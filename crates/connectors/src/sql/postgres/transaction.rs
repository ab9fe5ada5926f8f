use crate::sql::{
    base::error::DbError,
    postgres::{client::PgConnection, params::PgParams},
};
use tokio::sync::OwnedMutexGuard;
use tokio_postgres::{Client, Statement};
use tracing::warn;

/// An explicit `BEGIN … COMMIT` block on an exclusively held session.
///
/// Dropping an unfinished transaction rolls it back in the background.
pub struct PgTransaction {
    session: Option<OwnedMutexGuard<Client>>,
}

impl PgTransaction {
    pub async fn begin(conn: &PgConnection) -> Result<Self, DbError> {
        let client = conn.lock().await;
        client.batch_execute("BEGIN").await?;
        Ok(Self {
            session: Some(client),
        })
    }

    fn client(&self) -> Result<&Client, DbError> {
        self.session
            .as_deref()
            .ok_or_else(|| DbError::Closed("transaction".into()))
    }

    pub async fn prepare(&self, sql: &str) -> Result<Statement, DbError> {
        Ok(self.client()?.prepare(sql).await?)
    }

    /// Executes a prepared statement and returns the number of affected rows.
    pub async fn execute(&self, stmt: &Statement, params: &PgParams) -> Result<u64, DbError> {
        Ok(self.client()?.execute(stmt, &params.as_refs()).await?)
    }

    pub async fn commit(mut self) -> Result<(), DbError> {
        match self.session.take() {
            Some(client) => Ok(client.batch_execute("COMMIT").await?),
            None => Err(DbError::Closed("transaction".into())),
        }
    }

    pub async fn rollback(mut self) -> Result<(), DbError> {
        match self.session.take() {
            Some(client) => Ok(client.batch_execute("ROLLBACK").await?),
            None => Ok(()),
        }
    }
}

impl Drop for PgTransaction {
    fn drop(&mut self) {
        let Some(client) = self.session.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = client.batch_execute("ROLLBACK").await {
                        warn!(error = %err, "Failed to roll back abandoned transaction");
                    }
                });
            }
            Err(_) => warn!("Transaction dropped outside a runtime, session left open"),
        }
    }
}
