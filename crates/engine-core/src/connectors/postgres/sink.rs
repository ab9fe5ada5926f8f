use crate::{
    connectors::sink::{ItemSink, SinkTransaction, WriteAck},
    error::SinkError,
};
use async_trait::async_trait;
use connectors::sql::{
    base::row::ToStatementParams,
    postgres::{client::PgConnection, transaction::PgTransaction},
};
use model::records::record::DataRecord;
use std::marker::PhantomData;
use tokio_postgres::Statement;
use tracing::debug;

/// Runs one parameterised statement per record inside a single transaction.
pub struct PgBatchSink<O> {
    name: String,
    conn: PgConnection,
    sql: String,
    assert_updates: bool,
    _marker: PhantomData<fn(O)>,
}

impl<O> PgBatchSink<O> {
    pub fn new(name: impl Into<String>, conn: PgConnection, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conn,
            sql: sql.into(),
            assert_updates: false,
            _marker: PhantomData,
        }
    }

    /// Requires every statement to affect exactly one row.
    pub fn assert_updates(mut self, assert: bool) -> Self {
        self.assert_updates = assert;
        self
    }
}

#[async_trait]
impl<O> ItemSink<O> for PgBatchSink<O>
where
    O: DataRecord + ToStatementParams,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn begin(&self) -> Result<Box<dyn SinkTransaction<O>>, SinkError> {
        let tx = PgTransaction::begin(&self.conn).await?;
        let stmt = tx.prepare(&self.sql).await?;
        Ok(Box::new(PgSinkTransaction {
            tx,
            stmt,
            assert_updates: self.assert_updates,
        }))
    }
}

struct PgSinkTransaction {
    tx: PgTransaction,
    stmt: Statement,
    assert_updates: bool,
}

#[async_trait]
impl<O> SinkTransaction<O> for PgSinkTransaction
where
    O: DataRecord + ToStatementParams,
{
    async fn write(&mut self, items: &[O]) -> Result<WriteAck, SinkError> {
        let mut written = 0;
        for item in items {
            let affected = self.tx.execute(&self.stmt, &item.to_params()).await?;
            if self.assert_updates && affected != 1 {
                return Err(SinkError::RowCountMismatch {
                    record_id: item.record_id(),
                    expected: 1,
                    actual: affected,
                });
            }
            written += affected;
        }
        debug!(rows = written, "Executed batch statements");
        Ok(WriteAck { written })
    }

    async fn commit(self: Box<Self>) -> Result<(), SinkError> {
        Ok(self.tx.commit().await?)
    }

    async fn rollback(self: Box<Self>) -> Result<(), SinkError> {
        Ok(self.tx.rollback().await?)
    }
}
