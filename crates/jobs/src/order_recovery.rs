//! Repairs orders whose status contradicts their shipping id: shipped orders
//! without a shipment become ready for shipment, cancelled orders that were
//! actually shipped become shipped.

use crate::{
    context::{JobContext, SinkKind, SourceKind},
    error::JobsError,
};
use chrono::NaiveDateTime;
use connectors::sql::{
    base::{
        error::DbError,
        query::paging::{PagingQuery, SortKey},
        row::{FromPgRow, ToStatementParams, column},
    },
    postgres::{client::PgConnection, pager::PgPager, params::PgParams},
};
use engine_core::{
    connectors::{
        logging::LoggingSink,
        postgres::{PgBatchSink, PgCursorSource, PgPagingSource},
        sink::ItemSink,
        source::ItemSource,
    },
    error::TransformError,
    transform::Transformed,
};
use engine_processing::step::StepBuilder;
use engine_runtime::job::{Job, JobBuilder};
use model::records::record::DataRecord;
use tokio_postgres::Row;

pub const JOB_NAME: &str = "order-recovery";
pub const STEP_NAME: &str = "order-recovery-step";
pub const CHUNK_SIZE: usize = 5;
pub const PAGE_SIZE: usize = 10;

pub const STATUS_SHIPPED: &str = "SHIPPED";
pub const STATUS_CANCELLED: &str = "CANCELLED";
pub const STATUS_READY_FOR_SHIPMENT: &str = "READY_FOR_SHIPMENT";

const UPDATE_STATUS_SQL: &str = "UPDATE orders SET status = $1 WHERE id = $2";

#[derive(Debug, Clone, PartialEq)]
pub struct HackedOrder {
    pub id: i64,
    pub customer_id: Option<i64>,
    pub order_date_time: Option<NaiveDateTime>,
    pub status: String,
    pub shipping_id: Option<String>,
}

impl DataRecord for HackedOrder {
    fn record_id(&self) -> String {
        self.id.to_string()
    }
}

impl FromPgRow for HackedOrder {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            id: column(row, "id")?,
            customer_id: column(row, "customer_id")?,
            order_date_time: column(row, "order_date_time")?,
            status: column(row, "status")?,
            shipping_id: column(row, "shipping_id")?,
        })
    }
}

impl ToStatementParams for HackedOrder {
    fn to_params(&self) -> PgParams {
        PgParams::new().with(self.status.clone()).with(self.id)
    }
}

/// Orders in an inconsistent state, keyset-paged by id. Keyset paging keeps
/// the walk stable while the job moves rows out of the filtered set.
pub fn compromised_orders_query() -> PagingQuery {
    PagingQuery::new(
        "id, customer_id, order_date_time, status, shipping_id",
        "orders",
        SortKey::new("id", "id"),
    )
    .with_filter(
        "(status = 'SHIPPED' AND shipping_id IS NULL) \
         OR (status = 'CANCELLED' AND shipping_id IS NOT NULL)",
    )
}

pub fn recover_status(order: &HackedOrder) -> Result<Transformed<HackedOrder>, TransformError> {
    let status = match order.shipping_id {
        None => STATUS_READY_FOR_SHIPMENT,
        Some(_) => STATUS_SHIPPED,
    };
    Ok(Transformed::Keep(HackedOrder {
        status: status.to_string(),
        ..order.clone()
    }))
}

pub async fn build(ctx: &JobContext) -> Result<Job, JobsError> {
    let reader = PgConnection::connect(&ctx.database_url).await?;

    let source: Box<dyn ItemSource<HackedOrder>> = match ctx.source {
        SourceKind::Paging => Box::new(PgPagingSource::<HackedOrder>::new(
            "compromised-order-reader",
            PgPager::new(reader, compromised_orders_query(), PgParams::new()),
            PAGE_SIZE,
        )),
        SourceKind::Cursor => Box::new(PgCursorSource::<HackedOrder>::new(
            "compromised-order-reader",
            reader,
            compromised_orders_query(),
            PgParams::new(),
            PAGE_SIZE,
        )),
    };

    // The reader keeps its own session; updates go through a second one.
    let sink: Box<dyn ItemSink<HackedOrder>> = match ctx.sink {
        SinkKind::Database => {
            let writer = PgConnection::connect(&ctx.database_url).await?;
            Box::new(
                PgBatchSink::<HackedOrder>::new("order-status-writer", writer, UPDATE_STATUS_SQL)
                    .assert_updates(true),
            )
        }
        SinkKind::Log => Box::new(LoggingSink::<HackedOrder>::new("order-status-logger")),
    };

    let step = StepBuilder::new(STEP_NAME)
        .boxed_source(source)
        .transformer(recover_status)
        .boxed_sink(sink)
        .chunk_size(CHUNK_SIZE)
        .build()?;

    Ok(JobBuilder::new(JOB_NAME).start(step).build()?)
}
