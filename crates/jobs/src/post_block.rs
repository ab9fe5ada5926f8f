//! Blocks posts that were reported heavily inside a time window.
//!
//! Parameters: `startDateTimeStr` and `endDateTimeStr`, ISO-8601 local
//! date-times bounding `reports.reported_at` (start inclusive, end exclusive).

use crate::{
    context::{JobContext, SinkKind, SourceKind},
    error::JobsError,
};
use chrono::{Local, NaiveDateTime};
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
    transform::{ItemTransformer, Transformed},
};
use engine_processing::step::StepBuilder;
use engine_runtime::job::{Job, JobBuilder};
use model::{execution::params::JobParameters, records::record::DataRecord};
use tokio_postgres::Row;
use tracing::debug;

pub const JOB_NAME: &str = "post-block";
pub const STEP_NAME: &str = "post-block-step";
pub const CHUNK_SIZE: usize = 5;
pub const PAGE_SIZE: usize = 5;

pub const PARAM_START: &str = "startDateTimeStr";
pub const PARAM_END: &str = "endDateTimeStr";

const INSERT_BLOCKED_POST_SQL: &str = "INSERT INTO blocked_posts \
     (post_id, writer, title, report_count, block_score, blocked_at) \
     VALUES ($1, $2, $3, $4, $5, $6)";

/// A post together with the number of reports it received in the window.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub writer: String,
    pub report_count: i64,
}

impl DataRecord for Post {
    fn record_id(&self) -> String {
        self.id.to_string()
    }
}

impl FromPgRow for Post {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            id: column(row, "id")?,
            title: column(row, "title")?,
            content: column(row, "content")?,
            writer: column(row, "writer")?,
            report_count: column(row, "report_count")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockedPost {
    pub post_id: i64,
    pub writer: String,
    pub title: String,
    pub report_count: i32,
    pub block_score: f64,
    pub blocked_at: NaiveDateTime,
}

impl DataRecord for BlockedPost {
    fn record_id(&self) -> String {
        self.post_id.to_string()
    }
}

impl ToStatementParams for BlockedPost {
    fn to_params(&self) -> PgParams {
        PgParams::new()
            .with(self.post_id)
            .with(self.writer.clone())
            .with(self.title.clone())
            .with(self.report_count)
            .with(self.block_score)
            .with(self.blocked_at)
    }
}

/// Scores posts by report volume and blocks those at or above the threshold.
#[derive(Debug, Clone)]
pub struct BlockScorer {
    pub weight_per_report: f64,
    pub threshold: f64,
    /// Stamped on every blocked post of the run.
    pub blocked_at: NaiveDateTime,
}

impl BlockScorer {
    pub const MAX_SCORE: f64 = 10.0;

    pub fn new(blocked_at: NaiveDateTime) -> Self {
        Self {
            weight_per_report: 2.5,
            threshold: 7.0,
            blocked_at,
        }
    }

    pub fn score(&self, post: &Post) -> f64 {
        (post.report_count as f64 * self.weight_per_report).min(Self::MAX_SCORE)
    }
}

impl ItemTransformer<Post, BlockedPost> for BlockScorer {
    fn transform(&self, post: &Post) -> Result<Transformed<BlockedPost>, TransformError> {
        let score = self.score(post);
        debug!(post = post.id, score, "Scored post");
        if score < self.threshold {
            return Ok(Transformed::Skip);
        }

        let report_count = i32::try_from(post.report_count)
            .map_err(|_| TransformError::rejected(post.record_id(), "report count out of range"))?;
        Ok(Transformed::Keep(BlockedPost {
            post_id: post.id,
            writer: post.writer.clone(),
            title: post.title.clone(),
            report_count,
            block_score: score,
            blocked_at: self.blocked_at,
        }))
    }
}

/// Posts reported inside `[$1, $2)`, one row per post.
pub fn reported_posts_query() -> PagingQuery {
    PagingQuery::new(
        "p.id AS id, p.title AS title, p.content AS content, p.writer AS writer, \
         count(r.id) AS report_count",
        "posts p JOIN reports r ON r.post_id = p.id",
        SortKey::new("p.id", "id"),
    )
    .with_filter("r.reported_at >= $1 AND r.reported_at < $2")
    .with_group_by("p.id, p.title, p.content, p.writer")
    .distinct()
}

fn window(params: &JobParameters) -> Result<PgParams, JobsError> {
    let start = params.get_datetime(PARAM_START)?;
    let end = params.get_datetime(PARAM_END)?;
    Ok(PgParams::new().with(start).with(end))
}

pub async fn build(ctx: &JobContext) -> Result<Job, JobsError> {
    let window = window(&ctx.params)?;
    let reader = PgConnection::connect(&ctx.database_url).await?;

    let source: Box<dyn ItemSource<Post>> = match ctx.source {
        SourceKind::Paging => Box::new(PgPagingSource::<Post>::new(
            "post-block-reader",
            PgPager::new(reader, reported_posts_query(), window),
            PAGE_SIZE,
        )),
        SourceKind::Cursor => Box::new(PgCursorSource::<Post>::new(
            "post-block-reader",
            reader,
            reported_posts_query(),
            window,
            CHUNK_SIZE,
        )),
    };

    let sink: Box<dyn ItemSink<BlockedPost>> = match ctx.sink {
        SinkKind::Database => {
            let writer = PgConnection::connect(&ctx.database_url).await?;
            Box::new(
                PgBatchSink::<BlockedPost>::new("post-block-writer", writer, INSERT_BLOCKED_POST_SQL)
                    .assert_updates(true),
            )
        }
        SinkKind::Log => Box::new(LoggingSink::<BlockedPost>::new("post-block-logger")),
    };

    let step = StepBuilder::new(STEP_NAME)
        .boxed_source(source)
        .transformer(BlockScorer::new(Local::now().naive_local()))
        .boxed_sink(sink)
        .chunk_size(CHUNK_SIZE)
        .build()?;

    Ok(JobBuilder::new(JOB_NAME).start(step).build()?)
}
