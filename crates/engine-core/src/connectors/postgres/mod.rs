//! Postgres-backed sources and sinks.
//!
//! Two source flavours trade off differently. [`PgPagingSource`] issues one
//! bounded query per page and holds no transaction between pages, paying a
//! round trip per page for short lock durations. [`PgCursorSource`] runs a
//! single query behind a server-side cursor, which is cheaper per row but keeps
//! one read-only transaction open for the whole step.

mod cursor;
mod paging;
mod sink;

pub use cursor::PgCursorSource;
pub use paging::PgPagingSource;
pub use sink::PgBatchSink;
