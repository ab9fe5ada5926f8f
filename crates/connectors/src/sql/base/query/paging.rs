use crate::sql::base::error::DbError;
use model::pagination::cursor::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    fn keyword(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }

    fn after(&self) -> &'static str {
        match self {
            Order::Asc => ">",
            Order::Desc => "<",
        }
    }
}

/// How consecutive pages are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageStrategy {
    /// `LIMIT n OFFSET k`. Sensitive to rows entering or leaving the filtered
    /// set between pages.
    Offset,
    /// `WHERE key > last LIMIT n`. Requires a unique integer sort key.
    #[default]
    SortKey,
}

/// Unique sort key of a paging query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Expression used in `WHERE` and `ORDER BY`, e.g. `p.id`.
    pub column: String,
    /// Name of the key in the result set, e.g. `id`.
    pub alias: String,
}

impl SortKey {
    pub fn new(column: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            alias: alias.into(),
        }
    }
}

/// Page query rendered for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub sql: String,
    /// Sort key value to bind after the base parameters.
    pub after: Option<i64>,
}

/// A `SELECT` split into the parts the pager needs to append its own
/// key predicate, ordering and limit.
#[derive(Debug, Clone)]
pub struct PagingQuery {
    select: String,
    from: String,
    filter: Option<String>,
    group_by: Option<String>,
    distinct: bool,
    sort_key: SortKey,
    order: Order,
    strategy: PageStrategy,
}

impl PagingQuery {
    pub fn new(select: impl Into<String>, from: impl Into<String>, sort_key: SortKey) -> Self {
        Self {
            select: select.into(),
            from: from.into(),
            filter: None,
            group_by: None,
            distinct: false,
            sort_key,
            order: Order::Asc,
            strategy: PageStrategy::SortKey,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = Some(group_by.into());
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn with_strategy(mut self, strategy: PageStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn sort_key(&self) -> &SortKey {
        &self.sort_key
    }

    pub fn strategy(&self) -> PageStrategy {
        self.strategy
    }

    fn unpaged(&self) -> String {
        let mut sql = self.head();
        if let Some(filter) = &self.filter {
            sql.push_str(&format!(" WHERE {filter}"));
        }
        self.push_tail(&mut sql);
        sql
    }

    /// Renders the page that follows `cursor`. `bound` is the number of
    /// placeholders already used by the filter, so the key is bound at
    /// `$bound + 1`.
    pub fn render(&self, cursor: &Cursor, limit: usize, bound: usize) -> Result<RenderedPage, DbError> {
        if limit == 0 {
            return Err(DbError::QueryBuild("page size must be positive".into()));
        }

        match self.strategy {
            PageStrategy::Offset => {
                let offset = cursor
                    .consumed()
                    .ok_or_else(|| DbError::IncompatibleCursor(cursor.to_string()))?;
                let mut sql = self.unpaged();
                sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
                Ok(RenderedPage { sql, after: None })
            }
            PageStrategy::SortKey => {
                let mut page = self.keyed(cursor, bound)?;
                page.sql.push_str(&format!(" LIMIT {limit}"));
                Ok(page)
            }
        }
    }

    /// Renders every row after `cursor` in one unbounded statement, for use
    /// behind a server-side cursor. Only sort-key queries can resume this
    /// way: the key predicate is evaluated against the fresh snapshot, so
    /// rows that left the filtered set since the last run are not counted.
    pub fn resume(&self, cursor: &Cursor, bound: usize) -> Result<RenderedPage, DbError> {
        match self.strategy {
            PageStrategy::SortKey => self.keyed(cursor, bound),
            PageStrategy::Offset => Err(DbError::QueryBuild(
                "a streamed query needs the sort-key strategy to resume".into(),
            )),
        }
    }

    fn keyed(&self, cursor: &Cursor, bound: usize) -> Result<RenderedPage, DbError> {
        let after = match cursor {
            Cursor::None => None,
            Cursor::SortKey { column, last } if *column == self.sort_key.alias => Some(*last),
            other => return Err(DbError::IncompatibleCursor(other.to_string())),
        };

        let mut sql = self.head();
        let key_pred = after.map(|_| {
            format!(
                "{} {} ${}",
                self.sort_key.column,
                self.order.after(),
                bound + 1
            )
        });
        match (&self.filter, key_pred) {
            (Some(filter), Some(pred)) => sql.push_str(&format!(" WHERE ({filter}) AND {pred}")),
            (Some(filter), None) => sql.push_str(&format!(" WHERE {filter}")),
            (None, Some(pred)) => sql.push_str(&format!(" WHERE {pred}")),
            (None, None) => {}
        }
        self.push_tail(&mut sql);
        Ok(RenderedPage { sql, after })
    }

    /// Cursor to persist after consuming `consumed` rows from `start`, the
    /// last of which carried sort key `last_key`.
    pub fn advance(&self, start: &Cursor, consumed: usize, last_key: Option<i64>) -> Cursor {
        match self.strategy {
            PageStrategy::Offset => {
                Cursor::offset(start.consumed().unwrap_or(0) + consumed as u64)
            }
            PageStrategy::SortKey => match last_key {
                Some(last) => Cursor::sort_key(self.sort_key.alias.clone(), last),
                None => start.clone(),
            },
        }
    }

    fn head(&self) -> String {
        let distinct = if self.distinct { "DISTINCT " } else { "" };
        format!("SELECT {distinct}{} FROM {}", self.select, self.from)
    }

    fn push_tail(&self, sql: &mut String) {
        if let Some(group_by) = &self.group_by {
            sql.push_str(&format!(" GROUP BY {group_by}"));
        }
        sql.push_str(&format!(
            " ORDER BY {} {}",
            self.sort_key.column,
            self.order.keyword()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> PagingQuery {
        PagingQuery::new("id, status", "orders", SortKey::new("id", "id"))
            .with_filter("status = $1")
    }

    #[test]
    fn first_keyset_page_has_no_key_predicate() {
        let page = orders().render(&Cursor::None, 10, 1).unwrap();
        assert_eq!(
            page.sql,
            "SELECT id, status FROM orders WHERE status = $1 ORDER BY id ASC LIMIT 10"
        );
        assert_eq!(page.after, None);
    }

    #[test]
    fn keyset_page_binds_key_after_filter_params() {
        let page = orders()
            .render(&Cursor::sort_key("id", 42), 10, 1)
            .unwrap();
        assert_eq!(
            page.sql,
            "SELECT id, status FROM orders WHERE (status = $1) AND id > $2 ORDER BY id ASC LIMIT 10"
        );
        assert_eq!(page.after, Some(42));
    }

    #[test]
    fn descending_keyset_uses_less_than() {
        let query = PagingQuery::new("id", "orders", SortKey::new("id", "id"))
            .with_order(Order::Desc);
        let page = query.render(&Cursor::sort_key("id", 9), 5, 0).unwrap();
        assert_eq!(
            page.sql,
            "SELECT id FROM orders WHERE id < $1 ORDER BY id DESC LIMIT 5"
        );
    }

    #[test]
    fn offset_pages_use_consumed_count() {
        let query = orders().with_strategy(PageStrategy::Offset);
        let page = query.render(&Cursor::offset(20), 10, 1).unwrap();
        assert_eq!(
            page.sql,
            "SELECT id, status FROM orders WHERE status = $1 ORDER BY id ASC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn group_by_and_distinct_are_kept() {
        let query = PagingQuery::new(
            "p.id AS id, count(r.id) AS report_count",
            "posts p JOIN reports r ON r.post_id = p.id",
            SortKey::new("p.id", "id"),
        )
        .with_filter("r.reported_at >= $1 AND r.reported_at < $2")
        .with_group_by("p.id")
        .distinct();

        let page = query.render(&Cursor::sort_key("id", 3), 5, 2).unwrap();
        assert_eq!(
            page.sql,
            "SELECT DISTINCT p.id AS id, count(r.id) AS report_count \
             FROM posts p JOIN reports r ON r.post_id = p.id \
             WHERE (r.reported_at >= $1 AND r.reported_at < $2) AND p.id > $3 \
             GROUP BY p.id ORDER BY p.id ASC LIMIT 5"
        );
    }

    #[test]
    fn rejects_foreign_cursor() {
        let err = orders().render(&Cursor::offset(5), 10, 1).unwrap_err();
        assert!(matches!(err, DbError::IncompatibleCursor(_)));

        let err = orders()
            .with_strategy(PageStrategy::Offset)
            .render(&Cursor::sort_key("id", 1), 10, 1)
            .unwrap_err();
        assert!(matches!(err, DbError::IncompatibleCursor(_)));

        let err = orders()
            .render(&Cursor::sort_key("other", 1), 10, 1)
            .unwrap_err();
        assert!(matches!(err, DbError::IncompatibleCursor(_)));
    }

    #[test]
    fn advance_tracks_strategy() {
        let keyset = orders();
        assert_eq!(
            keyset.advance(&Cursor::None, 3, Some(17)),
            Cursor::sort_key("id", 17)
        );
        assert_eq!(
            keyset.advance(&Cursor::sort_key("id", 17), 0, None),
            Cursor::sort_key("id", 17)
        );

        let offset = orders().with_strategy(PageStrategy::Offset);
        assert_eq!(offset.advance(&Cursor::offset(10), 4, None), Cursor::offset(14));
    }

    #[test]
    fn resume_restarts_after_last_key_without_limit() {
        let fresh = orders().resume(&Cursor::None, 1).unwrap();
        assert_eq!(
            fresh.sql,
            "SELECT id, status FROM orders WHERE status = $1 ORDER BY id ASC"
        );
        assert_eq!(fresh.after, None);

        let resumed = orders().resume(&Cursor::sort_key("id", 5), 1).unwrap();
        assert_eq!(
            resumed.sql,
            "SELECT id, status FROM orders WHERE (status = $1) AND id > $2 ORDER BY id ASC"
        );
        assert_eq!(resumed.after, Some(5));
    }

    #[test]
    fn resume_refuses_counted_positions() {
        let err = orders().resume(&Cursor::offset(5), 1).unwrap_err();
        assert!(matches!(err, DbError::IncompatibleCursor(_)));

        let err = orders()
            .with_strategy(PageStrategy::Offset)
            .resume(&Cursor::None, 1)
            .unwrap_err();
        assert!(matches!(err, DbError::QueryBuild(_)));
    }
}
