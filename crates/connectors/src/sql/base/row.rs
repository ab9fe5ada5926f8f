use crate::sql::{base::error::DbError, postgres::params::PgParams};
use tokio_postgres::{
    Row,
    types::{FromSql, Type},
};

/// Explicit, field-by-field mapping of a result row onto a record.
pub trait FromPgRow: Sized {
    fn from_row(row: &Row) -> Result<Self, DbError>;
}

/// Explicit statement parameters derived from a record.
pub trait ToStatementParams {
    fn to_params(&self) -> PgParams;
}

/// Reads a named column, mapping driver errors onto [`DbError::Decode`].
pub fn column<'a, T: FromSql<'a>>(row: &'a Row, name: &str) -> Result<T, DbError> {
    row.try_get(name).map_err(|e| DbError::decode(name, e))
}

/// Reads an integer key column regardless of its width.
pub fn integer_key(row: &Row, name: &str) -> Result<i64, DbError> {
    let idx = row
        .columns()
        .iter()
        .position(|c| c.name() == name)
        .ok_or_else(|| DbError::decode(name, "column not present in result"))?;

    match *row.columns()[idx].type_() {
        Type::INT8 => column::<i64>(row, name),
        Type::INT4 => column::<i32>(row, name).map(i64::from),
        Type::INT2 => column::<i16>(row, name).map(i64::from),
        ref other => Err(DbError::decode(
            name,
            format!("sort key must be an integer, found {other}"),
        )),
    }
}

impl FromPgRow for i64 {
    fn from_row(row: &Row) -> Result<Self, DbError> {
        let name = row
            .columns()
            .first()
            .map(|c| c.name().to_string())
            .ok_or_else(|| DbError::decode("0", "empty row"))?;
        integer_key(row, &name)
    }
}
