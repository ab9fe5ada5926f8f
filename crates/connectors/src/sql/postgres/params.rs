use std::fmt;
use tokio_postgres::types::ToSql;

/// Owned statement parameters, bound in order as `$1..$n`.
#[derive(Default)]
pub struct PgParams {
    params: Vec<Box<dyn ToSql + Sync + Send>>,
}

impl PgParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: ToSql + Sync + Send + 'static>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    pub fn push<T: ToSql + Sync + Send + 'static>(&mut self, value: T) {
        self.params.push(Box::new(value));
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| &**p as &(dyn ToSql + Sync))
            .collect()
    }
}

impl fmt::Debug for PgParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.params.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_in_push_order() {
        let params = PgParams::new().with(7_i64).with("SHIPPED".to_string());
        assert_eq!(params.len(), 2);
        assert_eq!(params.as_refs().len(), 2);
        assert_eq!(format!("{params:?}"), "[7, \"SHIPPED\"]");
    }
}
