use crate::error::TransformError;

/// Outcome of transforming one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed<O> {
    Keep(O),
    /// The record is filtered out and never reaches the sink.
    Skip,
}

impl<O> Transformed<O> {
    pub fn into_option(self) -> Option<O> {
        match self {
            Transformed::Keep(out) => Some(out),
            Transformed::Skip => None,
        }
    }
}

impl<O> From<Option<O>> for Transformed<O> {
    fn from(value: Option<O>) -> Self {
        match value {
            Some(out) => Transformed::Keep(out),
            None => Transformed::Skip,
        }
    }
}

/// Maps one input record to zero or one output records. Implementations must
/// be pure: the same input always gives the same outcome.
pub trait ItemTransformer<I, O>: Send + Sync {
    fn transform(&self, item: &I) -> Result<Transformed<O>, TransformError>;
}

impl<I, O, F> ItemTransformer<I, O> for F
where
    F: Fn(&I) -> Result<Transformed<O>, TransformError> + Send + Sync,
{
    fn transform(&self, item: &I) -> Result<Transformed<O>, TransformError> {
        self(item)
    }
}

/// Forwards every record unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl<I: Clone> ItemTransformer<I, I> for PassThrough {
    fn transform(&self, item: &I) -> Result<Transformed<I>, TransformError> {
        Ok(Transformed::Keep(item.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_transformers() {
        let evens = |n: &i64| -> Result<Transformed<i64>, TransformError> {
            Ok(if n % 2 == 0 {
                Transformed::Keep(n * 10)
            } else {
                Transformed::Skip
            })
        };

        assert_eq!(evens.transform(&2).unwrap(), Transformed::Keep(20));
        assert_eq!(evens.transform(&3).unwrap(), Transformed::Skip);
    }

    #[test]
    fn pass_through_keeps_items() {
        assert_eq!(
            PassThrough.transform(&"a".to_string()).unwrap(),
            Transformed::Keep("a".to_string())
        );
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Transformed::from(Some(1)), Transformed::Keep(1));
        assert_eq!(Transformed::<i32>::from(None).into_option(), None);
    }
}
