use std::fmt::Debug;

/// A record flowing through a step.
///
/// The identifier is reported in failure records, so it should be the
/// primary key of the underlying row.
pub trait DataRecord: Debug + Send + Sync + 'static {
    fn record_id(&self) -> String;
}

macro_rules! impl_data_record_for_scalar {
    ($($ty:ty),*) => {
        $(
            impl DataRecord for $ty {
                fn record_id(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_data_record_for_scalar!(i32, i64, u32, u64, String);
