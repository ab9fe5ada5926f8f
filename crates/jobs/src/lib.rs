pub mod context;
pub mod error;
pub mod order_recovery;
pub mod post_block;
pub mod registry;
