pub mod executor;
pub mod instance;
pub mod store;
