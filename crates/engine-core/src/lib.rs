pub mod connectors;
pub mod error;
pub mod retry;
pub mod state;
pub mod transform;
