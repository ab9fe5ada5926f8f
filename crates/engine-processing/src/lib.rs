pub mod config;
pub mod error;
pub mod orchestrator;
pub mod phase;
pub mod state_manager;
pub mod step;
