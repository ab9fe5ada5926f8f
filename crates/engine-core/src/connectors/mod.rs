pub mod logging;
pub mod memory;
pub mod postgres;
pub mod sink;
pub mod source;
