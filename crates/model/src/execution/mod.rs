pub mod errors;
pub mod params;
pub mod status;
pub mod step;
