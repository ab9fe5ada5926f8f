pub mod client;
pub mod cursor;
pub mod pager;
pub mod params;
pub mod transaction;
