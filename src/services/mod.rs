pub mod amadeus;
pub mod analysis;
pub mod cache;
pub mod openmeteo;
pub mod summarize;
pub mod watch;
