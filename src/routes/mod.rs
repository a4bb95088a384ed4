pub mod analyze;
pub mod delays;
pub mod health;
pub mod prices;
pub mod watch;
pub mod weather;
