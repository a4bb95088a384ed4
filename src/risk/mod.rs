//! Risk scoring core.
//!
//! Pure, I/O-free estimators: every function here takes caller-supplied
//! snapshots (weather observations, offers, route context) plus an explicit
//! `RiskTables` configuration, and returns plain values. Scoring is
//! preference-independent; `Preference` only affects ranking.

pub mod blend;
pub mod delay;
pub mod itinerary;
pub mod rank;
pub mod tables;
pub mod weather;
