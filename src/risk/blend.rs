//! Risk blender.
//!
//! Combines the four component probabilities (route weather, seasonal
//! delay, connections, duration) into one bounded disruption probability,
//! a 0-100 score, a discrete level, and up to three human-readable drivers
//! naming the dominant contributors. Pure and deterministic: identical
//! inputs produce identical output.

use serde::Serialize;
use utoipa::ToSchema;

use crate::risk::delay::{DelayEstimate, DelayLevel};
use crate::risk::itinerary::{connection_probability, duration_probability};
use crate::risk::tables::{clamp01, RiskTables};
use crate::risk::weather::{ConditionCategory, RouteWeatherRisk};
use crate::services::amadeus::FlightOffer;

/// Discrete risk bucket, a pure function of `risk_score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Risk assessment for one (offer, weather snapshot) pair.
///
/// Produced fresh on every scoring pass; never mutated, always replaced.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RiskAssessment {
    /// 0-100, higher = worse. Exactly `round(100 * p)` for the blended
    /// probability `p`.
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    /// Up to 3 short labels, most significant contributor first.
    pub drivers: Vec<String>,
}

/// Map a score to its level. Fixed thresholds, no hysteresis:
/// `< medium_threshold → Low`, `< high_threshold → Medium`, else `High`.
pub fn risk_level(score: u8, tables: &RiskTables) -> RiskLevel {
    if score < tables.medium_threshold {
        RiskLevel::Low
    } else if score < tables.high_threshold {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Score one offer against a route weather snapshot and delay estimate.
pub fn score_offer(
    offer: &FlightOffer,
    weather: &RouteWeatherRisk,
    delay: &DelayEstimate,
    tables: &RiskTables,
) -> RiskAssessment {
    let weather_p = clamp01(weather.p);
    let delay_p = clamp01(delay.p);
    let conn_p = clamp01(connection_probability(offer.stops, tables));
    let dur_p = clamp01(duration_probability(offer.duration_minutes, tables));

    let w = &tables.blend;
    let p = clamp01(
        w.weather * weather_p + w.delay * delay_p + w.connection * conn_p + w.duration * dur_p,
    );

    let risk_score = (100.0 * p).round() as u8;

    RiskAssessment {
        risk_score,
        risk_level: risk_level(risk_score, tables),
        drivers: rank_drivers(offer, weather, delay, conn_p, dur_p, tables),
    }
}

/// Rank the four weighted contributions descending and emit fixed labels
/// for the top contributors. Label text is keyed by which component
/// dominated and its severity bucket, never freeform.
fn rank_drivers(
    offer: &FlightOffer,
    weather: &RouteWeatherRisk,
    delay: &DelayEstimate,
    conn_p: f64,
    dur_p: f64,
    tables: &RiskTables,
) -> Vec<String> {
    let w = &tables.blend;
    let mut contributions = [
        (w.weather * weather.p, weather_label(weather)),
        (w.delay * delay.p, delay_label(delay.level)),
        (w.connection * conn_p, connection_label(offer.stops)),
        (w.duration * dur_p, duration_label(offer.duration_minutes)),
    ];

    // Sort is stable, so equal contributions keep the weather-first order.
    contributions.sort_by(|a, b| b.0.total_cmp(&a.0));

    contributions
        .into_iter()
        .take(tables.max_drivers)
        .map(|(_, label)| label)
        .collect()
}

fn weather_label(weather: &RouteWeatherRisk) -> String {
    let (end, dominant) = weather.dominant();
    match dominant.category {
        ConditionCategory::Clear | ConditionCategory::Overcast => {
            "mild weather at both ends".to_string()
        }
        category => format!("{} at {}", category.driver_label(), end),
    }
}

fn delay_label(level: DelayLevel) -> String {
    match level {
        DelayLevel::High => "peak-season delays".to_string(),
        DelayLevel::Medium => "seasonal delay patterns".to_string(),
        DelayLevel::Low => "low seasonal delay risk".to_string(),
    }
}

fn connection_label(stops: u32) -> String {
    match stops {
        0 => "nonstop itinerary".to_string(),
        1 => "1 connection".to_string(),
        n => format!("{} connections", n),
    }
}

fn duration_label(minutes: u32) -> String {
    if minutes >= 450 {
        "long total duration".to_string()
    } else if minutes >= 240 {
        "moderate total duration".to_string()
    } else {
        "short itinerary".to_string()
    }
}
