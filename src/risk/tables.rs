//! Fixed constant tables for the risk estimators.
//!
//! All tuning knobs live in one explicit, versioned structure that is passed
//! into the estimators, so tests can substitute fixtures and the constants
//! are documented in a single place. The invariants the tables must satisfy:
//!
//! - condition base probabilities are monotonic in severity
//! - the four blend weights sum to exactly 1.0
//! - every probability-valued entry is in [0, 1]

/// Number of condition severity categories (see `ConditionCategory`).
pub const CONDITION_CATEGORIES: usize = 9;

/// Weights for blending the four component probabilities into one
/// disruption probability. Must sum to 1.0.
#[derive(Debug, Clone, Copy)]
pub struct BlendWeights {
    pub weather: f64,
    pub delay: f64,
    pub connection: f64,
    pub duration: f64,
}

impl BlendWeights {
    pub fn sum(&self) -> f64 {
        self.weather + self.delay + self.connection + self.duration
    }
}

/// Versioned configuration for all risk estimators.
#[derive(Debug, Clone)]
pub struct RiskTables {
    /// Bumped whenever any constant changes, so stored assessments can be
    /// traced back to the tables that produced them.
    pub version: &'static str,

    // --- Weather (per airport) ---
    /// Base disruption probability per `ConditionCategory`, index = category
    /// as usize. Monotonically non-decreasing in severity:
    /// clear 0.05, overcast 0.05, light precip 0.25, moderate rain 0.40,
    /// snow showers 0.50, fog 0.55, heavy precip 0.65, heavy snow 0.80,
    /// thunderstorm 0.85.
    pub condition_base: [f64; CONDITION_CATEGORIES],
    /// Additive wind boosts as (min mph, boost), strongest tier first.
    pub wind_boosts: [(f64, f64); 3],
    /// Additive precipitation-probability boosts as (min %, boost).
    pub precip_prob_boosts: [(f64, f64); 2],
    /// Fallback boosts keyed on precipitation sum (min mm, boost), used when
    /// the probability field is absent (historical data).
    pub precip_sum_boosts: [(f64, f64); 2],
    /// Route combination: weight on the worse airport's probability.
    pub route_max_weight: f64,
    /// Route combination: weight on the sum of both probabilities.
    pub route_sum_weight: f64,

    // --- Delay heuristic ---
    /// Month-of-year baseline delay probability, index 0 = January.
    /// Higher in winter (weather + holidays) and at peak summer travel.
    pub monthly_delay_baseline: [f64; 12],
    /// Discount applied on Tuesday/Wednesday (historically less congested).
    pub midweek_discount: f64,
    /// Boost applied on Friday/Sunday (peak travel days).
    pub peak_weekday_boost: f64,
    /// Boost when the date falls near a major holiday.
    pub holiday_boost: f64,
    /// Half-width of the holiday proximity window, in days.
    pub holiday_window_days: i64,
    /// Distance boost: `max * clamp01((km - floor) / span)`.
    pub distance_boost_max: f64,
    pub distance_boost_floor_km: f64,
    pub distance_boost_span_km: f64,

    // --- Itinerary factors ---
    /// Missed-connection floor for nonstop itineraries.
    pub connection_floor: f64,
    /// Probability at one stop.
    pub connection_first_stop: f64,
    /// Increment per stop beyond the first.
    pub connection_per_extra_stop: f64,
    /// Duration bands as (exclusive upper bound in minutes, probability),
    /// ascending. Durations past the last bound get `duration_ceiling`.
    pub duration_bands: [(u32, f64); 5],
    pub duration_ceiling: f64,

    // --- Blend & levels ---
    pub blend: BlendWeights,
    /// `risk_score` at or above this is at least medium.
    pub medium_threshold: u8,
    /// `risk_score` at or above this is high.
    pub high_threshold: u8,
    /// Maximum number of drivers emitted per assessment.
    pub max_drivers: usize,

    // --- Watch sessions ---
    /// Score increase since the previous tick that triggers an alert even
    /// without a level crossing.
    pub alert_score_delta: u8,
}

impl Default for RiskTables {
    fn default() -> Self {
        Self {
            version: "2026.1",
            condition_base: [0.05, 0.05, 0.25, 0.40, 0.50, 0.55, 0.65, 0.80, 0.85],
            wind_boosts: [(45.0, 0.20), (35.0, 0.12), (25.0, 0.06)],
            precip_prob_boosts: [(80.0, 0.10), (60.0, 0.06)],
            precip_sum_boosts: [(15.0, 0.10), (7.0, 0.06)],
            route_max_weight: 0.70,
            route_sum_weight: 0.15,
            monthly_delay_baseline: [
                0.52, // Jan: winter weather + post-holiday backlog
                0.42, // Feb
                0.35, // Mar
                0.30, // Apr
                0.33, // May
                0.45, // Jun
                0.58, // Jul: summer peak
                0.52, // Aug
                0.38, // Sep
                0.33, // Oct
                0.48, // Nov: Thanksgiving travel
                0.62, // Dec: holidays
            ],
            midweek_discount: 0.05,
            peak_weekday_boost: 0.10,
            holiday_boost: 0.08,
            holiday_window_days: 3,
            distance_boost_max: 0.10,
            distance_boost_floor_km: 800.0,
            distance_boost_span_km: 8000.0,
            connection_floor: 0.05,
            connection_first_stop: 0.18,
            connection_per_extra_stop: 0.12,
            duration_bands: [
                (150, 0.05),
                (240, 0.08),
                (360, 0.12),
                (450, 0.15),
                (600, 0.18),
            ],
            duration_ceiling: 0.22,
            blend: BlendWeights {
                weather: 0.50,
                delay: 0.35,
                connection: 0.12,
                duration: 0.03,
            },
            medium_threshold: 30,
            high_threshold: 60,
            max_drivers: 3,
            alert_score_delta: 15,
        }
    }
}

/// Clamp a probability to [0, 1].
pub fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}
