//! Weather disruption probability estimator.
//!
//! Converts one daily observation/forecast per airport into a disruption
//! probability, then combines the two ends of a route into one `weather_p`.
//! Pure functions over caller-supplied data; no I/O.

use crate::risk::tables::{clamp01, RiskTables};
use crate::services::openmeteo::DailyWeather;

/// Semantic weather category, ordered by operational severity.
///
/// The discriminant indexes into `RiskTables::condition_base`, so the enum
/// order must match the table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConditionCategory {
    Clear = 0,
    Overcast = 1,
    LightPrecip = 2,
    ModerateRain = 3,
    SnowShowers = 4,
    Fog = 5,
    HeavyPrecip = 6,
    HeavySnow = 7,
    Thunderstorm = 8,
}

impl ConditionCategory {
    /// Map an Open-Meteo WMO weather code to a severity category.
    ///
    /// Unknown or missing codes fall back to `Overcast` (the benign base),
    /// matching how an unrecognised condition should not inflate risk.
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(95) | Some(96) | Some(99) => Self::Thunderstorm,
            Some(75) | Some(86) => Self::HeavySnow,
            Some(65) | Some(67) | Some(82) => Self::HeavyPrecip,
            Some(45) | Some(48) => Self::Fog,
            Some(73) | Some(85) => Self::SnowShowers,
            Some(63) | Some(81) => Self::ModerateRain,
            Some(51) | Some(53) | Some(55) | Some(56) | Some(57) | Some(61) | Some(66)
            | Some(71) | Some(77) | Some(80) => Self::LightPrecip,
            Some(0) | Some(1) | Some(2) => Self::Clear,
            _ => Self::Overcast,
        }
    }

    /// Short label used when this category dominates a risk driver.
    pub fn driver_label(&self) -> &'static str {
        match self {
            Self::Clear => "clear skies",
            Self::Overcast => "overcast skies",
            Self::LightPrecip => "light precipitation",
            Self::ModerateRain => "steady rain",
            Self::SnowShowers => "snow showers",
            Self::Fog => "fog/low visibility",
            Self::HeavyPrecip => "heavy precipitation",
            Self::HeavySnow => "heavy snow",
            Self::Thunderstorm => "thunderstorms",
        }
    }
}

/// Disruption probability for a single airport, with the category that
/// produced the base (kept for driver labelling).
#[derive(Debug, Clone, Copy)]
pub struct AirportWeatherRisk {
    pub p: f64,
    pub category: ConditionCategory,
}

/// Combined route weather risk: the blended probability plus both ends.
#[derive(Debug, Clone, Copy)]
pub struct RouteWeatherRisk {
    pub p: f64,
    pub departure: AirportWeatherRisk,
    pub arrival: AirportWeatherRisk,
}

impl RouteWeatherRisk {
    /// The airport contributing the larger probability (ties go to arrival,
    /// since arrival disruptions strand the traveller furthest from home).
    pub fn dominant(&self) -> (&'static str, AirportWeatherRisk) {
        if self.departure.p > self.arrival.p {
            ("departure", self.departure)
        } else {
            ("arrival", self.arrival)
        }
    }
}

/// Disruption probability for one airport on one date.
///
/// Base from the condition category, plus independently-clamped additive
/// boosts for wind and precipitation, clamped to [0, 1].
pub fn airport_weather_probability(w: &DailyWeather, tables: &RiskTables) -> AirportWeatherRisk {
    let category = ConditionCategory::from_code(w.weather_code);
    let base = tables.condition_base[category as usize];

    let wind = w.wind_speed_max_mph.unwrap_or(0.0);
    let wind_boost = tables
        .wind_boosts
        .iter()
        .find(|(min_mph, _)| wind >= *min_mph)
        .map(|(_, boost)| *boost)
        .unwrap_or(0.0);

    // Prefer the probability field (forecast data); fall back to the
    // precipitation sum (historical archive data).
    let precip_boost = if let Some(prob) = w.precipitation_probability_max {
        tables
            .precip_prob_boosts
            .iter()
            .find(|(min_pct, _)| prob >= *min_pct)
            .map(|(_, boost)| *boost)
            .unwrap_or(0.0)
    } else if let Some(sum) = w.precipitation_sum_mm {
        tables
            .precip_sum_boosts
            .iter()
            .find(|(min_mm, _)| sum >= *min_mm)
            .map(|(_, boost)| *boost)
            .unwrap_or(0.0)
    } else {
        0.0
    };

    AirportWeatherRisk {
        p: clamp01(clamp01(base) + clamp01(wind_boost) + clamp01(precip_boost)),
        category,
    }
}

/// Combine departure and arrival probabilities into one route `weather_p`.
///
/// `0.70 * max(dep, arr) + 0.15 * (dep + arr)`: the worse airport dominates
/// (a storm at either end can disrupt the whole itinerary) while a clean
/// pair still beats a mixed pair.
pub fn route_weather_probability(
    departure: &DailyWeather,
    arrival: &DailyWeather,
    tables: &RiskTables,
) -> RouteWeatherRisk {
    let dep = airport_weather_probability(departure, tables);
    let arr = airport_weather_probability(arrival, tables);
    let p = clamp01(
        tables.route_max_weight * dep.p.max(arr.p) + tables.route_sum_weight * (dep.p + arr.p),
    );
    RouteWeatherRisk {
        p,
        departure: dep,
        arrival: arr,
    }
}
