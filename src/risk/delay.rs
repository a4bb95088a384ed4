//! Seasonal delay heuristic.
//!
//! Calendar- and geometry-driven stand-in for a real delay-statistics feed:
//! a monthly baseline, weekday adjustments, holiday proximity, and a
//! distance boost. No live data is consumed.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;
use utoipa::ToSchema;

use crate::airports::Airport;
use crate::risk::tables::{clamp01, RiskTables};

/// Route inputs for one analysis request. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct RouteContext {
    pub origin: &'static Airport,
    pub destination: &'static Airport,
    pub departure_day: NaiveDate,
    /// Great-circle distance in kilometres.
    pub distance_km: f64,
}

impl RouteContext {
    pub fn new(
        origin: &'static Airport,
        destination: &'static Airport,
        departure_day: NaiveDate,
    ) -> Self {
        let distance_km =
            crate::airports::haversine_km(origin.lat, origin.lon, destination.lat, destination.lon);
        Self {
            origin,
            destination,
            departure_day,
            distance_km,
        }
    }
}

/// Display bucket for the delay estimate (not used in scoring).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DelayLevel {
    Low,
    Medium,
    High,
}

/// Heuristic delay estimate for a route/date.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DelayEstimate {
    /// Delay probability in [0, 1].
    pub p: f64,
    pub level: DelayLevel,
    /// Signals that contributed, for display.
    pub rationale: Vec<String>,
    /// Always "historical-heuristic" until a real delay feed is wired in.
    pub source: &'static str,
}

/// Estimate the delay probability for a route/date.
///
/// Month baseline, then weekday adjustment (Tue/Wed discount, Fri/Sun
/// boost), holiday proximity boost, and a capped piecewise-linear distance
/// boost, all clamped to [0, 1].
pub fn estimate_delay(route: &RouteContext, tables: &RiskTables) -> DelayEstimate {
    let day = route.departure_day;
    let mut rationale = Vec::new();

    let mut p = tables.monthly_delay_baseline[day.month0() as usize];

    match day.weekday() {
        Weekday::Fri | Weekday::Sun => {
            p += tables.peak_weekday_boost;
            rationale
                .push("High-travel day of week (Fri/Sun) tends to run tighter on capacity.".into());
        }
        Weekday::Tue | Weekday::Wed => {
            p -= tables.midweek_discount;
            rationale.push("Midweek travel (Tue/Wed) is often less congested.".into());
        }
        _ => {}
    }

    if let Some(holiday) = near_major_us_holiday(day, tables.holiday_window_days) {
        p += tables.holiday_boost;
        rationale.push(format!(
            "Near {}, airports often see heavier traffic and more knock-on delays.",
            holiday
        ));
    }

    p += distance_boost(route.distance_km, tables);
    if route.distance_km > 3500.0 {
        rationale.push("Long-haul routes can accumulate upstream delays over the day.".into());
    }

    let p = clamp01(p);
    let level = if p < 0.33 {
        DelayLevel::Low
    } else if p < 0.66 {
        DelayLevel::Medium
    } else {
        DelayLevel::High
    };

    if rationale.is_empty() {
        rationale.push(
            "Heuristic based on seasonality, weekday, holidays, and route length.".into(),
        );
    }

    DelayEstimate {
        p,
        level,
        rationale,
        source: "historical-heuristic",
    }
}

/// Distance boost: linear from the floor distance, capped at the maximum.
fn distance_boost(distance_km: f64, tables: &RiskTables) -> f64 {
    let fraction = clamp01((distance_km - tables.distance_boost_floor_km) / tables.distance_boost_span_km);
    tables.distance_boost_max * fraction
}

/// Name of a major US holiday within `window_days` of the date, if any.
fn near_major_us_holiday(d: NaiveDate, window_days: i64) -> Option<&'static str> {
    // Late December is close to the following year's New Year's Day, so
    // check both years.
    for y in [d.year(), d.year() + 1] {
        let candidates: [(&'static str, Option<NaiveDate>); 6] = [
            ("New Year's Day", NaiveDate::from_ymd_opt(y, 1, 1)),
            ("Memorial Day", last_weekday_of_month(y, 5, Weekday::Mon)),
            ("Independence Day", NaiveDate::from_ymd_opt(y, 7, 4)),
            ("Labor Day", nth_weekday_of_month(y, 9, Weekday::Mon, 1)),
            ("Thanksgiving", nth_weekday_of_month(y, 11, Weekday::Thu, 4)),
            ("Christmas", NaiveDate::from_ymd_opt(y, 12, 25)),
        ];
        for (name, holiday) in candidates {
            if let Some(h) = holiday {
                if (d - h).num_days().abs() <= window_days {
                    return Some(name);
                }
            }
        }
    }
    None
}

/// The nth occurrence of a weekday in a month (1-based).
fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, n: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let days_until =
        (weekday.num_days_from_monday() + 7 - first.weekday().num_days_from_monday()) % 7;
    first.checked_add_signed(Duration::days(days_until as i64 + 7 * (n as i64 - 1)))
}

/// The last occurrence of a weekday in a month.
fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = next_month.pred_opt()?;
    let days_back =
        (last.weekday().num_days_from_monday() + 7 - weekday.num_days_from_monday()) % 7;
    last.checked_sub_signed(Duration::days(days_back as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airports::resolve_airport;

    fn route_on(date: &str, distance_km: f64) -> RouteContext {
        RouteContext {
            origin: resolve_airport("LAX").unwrap(),
            destination: resolve_airport("JFK").unwrap(),
            departure_day: date.parse().unwrap(),
            distance_km,
        }
    }

    #[test]
    fn test_worked_scenario_february_monday() {
        // 2026-02-09 is a Monday, no holiday nearby, ~3980 km:
        // 0.42 + 0.10 * (3980 - 800) / 8000 = 0.45975
        let est = estimate_delay(&route_on("2026-02-09", 3980.0), &RiskTables::default());
        assert!((est.p - 0.45975).abs() < 1e-12, "got {}", est.p);
        assert_eq!(est.level, DelayLevel::Medium);
    }

    #[test]
    fn test_midweek_discount() {
        let tables = RiskTables::default();
        // 2026-02-09 Monday vs 2026-02-10 Tuesday, same route
        let mon = estimate_delay(&route_on("2026-02-09", 3980.0), &tables);
        let tue = estimate_delay(&route_on("2026-02-10", 3980.0), &tables);
        assert!((mon.p - tue.p - tables.midweek_discount).abs() < 1e-12);
    }

    #[test]
    fn test_peak_weekday_boost() {
        let tables = RiskTables::default();
        // 2026-02-13 is a Friday
        let fri = estimate_delay(&route_on("2026-02-13", 3980.0), &tables);
        let mon = estimate_delay(&route_on("2026-02-09", 3980.0), &tables);
        assert!((fri.p - mon.p - tables.peak_weekday_boost).abs() < 1e-12);
    }

    #[test]
    fn test_holiday_proximity_boost() {
        let tables = RiskTables::default();
        // 2026-11-26 is Thanksgiving (4th Thursday of November 2026)
        let thanksgiving = estimate_delay(&route_on("2026-11-26", 1000.0), &tables);
        // Same month, same weekday, two weeks earlier
        let plain = estimate_delay(&route_on("2026-11-12", 1000.0), &tables);
        assert!((thanksgiving.p - plain.p - tables.holiday_boost).abs() < 1e-12);
        assert!(thanksgiving
            .rationale
            .iter()
            .any(|r| r.contains("Thanksgiving")));
    }

    #[test]
    fn test_late_december_catches_new_year() {
        // Dec 30 is within 3 days of the next year's Jan 1
        assert_eq!(
            near_major_us_holiday("2026-12-30".parse().unwrap(), 3),
            Some("New Year's Day")
        );
    }

    #[test]
    fn test_distance_boost_monotonic_and_capped() {
        let tables = RiskTables::default();
        let mut last = -1.0;
        for km in [0.0, 500.0, 800.0, 2000.0, 3980.0, 8800.0, 15000.0] {
            let b = distance_boost(km, &tables);
            assert!(b >= last, "distance boost must be non-decreasing");
            assert!(b <= tables.distance_boost_max + 1e-12);
            last = b;
        }
        assert!((distance_boost(15000.0, &tables) - tables.distance_boost_max).abs() < 1e-12);
    }

    #[test]
    fn test_clamped_to_unit_interval() {
        // December Friday near Christmas at max distance: pile every boost on
        let est = estimate_delay(&route_on("2026-12-25", 20000.0), &RiskTables::default());
        assert!(est.p <= 1.0);
        assert!(est.p >= 0.0);
    }

    #[test]
    fn test_nth_weekday_thanksgiving_2026() {
        assert_eq!(
            nth_weekday_of_month(2026, 11, Weekday::Thu, 4),
            NaiveDate::from_ymd_opt(2026, 11, 26)
        );
    }

    #[test]
    fn test_last_weekday_memorial_day_2026() {
        assert_eq!(
            last_weekday_of_month(2026, 5, Weekday::Mon),
            NaiveDate::from_ymd_opt(2026, 5, 25)
        );
    }

    #[test]
    fn test_route_context_distance() {
        let route = RouteContext::new(
            resolve_airport("LAX").unwrap(),
            resolve_airport("JFK").unwrap(),
            "2026-02-09".parse().unwrap(),
        );
        assert!((route.distance_km - 3980.0).abs() < 30.0);
    }
}
