//! Itinerary structure risk factors: connections and total duration.

use crate::risk::tables::{clamp01, RiskTables};

/// Missed-connection exposure as a step function of stop count.
///
/// Nonstop sits at a low floor; the first connection is a meaningful jump;
/// each further connection stacks. Strictly non-decreasing in stops.
pub fn connection_probability(stops: u32, tables: &RiskTables) -> f64 {
    if stops == 0 {
        return tables.connection_floor;
    }
    clamp01(tables.connection_first_stop + tables.connection_per_extra_stop * (stops - 1) as f64)
}

/// Upstream-delay exposure as a banded function of total duration.
///
/// Longer itineraries sit later in the day and accumulate more upstream
/// exposure. Strictly non-decreasing in minutes.
pub fn duration_probability(minutes: u32, tables: &RiskTables) -> f64 {
    for &(upper, p) in &tables.duration_bands {
        if minutes < upper {
            return p;
        }
    }
    tables.duration_ceiling
}
