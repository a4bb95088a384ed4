//! Built-in airport lookup.
//!
//! A small fixed table of major US airports keeps the demo self-contained.
//! Unknown codes are rejected as `InvalidRequest` by the callers; swapping
//! in a real airport database only touches this module.

use serde::Serialize;
use utoipa::ToSchema;

/// An airport with the coordinates needed for weather lookups and
/// great-circle distance.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Airport {
    /// IATA code (e.g. "JFK")
    pub iata: &'static str,
    /// Full airport name
    pub name: &'static str,
    /// City served
    pub city: &'static str,
    /// Latitude (WGS84)
    pub lat: f64,
    /// Longitude (WGS84)
    pub lon: f64,
}

const AIRPORTS: &[Airport] = &[
    Airport { iata: "JFK", name: "John F. Kennedy International", city: "New York", lat: 40.6413, lon: -73.7781 },
    Airport { iata: "LAX", name: "Los Angeles International", city: "Los Angeles", lat: 33.9416, lon: -118.4085 },
    Airport { iata: "SFO", name: "San Francisco International", city: "San Francisco", lat: 37.6213, lon: -122.3790 },
    Airport { iata: "ORD", name: "O'Hare International", city: "Chicago", lat: 41.9742, lon: -87.9073 },
    Airport { iata: "ATL", name: "Hartsfield-Jackson Atlanta International", city: "Atlanta", lat: 33.6407, lon: -84.4277 },
    Airport { iata: "DFW", name: "Dallas/Fort Worth International", city: "Dallas", lat: 32.8998, lon: -97.0403 },
    Airport { iata: "DEN", name: "Denver International", city: "Denver", lat: 39.8561, lon: -104.6737 },
    Airport { iata: "SEA", name: "Seattle-Tacoma International", city: "Seattle", lat: 47.4502, lon: -122.3088 },
    Airport { iata: "MIA", name: "Miami International", city: "Miami", lat: 25.7959, lon: -80.2870 },
    Airport { iata: "BOS", name: "Logan International", city: "Boston", lat: 42.3656, lon: -71.0096 },
];

/// Resolve an IATA code against the built-in table.
///
/// Case-insensitive; returns `None` for unknown or malformed codes.
pub fn resolve_airport(iata: &str) -> Option<&'static Airport> {
    let code = iata.trim().to_ascii_uppercase();
    if code.len() != 3 {
        return None;
    }
    AIRPORTS.iter().find(|a| a.iata == code)
}

/// Great-circle distance between two coordinates in kilometres (haversine).
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_airport() {
        let jfk = resolve_airport("JFK").unwrap();
        assert_eq!(jfk.city, "New York");
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert!(resolve_airport("lax").is_some());
        assert!(resolve_airport(" sfo ").is_some());
    }

    #[test]
    fn test_resolve_unknown_airport() {
        assert!(resolve_airport("ZZZ").is_none());
    }

    #[test]
    fn test_resolve_malformed_code() {
        assert!(resolve_airport("").is_none());
        assert!(resolve_airport("JFKX").is_none());
    }

    #[test]
    fn test_haversine_lax_jfk() {
        // LAX → JFK is roughly 3980 km
        let d = haversine_km(33.9416, -118.4085, 40.6413, -73.7781);
        assert!((d - 3980.0).abs() < 30.0, "LAX-JFK distance off: {}", d);
    }

    #[test]
    fn test_haversine_zero_distance() {
        let d = haversine_km(40.0, -70.0, 40.0, -70.0);
        assert!(d.abs() < 1e-9);
    }
}
