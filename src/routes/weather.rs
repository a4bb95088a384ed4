//! Standalone route-weather endpoint.
//!
//! - POST /api/v1/weather
//!
//! Same weather data the full analysis uses, without the offer search:
//! both airports' daily observations plus a short narrative. Unlike the
//! analysis summary, the narrative is always present; when the summarizer
//! is unavailable it falls back to a canned line built from the readings.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::helpers::fmt_reading;
use crate::routes::analyze::AppState;
use crate::services::analysis::{validate_route, AirportWeatherReport, RouteQuery, ValidRoute};
use crate::services::openmeteo::DailyWeather;

#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherResponse {
    pub origin: AirportWeatherReport,
    pub destination: AirportWeatherReport,
    pub summary: String,
}

/// Weather outlook for both ends of a route.
#[utoipa::path(
    post,
    path = "/api/v1/weather",
    tag = "Analysis",
    request_body = RouteQuery,
    responses(
        (status = 200, description = "Daily weather for both airports", body = WeatherResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 502, description = "Weather data unavailable", body = crate::errors::ErrorResponse),
    )
)]
pub async fn route_weather(
    State(state): State<AppState>,
    Json(query): Json<RouteQuery>,
) -> Result<Json<WeatherResponse>, AppError> {
    let route = validate_route(&query.origin, &query.destination, &query.departure_date)?;
    let (origin_weather, destination_weather) = state
        .engine
        .fetch_weather_pair(route.origin, route.destination, route.departure_day)
        .await?;

    let summary = match state
        .engine
        .summarizer
        .summarize(&weather_prompt(&route, &origin_weather, &destination_weather))
        .await
    {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(error = %e, "weather summary skipped");
            weather_fallback(&route, &origin_weather, &destination_weather)
        }
    };

    Ok(Json(WeatherResponse {
        origin: AirportWeatherReport {
            airport: route.origin.clone(),
            daily: origin_weather,
        },
        destination: AirportWeatherReport {
            airport: route.destination.clone(),
            daily: destination_weather,
        },
        summary,
    }))
}

fn weather_prompt(route: &ValidRoute, origin: &DailyWeather, destination: &DailyWeather) -> String {
    format!(
        "Summarize flight-relevant weather for this trip in 2-4 short sentences. \
         Mention anything that could cause disruption.\n\
         Departure: {} ({}) on {}: {}, high {} F, wind up to {} mph, \
         precip probability {} %.\n\
         Arrival: {} ({}): {}, high {} F, wind up to {} mph, \
         precip probability {} %.",
        route.origin.name,
        route.origin.iata,
        route.departure_day,
        origin.condition,
        fmt_reading(origin.temp_max_f),
        fmt_reading(origin.wind_speed_max_mph),
        fmt_reading(origin.precipitation_probability_max),
        route.destination.name,
        route.destination.iata,
        destination.condition,
        fmt_reading(destination.temp_max_f),
        fmt_reading(destination.wind_speed_max_mph),
        fmt_reading(destination.precipitation_probability_max),
    )
}

fn weather_fallback(
    route: &ValidRoute,
    origin: &DailyWeather,
    destination: &DailyWeather,
) -> String {
    format!(
        "Departure ({}) looks like {} with highs around {} F and winds up to {} mph. \
         Arrival ({}) looks like {} with highs around {} F and winds up to {} mph.",
        route.origin.iata,
        origin.condition,
        fmt_reading(origin.temp_max_f),
        fmt_reading(origin.wind_speed_max_mph),
        route.destination.iata,
        destination.condition,
        fmt_reading(destination.temp_max_f),
        fmt_reading(destination.wind_speed_max_mph),
    )
}
