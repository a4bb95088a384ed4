//! Open-Meteo daily weather client.
//!
//! Fetches one daily observation/forecast per airport per date. Dates
//! within the forecast horizon (~2 weeks) use the forecast endpoint;
//! anything further out falls back to the historical archive, and the
//! result carries a `source` tag so the UI can label it. The tag is for
//! display only; scoring never branches on it.
//!
//! Observations are cached per location/date so watch ticks polling the
//! same route don't re-fetch every interval.
//!
//! See: https://open-meteo.com/en/docs

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::services::cache::TtlCache;

/// How many days ahead the forecast endpoint covers.
const MAX_FORECAST_DAYS: i64 = 14;

/// Whether an observation came from a forecast or the historical archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WeatherSource {
    Forecast,
    Historical,
}

/// One airport, one calendar date. Immutable once fetched.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailyWeather {
    pub source: WeatherSource,
    pub day: NaiveDate,
    /// WMO weather code (provider enumeration).
    pub weather_code: Option<i32>,
    /// Human-readable condition for the code.
    pub condition: String,
    pub temp_max_f: Option<f64>,
    pub temp_min_f: Option<f64>,
    /// Max precipitation probability in percent (forecast data).
    pub precipitation_probability_max: Option<f64>,
    /// Precipitation sum in mm (archive data).
    pub precipitation_sum_mm: Option<f64>,
    pub wind_speed_max_mph: Option<f64>,
}

/// Pick forecast vs. historical mode for a target date.
pub fn choose_weather_source(target_day: NaiveDate, today: NaiveDate) -> WeatherSource {
    if target_day >= today && (target_day - today).num_days() <= MAX_FORECAST_DAYS {
        WeatherSource::Forecast
    } else {
        WeatherSource::Historical
    }
}

/// Human-readable name for a WMO weather code.
pub fn condition_name(code: Option<i32>) -> &'static str {
    match code {
        Some(0) => "Clear sky",
        Some(1) => "Mainly clear",
        Some(2) => "Partly cloudy",
        Some(3) => "Overcast",
        Some(45) => "Fog",
        Some(48) => "Depositing rime fog",
        Some(51) => "Light drizzle",
        Some(53) => "Moderate drizzle",
        Some(55) => "Dense drizzle",
        Some(56) => "Light freezing drizzle",
        Some(57) => "Dense freezing drizzle",
        Some(61) => "Slight rain",
        Some(63) => "Moderate rain",
        Some(65) => "Heavy rain",
        Some(66) => "Light freezing rain",
        Some(67) => "Heavy freezing rain",
        Some(71) => "Slight snow",
        Some(73) => "Moderate snow",
        Some(75) => "Heavy snow",
        Some(77) => "Snow grains",
        Some(80) => "Slight rain showers",
        Some(81) => "Moderate rain showers",
        Some(82) => "Violent rain showers",
        Some(85) => "Slight snow showers",
        Some(86) => "Heavy snow showers",
        Some(95) => "Thunderstorm",
        Some(96) => "Thunderstorm with slight hail",
        Some(99) => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}

// --- Open-Meteo JSON response types ---

#[derive(Debug, Deserialize)]
struct OmResponse {
    daily: Option<OmDaily>,
}

#[derive(Debug, Deserialize, Default)]
struct OmDaily {
    #[serde(default)]
    weather_code: Vec<Option<i32>>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability_max: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m_max: Vec<Option<f64>>,
}

fn first<T: Copy>(values: &[Option<T>]) -> Option<T> {
    values.first().copied().flatten()
}

/// Client for the Open-Meteo forecast and archive APIs.
#[derive(Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    forecast_url: String,
    archive_url: String,
    cache: Arc<TtlCache<DailyWeather>>,
}

impl OpenMeteoClient {
    pub fn new(forecast_url: &str, archive_url: &str, cache_ttl: Duration) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            forecast_url: forecast_url.to_string(),
            archive_url: archive_url.to_string(),
            cache: Arc::new(TtlCache::new(cache_ttl, 256)),
        }
    }

    /// Fetch the daily observation for one location/date.
    ///
    /// Requests Fahrenheit and mph so no unit conversion happens on our
    /// side. A response without a usable daily block fails with
    /// `DataUnavailable`, never a silent default.
    pub async fn fetch_daily(
        &self,
        lat: f64,
        lon: f64,
        day: NaiveDate,
    ) -> Result<DailyWeather, AppError> {
        let cache_key = format!("wx:{:.4}:{:.4}:{}", lat, lon, day);
        if let Some(weather) = self.cache.get(&cache_key) {
            return Ok(weather);
        }

        let source = choose_weather_source(day, Utc::now().date_naive());

        let (url, daily_fields) = match source {
            WeatherSource::Forecast => (
                &self.forecast_url,
                "weather_code,temperature_2m_max,temperature_2m_min,precipitation_probability_max,wind_speed_10m_max",
            ),
            WeatherSource::Historical => (
                &self.archive_url,
                "weather_code,temperature_2m_max,temperature_2m_min,precipitation_sum,wind_speed_10m_max",
            ),
        };

        let day_str = day.format("%Y-%m-%d").to_string();
        let response = self
            .client
            .get(url)
            .query(&[
                ("latitude", format!("{:.4}", lat).as_str()),
                ("longitude", format!("{:.4}", lon).as_str()),
                ("timezone", "auto"),
                ("start_date", day_str.as_str()),
                ("end_date", day_str.as_str()),
                ("daily", daily_fields),
                ("temperature_unit", "fahrenheit"),
                ("wind_speed_unit", "mph"),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Open-Meteo request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Open-Meteo returned HTTP {}",
                response.status()
            )));
        }

        let payload: OmResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Open-Meteo JSON parse error: {}", e))
        })?;

        let daily = payload.daily.ok_or_else(|| {
            AppError::DataUnavailable(format!("No weather data for {}", day))
        })?;

        let weather_code = first(&daily.weather_code);
        if weather_code.is_none() && first(&daily.temperature_2m_max).is_none() {
            return Err(AppError::DataUnavailable(format!(
                "Empty weather observation for {}",
                day
            )));
        }

        let weather = DailyWeather {
            source,
            day,
            weather_code,
            condition: condition_name(weather_code).to_string(),
            temp_max_f: first(&daily.temperature_2m_max),
            temp_min_f: first(&daily.temperature_2m_min),
            precipitation_probability_max: first(&daily.precipitation_probability_max),
            precipitation_sum_mm: first(&daily.precipitation_sum),
            wind_speed_max_mph: first(&daily.wind_speed_10m_max),
        };
        self.cache.set(&cache_key, weather.clone());
        Ok(weather)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_against(server: &MockServer) -> OpenMeteoClient {
        OpenMeteoClient::new(
            &format!("{}/v1/forecast", server.uri()),
            &format!("{}/v1/archive", server.uri()),
            std::time::Duration::from_secs(60),
        )
    }

    #[test]
    fn test_choose_weather_source() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert_eq!(choose_weather_source(today, today), WeatherSource::Forecast);
        assert_eq!(
            choose_weather_source(today + Duration::days(14), today),
            WeatherSource::Forecast
        );
        assert_eq!(
            choose_weather_source(today + Duration::days(15), today),
            WeatherSource::Historical
        );
        assert_eq!(
            choose_weather_source(today - Duration::days(1), today),
            WeatherSource::Historical
        );
    }

    #[test]
    fn test_condition_name() {
        assert_eq!(condition_name(Some(0)), "Clear sky");
        assert_eq!(condition_name(Some(95)), "Thunderstorm");
        assert_eq!(condition_name(Some(12345)), "Unknown");
        assert_eq!(condition_name(None), "Unknown");
    }

    #[tokio::test]
    async fn test_fetch_daily_forecast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("temperature_unit", "fahrenheit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "daily": {
                    "time": ["2026-02-09"],
                    "weather_code": [95],
                    "temperature_2m_max": [48.0],
                    "temperature_2m_min": [37.5],
                    "precipitation_probability_max": [80.0],
                    "wind_speed_10m_max": [38.0]
                }
            })))
            .mount(&server)
            .await;

        let client = client_against(&server);

        // A date inside the forecast horizon routes to the forecast endpoint
        let day = Utc::now().date_naive() + Duration::days(3);
        let weather = client.fetch_daily(40.6413, -73.7781, day).await.unwrap();

        assert_eq!(weather.source, WeatherSource::Forecast);
        assert_eq!(weather.weather_code, Some(95));
        assert_eq!(weather.condition, "Thunderstorm");
        assert_eq!(weather.wind_speed_max_mph, Some(38.0));
        assert_eq!(weather.precipitation_probability_max, Some(80.0));
        assert_eq!(weather.precipitation_sum_mm, None);
    }

    #[tokio::test]
    async fn test_fetch_daily_archive_for_far_dates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/archive"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "daily": {
                    "time": ["2026-08-01"],
                    "weather_code": [3],
                    "temperature_2m_max": [88.0],
                    "temperature_2m_min": [70.0],
                    "precipitation_sum": [0.0],
                    "wind_speed_10m_max": [12.0]
                }
            })))
            .mount(&server)
            .await;

        let client = client_against(&server);

        let day = Utc::now().date_naive() + Duration::days(60);
        let weather = client.fetch_daily(33.9416, -118.4085, day).await.unwrap();

        assert_eq!(weather.source, WeatherSource::Historical);
        assert_eq!(weather.condition, "Overcast");
        assert_eq!(weather.precipitation_sum_mm, Some(0.0));
    }

    #[tokio::test]
    async fn test_fetch_daily_caches_repeated_lookups() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "daily": {
                    "time": ["2026-02-09"],
                    "weather_code": [2],
                    "temperature_2m_max": [55.0],
                    "temperature_2m_min": [40.0],
                    "precipitation_probability_max": [10.0],
                    "wind_speed_10m_max": [14.0]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_against(&server);
        let day = Utc::now().date_naive() + Duration::days(3);

        let fresh = client.fetch_daily(40.6413, -73.7781, day).await.unwrap();
        // Same location/date again: served from the cache (the mock expects
        // exactly one upstream call).
        let cached = client.fetch_daily(40.6413, -73.7781, day).await.unwrap();

        assert_eq!(fresh.weather_code, cached.weather_code);
        assert_eq!(fresh.condition, cached.condition);
        assert_eq!(cached.wind_speed_max_mph, Some(14.0));
    }

    #[tokio::test]
    async fn test_missing_daily_block_is_data_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = client_against(&server);

        let day = Utc::now().date_naive() + Duration::days(1);
        let err = client.fetch_daily(40.0, -73.0, day).await.unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }

    #[tokio::test]
    async fn test_upstream_error_is_external_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_against(&server);

        let day = Utc::now().date_naive() + Duration::days(1);
        let err = client.fetch_daily(40.0, -73.0, day).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalServiceError(_)));
    }
}
