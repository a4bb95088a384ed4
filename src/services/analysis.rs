//! Analysis pipeline.
//!
//! Glues the provider clients to the scoring core: validate the request,
//! fetch weather for both ends in parallel, estimate delay, search offers
//! (retrying without the nonstop filter when that search comes back empty),
//! score and rank, keep the top options, and attach an optional
//! plain-language summary. The summary is best-effort; everything else is
//! required and fails the request with a typed error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::airports::{resolve_airport, Airport};
use crate::errors::AppError;
use crate::risk::blend::{score_offer, RiskAssessment};
use crate::risk::delay::{estimate_delay, DelayEstimate, RouteContext};
use crate::risk::rank::{rank_offers, Preference, ScoredOffer};
use crate::risk::tables::RiskTables;
use crate::risk::weather::route_weather_probability;
use crate::services::amadeus::{build_google_flights_link, AmadeusClient, FlightOffer};
use crate::services::openmeteo::{DailyWeather, OpenMeteoClient};
use crate::services::summarize::SummarizerClient;

/// How many ranked options an analysis returns.
const MAX_RANKED_FLIGHTS: usize = 5;

fn default_adults() -> u32 {
    1
}

fn default_travel_class() -> String {
    "ECONOMY".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_max_results() -> u32 {
    25
}

fn default_prefer_nonstop() -> bool {
    true
}

/// Body of `POST /api/v1/analyze` (also embedded in watch requests).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// Origin IATA code, e.g. "LAX"
    pub origin: String,
    /// Destination IATA code, e.g. "JFK"
    pub destination: String,
    /// Departure date, YYYY-MM-DD
    pub departure_date: String,
    #[serde(default = "default_adults")]
    pub adults: u32,
    #[serde(default = "default_travel_class")]
    pub travel_class: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub preference: Preference,
    /// Provider-side result cap, 1..=250.
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default = "default_prefer_nonstop")]
    pub prefer_nonstop: bool,
}

/// A validated request with airports resolved and the date parsed.
#[derive(Debug, Clone)]
pub struct ValidRequest {
    pub origin: &'static Airport,
    pub destination: &'static Airport,
    pub departure_day: NaiveDate,
    pub adults: u32,
    pub travel_class: String,
    pub currency: String,
    pub preference: Preference,
    pub max_results: u32,
    pub prefer_nonstop: bool,
}

/// Body of the standalone weather and delay endpoints: just a route and a
/// date.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RouteQuery {
    /// Origin IATA code, e.g. "LAX"
    pub origin: String,
    /// Destination IATA code, e.g. "JFK"
    pub destination: String,
    /// Departure date, YYYY-MM-DD
    pub departure_date: String,
}

/// A validated route: airports resolved, date parsed.
#[derive(Debug, Clone)]
pub struct ValidRoute {
    pub origin: &'static Airport,
    pub destination: &'static Airport,
    pub departure_day: NaiveDate,
}

pub fn validate_route(
    origin: &str,
    destination: &str,
    departure_date: &str,
) -> Result<ValidRoute, AppError> {
    let origin = require_airport(origin)?;
    let destination = require_airport(destination)?;
    if origin.iata == destination.iata {
        return Err(AppError::InvalidRequest(
            "Origin and destination must differ".to_string(),
        ));
    }

    let departure_day = NaiveDate::parse_from_str(departure_date, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidRequest("departure_date must be YYYY-MM-DD".to_string()))?;

    Ok(ValidRoute {
        origin,
        destination,
        departure_day,
    })
}

/// Validate before any provider call: malformed input never reaches the
/// network.
pub fn validate_request(req: &AnalyzeRequest) -> Result<ValidRequest, AppError> {
    let route = validate_route(&req.origin, &req.destination, &req.departure_date)?;

    if !(1..=9).contains(&req.adults) {
        return Err(AppError::InvalidRequest(
            "adults must be between 1 and 9".to_string(),
        ));
    }

    if !(1..=250).contains(&req.max_results) {
        return Err(AppError::InvalidRequest(
            "max_results must be between 1 and 250".to_string(),
        ));
    }

    let currency = req.currency.trim().to_ascii_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::InvalidRequest(format!(
            "currency must be a 3-letter code, got {:?}",
            req.currency
        )));
    }

    Ok(ValidRequest {
        origin: route.origin,
        destination: route.destination,
        departure_day: route.departure_day,
        adults: req.adults,
        travel_class: req.travel_class.trim().to_ascii_uppercase(),
        currency,
        preference: req.preference,
        max_results: req.max_results,
        prefer_nonstop: req.prefer_nonstop,
    })
}

fn require_airport(code: &str) -> Result<&'static Airport, AppError> {
    let trimmed = code.trim();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::InvalidRequest(format!(
            "Airport code must be 3 letters, got {:?}",
            code
        )));
    }
    resolve_airport(trimmed)
        .ok_or_else(|| AppError::InvalidRequest(format!("Unknown airport code: {}", trimmed)))
}

/// Weather for one end of the route, as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AirportWeatherReport {
    pub airport: Airport,
    pub daily: DailyWeather,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RouteWeatherReport {
    pub origin: AirportWeatherReport,
    pub destination: AirportWeatherReport,
}

/// One ranked option: the provider offer plus our assessment.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalyzedFlight {
    #[serde(flatten)]
    pub offer: FlightOffer,
    pub purchase_link: String,
    pub risk: RiskAssessment,
}

/// Response of `POST /api/v1/analyze`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalysisResponse {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub preference: Preference,
    pub weather: RouteWeatherReport,
    pub delay: DelayEstimate,
    /// Ranked best-first, at most five entries.
    pub flights: Vec<AnalyzedFlight>,
    /// Plain-language overview; absent when the summarizer is unavailable.
    pub summary: Option<String>,
}

/// Everything one watch tick or analysis pass needs from the providers.
pub struct RouteInputs {
    pub origin_weather: DailyWeather,
    pub destination_weather: DailyWeather,
    pub delay: DelayEstimate,
    pub offers: Vec<FlightOffer>,
}

/// Owns the provider clients and the scoring configuration.
#[derive(Clone)]
pub struct AnalysisEngine {
    pub weather: OpenMeteoClient,
    pub offers: AmadeusClient,
    pub summarizer: SummarizerClient,
    pub tables: RiskTables,
}

impl AnalysisEngine {
    /// Fetch the daily observation for both ends of a route concurrently.
    pub async fn fetch_weather_pair(
        &self,
        origin: &Airport,
        destination: &Airport,
        day: NaiveDate,
    ) -> Result<(DailyWeather, DailyWeather), AppError> {
        let (origin_weather, destination_weather) = futures::join!(
            self.weather.fetch_daily(origin.lat, origin.lon, day),
            self.weather.fetch_daily(destination.lat, destination.lon, day),
        );
        Ok((origin_weather?, destination_weather?))
    }

    /// Search offers with the caller's filters.
    ///
    /// A nonstop-preferred search that finds nothing is retried once
    /// without the filter; a still-empty offer set is `DataUnavailable`.
    pub async fn fetch_offers(&self, req: &ValidRequest) -> Result<Vec<FlightOffer>, AppError> {
        let mut offers = self
            .offers
            .search_offers(
                req.origin.iata,
                req.destination.iata,
                req.departure_day,
                req.adults,
                &req.travel_class,
                &req.currency,
                req.max_results,
                req.prefer_nonstop,
            )
            .await?;
        if offers.is_empty() && req.prefer_nonstop {
            tracing::debug!(
                origin = req.origin.iata,
                destination = req.destination.iata,
                "no nonstop offers, retrying without the filter"
            );
            offers = self
                .offers
                .search_offers(
                    req.origin.iata,
                    req.destination.iata,
                    req.departure_day,
                    req.adults,
                    &req.travel_class,
                    &req.currency,
                    req.max_results,
                    false,
                )
                .await?;
        }
        if offers.is_empty() {
            return Err(AppError::DataUnavailable(format!(
                "No flight offers found for {} -> {} on {}",
                req.origin.iata, req.destination.iata, req.departure_day
            )));
        }
        Ok(offers)
    }

    /// Fetch weather for both ends, the delay estimate, and the offer set.
    pub async fn fetch_route_inputs(&self, req: &ValidRequest) -> Result<RouteInputs, AppError> {
        let (origin_weather, destination_weather) = self
            .fetch_weather_pair(req.origin, req.destination, req.departure_day)
            .await?;

        let route = RouteContext::new(req.origin, req.destination, req.departure_day);
        let delay = estimate_delay(&route, &self.tables);

        let offers = self.fetch_offers(req).await?;

        Ok(RouteInputs {
            origin_weather,
            destination_weather,
            delay,
            offers,
        })
    }

    /// Score every offer against the shared route inputs and rank them.
    pub fn score_and_rank(&self, inputs: &RouteInputs, preference: Preference) -> Vec<ScoredOffer> {
        let weather = route_weather_probability(
            &inputs.origin_weather,
            &inputs.destination_weather,
            &self.tables,
        );
        let scored: Vec<ScoredOffer> = inputs
            .offers
            .iter()
            .map(|offer| ScoredOffer {
                offer: offer.clone(),
                assessment: score_offer(offer, &weather, &inputs.delay, &self.tables),
            })
            .collect();
        rank_offers(scored, preference)
    }

    /// Run the full pipeline for one request.
    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResponse, AppError> {
        let req = validate_request(request)?;
        let inputs = self.fetch_route_inputs(&req).await?;

        let ranked = self.score_and_rank(&inputs, req.preference);
        let purchase_link = build_google_flights_link(
            req.origin.iata,
            req.destination.iata,
            req.departure_day,
            req.adults,
        );
        let flights: Vec<AnalyzedFlight> = ranked
            .into_iter()
            .take(MAX_RANKED_FLIGHTS)
            .map(|s| AnalyzedFlight {
                offer: s.offer,
                purchase_link: purchase_link.clone(),
                risk: s.assessment,
            })
            .collect();

        let summary = match self
            .summarizer
            .summarize(&summary_prompt(&req, &inputs, &flights))
            .await
        {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!(error = %e, "summary skipped");
                None
            }
        };

        Ok(AnalysisResponse {
            origin: req.origin.iata.to_string(),
            destination: req.destination.iata.to_string(),
            departure_date: req.departure_day,
            preference: req.preference,
            weather: RouteWeatherReport {
                origin: AirportWeatherReport {
                    airport: req.origin.clone(),
                    daily: inputs.origin_weather.clone(),
                },
                destination: AirportWeatherReport {
                    airport: req.destination.clone(),
                    daily: inputs.destination_weather.clone(),
                },
            },
            delay: inputs.delay.clone(),
            flights,
            summary,
        })
    }
}

fn summary_prompt(req: &ValidRequest, inputs: &RouteInputs, flights: &[AnalyzedFlight]) -> String {
    let options: Vec<String> = flights
        .iter()
        .map(|f| {
            format!(
                "{} {} {} stops {} {} risk {}/100 ({:?}) drivers: {}",
                f.offer.primary_carrier,
                f.offer.duration,
                f.offer.stops,
                f.offer.price_total,
                f.offer.currency,
                f.risk.risk_score,
                f.risk.risk_level,
                f.risk.drivers.join(", ")
            )
        })
        .collect();
    format!(
        "Trip: {} -> {} on {}.\n\
         Departure weather: {} (wind up to {:?} mph).\n\
         Arrival weather: {} (wind up to {:?} mph).\n\
         Delay estimate: {:.2} ({:?}).\n\
         Ranked options:\n{}",
        req.origin.iata,
        req.destination.iata,
        req.departure_day,
        inputs.origin_weather.condition,
        inputs.origin_weather.wind_speed_max_mph,
        inputs.destination_weather.condition,
        inputs.destination_weather.wind_speed_max_mph,
        inputs.delay.p,
        inputs.delay.level,
        options.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(origin: &str, destination: &str, date: &str, adults: u32) -> AnalyzeRequest {
        AnalyzeRequest {
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_date: date.to_string(),
            adults,
            travel_class: "ECONOMY".to_string(),
            currency: "USD".to_string(),
            preference: Preference::Balanced,
            max_results: 25,
            prefer_nonstop: true,
        }
    }

    #[test]
    fn test_validate_accepts_lowercase_codes() {
        let valid = validate_request(&request("lax", "jfk", "2026-02-09", 2)).unwrap();
        assert_eq!(valid.origin.iata, "LAX");
        assert_eq!(valid.destination.iata, "JFK");
        assert_eq!(valid.departure_day, NaiveDate::from_ymd_opt(2026, 2, 9).unwrap());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        // malformed code
        assert!(matches!(
            validate_request(&request("LAXX", "JFK", "2026-02-09", 1)),
            Err(AppError::InvalidRequest(_))
        ));
        // unknown airport
        assert!(matches!(
            validate_request(&request("ZZZ", "JFK", "2026-02-09", 1)),
            Err(AppError::InvalidRequest(_))
        ));
        // same ends
        assert!(matches!(
            validate_request(&request("JFK", "JFK", "2026-02-09", 1)),
            Err(AppError::InvalidRequest(_))
        ));
        // bad date
        assert!(matches!(
            validate_request(&request("LAX", "JFK", "02/09/2026", 1)),
            Err(AppError::InvalidRequest(_))
        ));
        // adults out of range
        assert!(matches!(
            validate_request(&request("LAX", "JFK", "2026-02-09", 0)),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(
            validate_request(&request("LAX", "JFK", "2026-02-09", 10)),
            Err(AppError::InvalidRequest(_))
        ));
        // max_results out of range
        let mut oversized = request("LAX", "JFK", "2026-02-09", 1);
        oversized.max_results = 251;
        assert!(matches!(
            validate_request(&oversized),
            Err(AppError::InvalidRequest(_))
        ));
        // malformed currency
        let mut bad_currency = request("LAX", "JFK", "2026-02-09", 1);
        bad_currency.currency = "DOLLARS".to_string();
        assert!(matches!(
            validate_request(&bad_currency),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_validate_normalizes_currency_and_class() {
        let mut req = request("LAX", "JFK", "2026-02-09", 1);
        req.currency = "usd".to_string();
        req.travel_class = "business".to_string();
        let valid = validate_request(&req).unwrap();
        assert_eq!(valid.currency, "USD");
        assert_eq!(valid.travel_class, "BUSINESS");
    }

    fn weather_body(code: i32, wind: f64, precip_prob: f64) -> serde_json::Value {
        serde_json::json!({
            "daily": {
                "weather_code": [code],
                "temperature_2m_max": [50.0],
                "temperature_2m_min": [35.0],
                "precipitation_probability_max": [precip_prob],
                "wind_speed_10m_max": [wind]
            }
        })
    }

    fn offer_body(id: &str, total: &str, duration: &str, segments: usize) -> serde_json::Value {
        let segs: Vec<serde_json::Value> = (0..segments)
            .map(|_| {
                serde_json::json!({
                    "carrierCode": "DL",
                    "departure": {"iataCode": "LAX", "at": "2026-02-09T08:00:00"},
                    "arrival": {"iataCode": "JFK", "at": "2026-02-09T16:55:00"}
                })
            })
            .collect();
        serde_json::json!({
            "id": id,
            "price": {"total": total, "currency": "USD"},
            "itineraries": [{"duration": duration, "segments": segs}]
        })
    }

    async fn engine_against(server: &MockServer) -> AnalysisEngine {
        let cache_ttl = std::time::Duration::from_secs(60);
        AnalysisEngine {
            weather: OpenMeteoClient::new(
                &format!("{}/v1/forecast", server.uri()),
                &format!("{}/v1/archive", server.uri()),
                cache_ttl,
            ),
            offers: AmadeusClient::new(
                &server.uri(),
                Some("id".to_string()),
                Some("secret".to_string()),
                cache_ttl,
            ),
            summarizer: SummarizerClient::new(&server.uri(), None, "gpt-4o-mini"),
            tables: RiskTables::default(),
        }
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/security/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok", "expires_in": 1799
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_analyze_ranks_and_degrades_without_summarizer() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(weather_body(2, 10.0, 5.0)))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v2/shopping/flight-offers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    offer_body("cheap-nonstop", "380.00", "PT5H55M", 1),
                    offer_body("pricey-nonstop", "520.00", "PT5H40M", 1)
                ]
            })))
            .mount(&server)
            .await;

        let engine = engine_against(&server).await;
        let day = Utc::now().date_naive() + Duration::days(5);
        let response = engine
            .analyze(&request("LAX", "JFK", &day.format("%Y-%m-%d").to_string(), 1))
            .await
            .unwrap();

        assert_eq!(response.origin, "LAX");
        assert_eq!(response.flights.len(), 2);
        // Same weather/stops/duration bands: the cheaper offer ranks first
        assert_eq!(response.flights[0].offer.id, "cheap-nonstop");
        assert!(response.flights[0]
            .purchase_link
            .starts_with("https://www.google.com/travel/flights"));
        // No summarizer key configured: analysis still succeeds
        assert!(response.summary.is_none());
    }

    #[tokio::test]
    async fn test_analyze_retries_without_nonstop_filter() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(weather_body(0, 5.0, 0.0)))
            .mount(&server)
            .await;

        // Nonstop search is empty; unfiltered search finds a one-stop.
        Mock::given(method("GET"))
            .and(path("/v2/shopping/flight-offers"))
            .and(query_param("nonStop", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/shopping/flight-offers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [offer_body("one-stop", "300.00", "PT7H40M", 2)]
            })))
            .mount(&server)
            .await;

        let engine = engine_against(&server).await;
        let day = Utc::now().date_naive() + Duration::days(5);
        let response = engine
            .analyze(&request("SFO", "BOS", &day.format("%Y-%m-%d").to_string(), 1))
            .await
            .unwrap();

        assert_eq!(response.flights.len(), 1);
        assert_eq!(response.flights[0].offer.stops, 1);
    }

    #[tokio::test]
    async fn test_analyze_empty_offers_is_data_unavailable() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(weather_body(0, 5.0, 0.0)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/shopping/flight-offers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let engine = engine_against(&server).await;
        let day = Utc::now().date_naive() + Duration::days(5);
        let err = engine
            .analyze(&request("LAX", "JFK", &day.format("%Y-%m-%d").to_string(), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }
}
