//! Flight-offer search client (Amadeus self-service API).
//!
//! OAuth2 client-credentials token, cached until shortly before expiry,
//! plus the `/v2/shopping/flight-offers` search. Offer parsing is lenient:
//! a malformed offer in the response is skipped, never fatal for the whole
//! search. Results come back sorted by (stops, price) so callers see
//! nonstops first.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::services::cache::TtlCache;

const TOKEN_CACHE_KEY: &str = "amadeus_token";

/// One priced itinerary from the offer search.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FlightOffer {
    pub id: String,
    #[serde(with = "rust_decimal::serde::str")]
    #[schema(value_type = String)]
    pub price_total: Decimal,
    pub currency: String,
    /// ISO-8601 duration as the provider sent it, e.g. "PT5H55M".
    pub duration: String,
    /// Total itinerary duration in minutes, parsed from `duration`.
    pub duration_minutes: u32,
    pub stops: u32,
    pub primary_carrier: String,
    pub departure_at: String,
    pub arrival_at: String,
}

/// Parse an ISO-8601 duration of the form `PT#H#M` (either part optional)
/// into whole minutes. Anything else is `None`.
pub fn parse_duration_minutes(duration: &str) -> Option<u32> {
    let rest = duration.strip_prefix("PT")?;
    if rest.is_empty() {
        return None;
    }
    let mut minutes: u32 = 0;
    let mut digits = String::new();
    for ch in rest.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else {
            let value: u32 = digits.parse().ok()?;
            digits.clear();
            match ch {
                'H' => minutes = minutes.checked_add(value.checked_mul(60)?)?,
                'M' => minutes = minutes.checked_add(value)?,
                _ => return None,
            }
        }
    }
    if !digits.is_empty() {
        return None;
    }
    Some(minutes)
}

/// A shareable search URL as a fallback booking path.
pub fn build_google_flights_link(
    origin: &str,
    destination: &str,
    departure_date: NaiveDate,
    adults: u32,
) -> String {
    let query = format!(
        "Flights from {} to {} on {} for {} adults",
        origin.to_uppercase(),
        destination.to_uppercase(),
        departure_date.format("%Y-%m-%d"),
        adults
    );
    let encoded: String = query
        .chars()
        .map(|c| if c == ' ' { "%20".to_string() } else { c.to_string() })
        .collect();
    format!("https://www.google.com/travel/flights?q={}", encoded)
}

// --- provider JSON response types ---

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

fn parse_offer(raw: &serde_json::Value) -> Option<FlightOffer> {
    let id = raw.get("id")?.as_str()?.to_string();
    let price = raw.get("price")?;
    let price_total: Decimal = price.get("total")?.as_str()?.parse().ok()?;
    let currency = price
        .get("currency")
        .and_then(|c| c.as_str())
        .unwrap_or("USD")
        .to_string();

    let itinerary = raw.get("itineraries")?.as_array()?.first()?;
    let duration = itinerary.get("duration")?.as_str()?.to_string();
    let duration_minutes = parse_duration_minutes(&duration)?;

    let segments = itinerary.get("segments")?.as_array()?;
    if segments.is_empty() {
        return None;
    }
    let first = segments.first()?;
    let last = segments.last()?;

    Some(FlightOffer {
        id,
        price_total,
        currency,
        duration,
        duration_minutes,
        stops: (segments.len() - 1) as u32,
        primary_carrier: first.get("carrierCode")?.as_str()?.to_string(),
        departure_at: first.get("departure")?.get("at")?.as_str()?.to_string(),
        arrival_at: last.get("arrival")?.get("at")?.as_str()?.to_string(),
    })
}

/// Client for the flight-offer provider.
#[derive(Clone)]
pub struct AmadeusClient {
    client: reqwest::Client,
    base_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    token_cache: Arc<TtlCache<String>>,
    offer_cache: Arc<TtlCache<Vec<FlightOffer>>>,
}

impl AmadeusClient {
    /// `offer_cache_ttl` bounds how long a search result is reused; the
    /// token TTL always follows the provider's `expires_in`.
    pub fn new(
        base_url: &str,
        client_id: Option<String>,
        client_secret: Option<String>,
        offer_cache_ttl: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.to_string(),
            client_id,
            client_secret,
            token_cache: Arc::new(TtlCache::new(Duration::from_secs(1770), 4)),
            offer_cache: Arc::new(TtlCache::new(offer_cache_ttl, 128)),
        }
    }

    async fn token(&self) -> Result<String, AppError> {
        if let Some(token) = self.token_cache.get(TOKEN_CACHE_KEY) {
            return Ok(token);
        }

        let (client_id, client_secret) = match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => (id.as_str(), secret.as_str()),
            _ => {
                return Err(AppError::DataUnavailable(
                    "Flight search is not configured (missing provider credentials)".to_string(),
                ))
            }
        };

        let response = self
            .client
            .post(format!("{}/v1/security/oauth2/token", self.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Provider auth request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Provider auth returned HTTP {}",
                response.status()
            )));
        }

        let payload: TokenResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Provider auth parse error: {}", e))
        })?;

        let token = payload.access_token.ok_or_else(|| {
            AppError::ExternalServiceError("Provider auth response had no access_token".to_string())
        })?;

        // Refresh a little early so an in-flight request never carries a
        // token that expires mid-call.
        let expires_in = payload.expires_in.unwrap_or(1800);
        let ttl = Duration::from_secs(expires_in.saturating_sub(30).max(30));
        self.token_cache.set_with_ttl(TOKEN_CACHE_KEY, token.clone(), ttl);

        Ok(token)
    }

    /// Search offers for one origin/destination/date.
    ///
    /// `nonstop_only` maps to the provider's nonStop filter; callers retry
    /// without it when a nonstop search comes back empty.
    #[allow(clippy::too_many_arguments)]
    pub async fn search_offers(
        &self,
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
        adults: u32,
        travel_class: &str,
        currency: &str,
        max_results: u32,
        nonstop_only: bool,
    ) -> Result<Vec<FlightOffer>, AppError> {
        let cache_key = format!(
            "offers:{}:{}:{}:{}:{}:{}:{}:{}",
            origin, destination, departure_date, adults, travel_class, currency, max_results,
            nonstop_only
        );
        if let Some(offers) = self.offer_cache.get(&cache_key) {
            return Ok(offers);
        }

        let token = self.token().await?;

        let date_str = departure_date.format("%Y-%m-%d").to_string();
        let adults_str = adults.to_string();
        let max_str = max_results.to_string();
        let mut params = vec![
            ("originLocationCode", origin),
            ("destinationLocationCode", destination),
            ("departureDate", date_str.as_str()),
            ("adults", adults_str.as_str()),
            ("travelClass", travel_class),
            ("currencyCode", currency),
            ("max", max_str.as_str()),
        ];
        if nonstop_only {
            params.push(("nonStop", "true"));
        }

        let response = self
            .client
            .get(format!("{}/v2/shopping/flight-offers", self.base_url))
            .bearer_auth(&token)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Offer search request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Offer search returned HTTP {}",
                response.status()
            )));
        }

        let payload: OffersResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Offer search parse error: {}", e))
        })?;

        let mut offers: Vec<FlightOffer> =
            payload.data.iter().filter_map(parse_offer).collect();
        offers.sort_by(|a, b| {
            a.stops
                .cmp(&b.stops)
                .then_with(|| a.price_total.cmp(&b.price_total))
        });

        tracing::debug!(
            origin,
            destination,
            count = offers.len(),
            nonstop_only,
            "offer search completed"
        );

        self.offer_cache.set(&cache_key, offers.clone());
        Ok(offers)
    }
}
