//! Standalone price-lookup endpoint.
//!
//! - POST /api/v1/prices
//!
//! Offer search without the risk pipeline: provider-sorted offers with
//! purchase links and a short pricing note. Accepts the same body as the
//! analysis endpoint; the preference field is ignored here since nothing
//! is re-ranked.

use axum::extract::State;
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::routes::analyze::AppState;
use crate::services::amadeus::{build_google_flights_link, FlightOffer};
use crate::services::analysis::{validate_request, AnalyzeRequest, ValidRequest};

/// How many offers a price lookup returns.
const MAX_QUOTED_OFFERS: usize = 10;

/// One quoted offer with its booking link.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OfferQuote {
    #[serde(flatten)]
    pub offer: FlightOffer,
    pub purchase_link: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PricesResponse {
    pub origin: String,
    pub destination: String,
    /// Provider order: nonstops first, then by price.
    pub offers: Vec<OfferQuote>,
    pub summary: String,
}

/// Current offer prices for a route/date.
#[utoipa::path(
    post,
    path = "/api/v1/prices",
    tag = "Analysis",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Offers with purchase links", body = PricesResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 502, description = "Offer data unavailable", body = crate::errors::ErrorResponse),
    )
)]
pub async fn route_prices(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<PricesResponse>, AppError> {
    let req = validate_request(&request)?;
    let offers = state.engine.fetch_offers(&req).await?;

    let purchase_link = build_google_flights_link(
        req.origin.iata,
        req.destination.iata,
        req.departure_day,
        req.adults,
    );
    let quotes: Vec<OfferQuote> = offers
        .into_iter()
        .take(MAX_QUOTED_OFFERS)
        .map(|offer| OfferQuote {
            offer,
            purchase_link: purchase_link.clone(),
        })
        .collect();

    let summary = match state
        .engine
        .summarizer
        .summarize(&prices_prompt(&req, &quotes))
        .await
    {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(error = %e, "prices summary skipped");
            prices_fallback(&req, &quotes)
        }
    };

    Ok(Json(PricesResponse {
        origin: req.origin.iata.to_string(),
        destination: req.destination.iata.to_string(),
        offers: quotes,
        summary,
    }))
}

fn prices_prompt(req: &ValidRequest, quotes: &[OfferQuote]) -> String {
    let lines: Vec<String> = quotes
        .iter()
        .map(|q| {
            format!(
                "{} {} {} stops {} {}",
                q.offer.primary_carrier,
                q.offer.duration,
                q.offer.stops,
                q.offer.price_total,
                q.offer.currency
            )
        })
        .collect();
    format!(
        "Summarize these flight prices in 2-4 short sentences: price range, \
         nonstop availability, and any notable trade-offs.\n\
         Route: {} -> {} on {}.\n\
         Offers:\n{}",
        req.origin.iata,
        req.destination.iata,
        req.departure_day,
        lines.join("\n")
    )
}

fn prices_fallback(req: &ValidRequest, quotes: &[OfferQuote]) -> String {
    let prices: Vec<Decimal> = quotes.iter().map(|q| q.offer.price_total).collect();
    match (prices.iter().min(), prices.iter().max()) {
        (Some(low), Some(high)) => format!(
            "Prices range from about {:.0} to {:.0} {} across the top results.",
            low, high, req.currency
        ),
        _ => "No flight offers found for these inputs.".to_string(),
    }
}
