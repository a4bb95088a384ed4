//! Standalone delay-risk endpoint.
//!
//! - POST /api/v1/delays
//!
//! The seasonal/weekday/holiday heuristic on its own, with no weather or
//! offer fetch. Purely computed, so the only upstream call is the
//! best-effort summary.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::risk::delay::{estimate_delay, DelayEstimate, RouteContext};
use crate::routes::analyze::AppState;
use crate::services::analysis::{validate_route, RouteQuery, ValidRoute};

#[derive(Debug, Serialize, ToSchema)]
pub struct DelayResponse {
    pub delay: DelayEstimate,
    pub summary: String,
}

/// Delay-risk estimate for a route/date.
#[utoipa::path(
    post,
    path = "/api/v1/delays",
    tag = "Analysis",
    request_body = RouteQuery,
    responses(
        (status = 200, description = "Heuristic delay estimate", body = DelayResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
    )
)]
pub async fn route_delays(
    State(state): State<AppState>,
    Json(query): Json<RouteQuery>,
) -> Result<Json<DelayResponse>, AppError> {
    let route = validate_route(&query.origin, &query.destination, &query.departure_date)?;
    let ctx = RouteContext::new(route.origin, route.destination, route.departure_day);
    let delay = estimate_delay(&ctx, &state.engine.tables);

    let summary = match state
        .engine
        .summarizer
        .summarize(&delay_prompt(&route, &delay))
        .await
    {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(error = %e, "delay summary skipped");
            delay_fallback(&delay)
        }
    };

    Ok(Json(DelayResponse { delay, summary }))
}

fn delay_prompt(route: &ValidRoute, delay: &DelayEstimate) -> String {
    format!(
        "Summarize expected delay risk for this route and date in 2-3 short \
         sentences. Be clear this is an estimate, not real-time data.\n\
         Route: {} -> {} on {}.\n\
         Delay probability: {:.2} ({:?}).\n\
         Signals: {}.",
        route.origin.iata,
        route.destination.iata,
        route.departure_day,
        delay.p,
        delay.level,
        delay.rationale.join("; "),
    )
}

fn delay_fallback(delay: &DelayEstimate) -> String {
    let signals = delay
        .rationale
        .iter()
        .take(2)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Estimated delay risk is {:?} ({:.2}) based on seasonal/weekday/holiday \
         heuristics. Key signals: {}",
        delay.level, delay.p, signals
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::risk::delay::DelayLevel;
    use crate::risk::tables::RiskTables;
    use crate::services::amadeus::AmadeusClient;
    use crate::services::analysis::AnalysisEngine;
    use crate::services::openmeteo::OpenMeteoClient;
    use crate::services::summarize::SummarizerClient;
    use crate::services::watch::WatchRegistry;

    // No live endpoints needed: the estimate is computed locally and the
    // summarizer has no key, so it falls back.
    fn offline_state() -> AppState {
        let cache_ttl = Duration::from_secs(60);
        AppState {
            engine: AnalysisEngine {
                weather: OpenMeteoClient::new(
                    "http://localhost:1/v1/forecast",
                    "http://localhost:1/v1/archive",
                    cache_ttl,
                ),
                offers: AmadeusClient::new("http://localhost:1", None, None, cache_ttl),
                summarizer: SummarizerClient::new("http://localhost:1", None, "gpt-4o-mini"),
                tables: RiskTables::default(),
            },
            watches: WatchRegistry::new(),
            watch_poll_interval: Duration::from_secs(30),
        }
    }

    #[tokio::test]
    async fn test_route_delays_estimates_without_providers() {
        let state = offline_state();
        // 2026-02-09 is a Monday in February: baseline only, no boosts
        let query = RouteQuery {
            origin: "LAX".to_string(),
            destination: "JFK".to_string(),
            departure_date: "2026-02-09".to_string(),
        };

        let Json(response) = route_delays(State(state), Json(query)).await.unwrap();

        assert!((0.0..=1.0).contains(&response.delay.p));
        assert_eq!(response.delay.level, DelayLevel::Medium);
        assert!(!response.delay.rationale.is_empty());
        assert!(response.summary.contains("delay risk"));
    }

    #[tokio::test]
    async fn test_route_delays_rejects_bad_date() {
        let state = offline_state();
        let query = RouteQuery {
            origin: "LAX".to_string(),
            destination: "JFK".to_string(),
            departure_date: "02/09/2026".to_string(),
        };

        let err = route_delays(State(state), Json(query)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }
}
