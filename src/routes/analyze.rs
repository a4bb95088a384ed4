//! Analysis HTTP endpoint.
//!
//! - POST /api/v1/analyze

use std::time::Duration;

use axum::extract::State;
use axum::Json;

use crate::errors::AppError;
use crate::services::analysis::{AnalysisEngine, AnalysisResponse, AnalyzeRequest};
use crate::services::watch::WatchRegistry;

/// Shared application state for analysis and watch endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) engine: AnalysisEngine,
    pub(crate) watches: WatchRegistry,
    pub(crate) watch_poll_interval: Duration,
}

/// Analyze a route and rank flight options.
///
/// Fetches weather for both airports, estimates delay risk, searches
/// flight offers, scores every offer, and returns the top five ranked by
/// the requested preference. The `summary` field is null when the
/// summarizer is not configured or unavailable.
#[utoipa::path(
    post,
    path = "/api/v1/analyze",
    tag = "Analysis",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Ranked analysis", body = AnalysisResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 502, description = "Upstream data unavailable", body = crate::errors::ErrorResponse),
    )
)]
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    tracing::info!(
        origin = %request.origin,
        destination = %request.destination,
        date = %request.departure_date,
        preference = ?request.preference,
        "analyze request"
    );
    let response = state.engine.analyze(&request).await?;
    Ok(Json(response))
}
