//! Watch-session HTTP endpoints.
//!
//! - POST   /api/v1/watch
//! - GET    /api/v1/watch/:id/stream   (SSE)
//! - DELETE /api/v1/watch/:id

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::risk::blend::RiskAssessment;
use crate::routes::analyze::AppState;
use crate::services::analysis::{validate_request, AnalyzeRequest};
use crate::services::watch::{spawn_watch_driver, WatchSession};

/// Body of `POST /api/v1/watch`: the analysis request the offer came from,
/// plus the id of the offer to pin.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WatchStartRequest {
    #[serde(flatten)]
    pub analysis: AnalyzeRequest,
    pub offer_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WatchStartResponse {
    pub watch_id: Uuid,
    /// The assessment the watch was seeded with; later ticks compare
    /// against this.
    pub risk: RiskAssessment,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WatchStopResponse {
    pub watch_id: Uuid,
    pub status: String,
}

/// Start watching one offer.
///
/// Runs a fresh scoring pass to seed the session, so the first streamed
/// event always has a meaningful baseline to compare against.
#[utoipa::path(
    post,
    path = "/api/v1/watch",
    tag = "Watch",
    request_body = WatchStartRequest,
    responses(
        (status = 200, description = "Watch session created", body = WatchStartResponse),
        (status = 400, description = "Invalid request or unknown offer", body = crate::errors::ErrorResponse),
        (status = 502, description = "Upstream data unavailable", body = crate::errors::ErrorResponse),
    )
)]
pub async fn start_watch(
    State(state): State<AppState>,
    Json(body): Json<WatchStartRequest>,
) -> Result<Json<WatchStartResponse>, AppError> {
    let req = validate_request(&body.analysis)?;
    let inputs = state.engine.fetch_route_inputs(&req).await?;
    let ranked = state.engine.score_and_rank(&inputs, req.preference);

    let seed = ranked
        .into_iter()
        .find(|s| s.offer.id == body.offer_id)
        .ok_or_else(|| {
            AppError::InvalidRequest(format!(
                "Offer {} not found in current search results",
                body.offer_id
            ))
        })?;

    let risk = seed.assessment.clone();
    let session = WatchSession::new(req, seed.offer, seed.assessment);
    let (watch_id, handle) = state.watches.register(session).await;
    spawn_watch_driver(handle, state.engine.clone(), state.watch_poll_interval);

    tracing::info!(%watch_id, offer_id = %body.offer_id, "watch session started");
    Ok(Json(WatchStartResponse { watch_id, risk }))
}

/// Stream watch events over SSE.
///
/// Each event is one `WatchEvent` as JSON. Subscribers that fall behind
/// the broadcast buffer skip the missed events and continue from the most
/// recent ones; the stream ends after the session's final `stopped` event.
#[utoipa::path(
    get,
    path = "/api/v1/watch/{id}/stream",
    tag = "Watch",
    params(("id" = Uuid, Path, description = "Watch session id")),
    responses(
        (status = 200, description = "SSE stream of watch events"),
        (status = 404, description = "Unknown watch session", body = crate::errors::ErrorResponse),
    )
)]
pub async fn watch_stream(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let handle = state
        .watches
        .get(id)
        .await
        .ok_or_else(|| AppError::SessionNotFound(id.to_string()))?;

    let events = handle.subscribe();
    let stream = stream::unfold(events, |mut events| async move {
        loop {
            match events.recv().await {
                Ok(event) => match Event::default().json_data(&event) {
                    // After the final `stopped` event the sender side goes
                    // away and the next recv closes the stream.
                    Ok(sse_event) => return Some((Ok(sse_event), events)),
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode watch event");
                        continue;
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "watch subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Stop a watch session.
#[utoipa::path(
    delete,
    path = "/api/v1/watch/{id}",
    tag = "Watch",
    params(("id" = Uuid, Path, description = "Watch session id")),
    responses(
        (status = 200, description = "Watch session stopped", body = WatchStopResponse),
        (status = 404, description = "Unknown watch session", body = crate::errors::ErrorResponse),
    )
)]
pub async fn stop_watch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WatchStopResponse>, AppError> {
    state.watches.stop(id).await?;
    Ok(Json(WatchStopResponse {
        watch_id: id,
        status: "stopped".to_string(),
    }))
}
