//! Watch sessions.
//!
//! A watch pins one offer from a completed analysis and re-scores it on a
//! timer with fresh weather and offers. Consumers subscribe over SSE; the
//! session emits an `Alert` when risk worsens materially (score up by at
//! least the configured delta, or the level crosses upward) and a plain
//! `Update` otherwise. State is in-memory only and dies with the process.
//!
//! Concurrency model: the registry is a shared map of handles; each handle
//! serializes its own ticks with a `try_lock` (a tick that would overlap a
//! running one is skipped, not queued), broadcasts events best-effort to
//! however many subscribers exist, and carries a stop signal the driver
//! loop selects on.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::risk::blend::{score_offer, RiskAssessment};
use crate::risk::delay::{estimate_delay, RouteContext};
use crate::risk::rank::{rank_offers, ScoredOffer};
use crate::risk::tables::RiskTables;
use crate::risk::weather::route_weather_probability;
use crate::services::amadeus::FlightOffer;
use crate::services::analysis::{AnalysisEngine, ValidRequest};
use crate::services::openmeteo::DailyWeather;

/// Event buffer per session. Subscribers that lag past this lose old
/// events, never block the producer.
const EVENT_BUFFER: usize = 16;

/// How many alternatives an alert carries.
const MAX_ALTERNATIVES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Active,
    Stopped,
}

/// One watched offer and its last known assessment.
#[derive(Debug, Clone)]
pub struct WatchSession {
    pub id: Uuid,
    pub request: ValidRequest,
    pub offer: FlightOffer,
    pub last_assessment: RiskAssessment,
    pub created_at: DateTime<Utc>,
    pub state: WatchState,
}

impl WatchSession {
    pub fn new(request: ValidRequest, offer: FlightOffer, assessment: RiskAssessment) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            offer,
            last_assessment: assessment,
            created_at: Utc::now(),
            state: WatchState::Active,
        }
    }
}

/// An alternative offer suggested alongside an alert.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WatchAlternative {
    #[serde(flatten)]
    pub offer: FlightOffer,
    pub risk: RiskAssessment,
}

/// What a watch tick produced, as streamed to subscribers.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WatchEvent {
    Update {
        assessment: RiskAssessment,
    },
    Alert {
        assessment: RiskAssessment,
        /// Signed score change since the previous assessment.
        delta: i16,
        explanation: String,
        /// Up to three lower-friction options, ranked by the session's
        /// preference, excluding the watched offer.
        alternatives: Vec<WatchAlternative>,
    },
    Stopped,
}

/// Re-score the watched offer against fresh inputs and classify the change.
///
/// Pure apart from mutating `session.last_assessment`. A stopped session
/// never advances; callers holding a stale handle get `SessionNotFound`.
pub fn advance_tick(
    session: &mut WatchSession,
    origin_weather: &DailyWeather,
    destination_weather: &DailyWeather,
    offers: &[FlightOffer],
    tables: &RiskTables,
) -> Result<WatchEvent, AppError> {
    if session.state == WatchState::Stopped {
        return Err(AppError::SessionNotFound(session.id.to_string()));
    }

    let weather = route_weather_probability(origin_weather, destination_weather, tables);
    let route = RouteContext::new(
        session.request.origin,
        session.request.destination,
        session.request.departure_day,
    );
    let delay = estimate_delay(&route, tables);

    let assessment = score_offer(&session.offer, &weather, &delay, tables);
    let previous = session.last_assessment.clone();
    session.last_assessment = assessment.clone();

    let delta = assessment.risk_score as i16 - previous.risk_score as i16;
    let crossed_up = assessment.risk_level > previous.risk_level;
    if delta < tables.alert_score_delta as i16 && !crossed_up {
        return Ok(WatchEvent::Update { assessment });
    }

    let scored: Vec<ScoredOffer> = offers
        .iter()
        .filter(|o| o.id != session.offer.id)
        .map(|offer| ScoredOffer {
            offer: offer.clone(),
            assessment: score_offer(offer, &weather, &delay, tables),
        })
        .collect();
    let alternatives: Vec<WatchAlternative> = rank_offers(scored, session.request.preference)
        .into_iter()
        .take(MAX_ALTERNATIVES)
        .map(|s| WatchAlternative {
            offer: s.offer,
            risk: s.assessment,
        })
        .collect();

    let explanation = if crossed_up {
        format!(
            "Risk moved from {:?} ({}/100) to {:?} ({}/100). Top drivers: {}.",
            previous.risk_level,
            previous.risk_score,
            assessment.risk_level,
            assessment.risk_score,
            assessment.drivers.join(", ")
        )
    } else {
        format!(
            "Risk rose from {}/100 to {}/100. Top drivers: {}.",
            previous.risk_score,
            assessment.risk_score,
            assessment.drivers.join(", ")
        )
    };

    Ok(WatchEvent::Alert {
        assessment,
        delta,
        explanation,
        alternatives,
    })
}

/// Shared per-session state: the session itself, the event fan-out, and
/// the stop signal.
pub struct WatchHandle {
    session: Mutex<WatchSession>,
    events: broadcast::Sender<WatchEvent>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl WatchHandle {
    fn new(session: WatchSession) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            session: Mutex::new(session),
            events,
            stop_tx,
            stop_rx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }

    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }

    /// Delivery is best-effort: no subscribers is fine.
    fn emit(&self, event: WatchEvent) {
        let _ = self.events.send(event);
    }

    /// Fetch fresh inputs and advance the session one tick.
    ///
    /// Skips silently when a previous tick still holds the session, and
    /// logs-and-skips when a provider fetch fails; the next tick retries.
    pub async fn run_tick(&self, engine: &AnalysisEngine) {
        let Ok(mut session) = self.session.try_lock() else {
            tracing::debug!("previous watch tick still running, skipping");
            return;
        };

        if session.state == WatchState::Stopped {
            return;
        }

        let inputs = match engine.fetch_route_inputs(&session.request).await {
            Ok(inputs) => inputs,
            Err(e) => {
                tracing::warn!(watch_id = %session.id, error = %e, "watch tick fetch failed, skipping");
                return;
            }
        };

        match advance_tick(
            &mut session,
            &inputs.origin_weather,
            &inputs.destination_weather,
            &inputs.offers,
            &engine.tables,
        ) {
            Ok(event) => {
                if let WatchEvent::Alert { delta, .. } = &event {
                    tracing::info!(
                        watch_id = %session.id,
                        delta,
                        score = session.last_assessment.risk_score,
                        "watch alert"
                    );
                }
                self.emit(event);
            }
            Err(e) => {
                tracing::warn!(watch_id = %session.id, error = %e, "watch tick rejected");
            }
        }
    }

    async fn mark_stopped(&self) {
        {
            let mut session = self.session.lock().await;
            session.state = WatchState::Stopped;
        }
        self.emit(WatchEvent::Stopped);
        let _ = self.stop_tx.send(true);
    }
}

/// Shared map of live watch sessions.
#[derive(Clone, Default)]
pub struct WatchRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Arc<WatchHandle>>>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, session: WatchSession) -> (Uuid, Arc<WatchHandle>) {
        let id = session.id;
        let handle = Arc::new(WatchHandle::new(session));
        self.inner.write().await.insert(id, handle.clone());
        (id, handle)
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<WatchHandle>> {
        self.inner.read().await.get(&id).cloned()
    }

    /// Stop and remove a session. The handle stays alive for subscribers
    /// long enough to observe the final `Stopped` event.
    pub async fn stop(&self, id: Uuid) -> Result<(), AppError> {
        let handle = self
            .inner
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))?;
        handle.mark_stopped().await;
        tracing::info!(watch_id = %id, "watch session stopped");
        Ok(())
    }
}

/// Spawn the per-session driver loop: wake on the poll timer, exit on the
/// stop signal.
pub fn spawn_watch_driver(handle: Arc<WatchHandle>, engine: AnalysisEngine, interval: Duration) {
    tokio::spawn(async move {
        let mut stop = handle.stop_signal();
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    handle.run_tick(&engine).await;
                }
                _ = stop.changed() => {}
            }
            if *stop.borrow() {
                break;
            }
        }
    });
}
