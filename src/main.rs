// Flight Risk API v0.1
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod airports;
mod config;
mod errors;
mod helpers;
mod risk;
mod routes;
mod services;

use config::AppConfig;
use risk::tables::RiskTables;
use routes::analyze::AppState;
use services::amadeus::AmadeusClient;
use services::analysis::AnalysisEngine;
use services::openmeteo::OpenMeteoClient;
use services::summarize::SummarizerClient;
use services::watch::WatchRegistry;

/// Watch sessions never poll faster than this, whatever the config says.
const MIN_WATCH_POLL_SECONDS: u64 = 5;

/// Flight Risk API OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Flight Risk API",
        version = "0.1.0",
        description = "Flight-risk advisory API. Scores flight offers for disruption \
            risk by blending route weather, seasonal delay heuristics, and itinerary \
            shape, ranks them against price by traveler preference, and can watch a \
            chosen offer over time, streaming alerts when its risk worsens.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Analysis", description = "Route analysis and offer ranking"),
        (name = "Watch", description = "Offer watch sessions and event streams"),
    ),
    paths(
        routes::health::health_check,
        routes::analyze::analyze,
        routes::weather::route_weather,
        routes::delays::route_delays,
        routes::prices::route_prices,
        routes::watch::start_watch,
        routes::watch::watch_stream,
        routes::watch::stop_watch,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            services::analysis::AnalyzeRequest,
            services::analysis::RouteQuery,
            services::analysis::AnalysisResponse,
            routes::weather::WeatherResponse,
            routes::delays::DelayResponse,
            routes::prices::OfferQuote,
            routes::prices::PricesResponse,
            services::analysis::AnalyzedFlight,
            services::analysis::RouteWeatherReport,
            services::analysis::AirportWeatherReport,
            airports::Airport,
            services::openmeteo::DailyWeather,
            services::openmeteo::WeatherSource,
            services::amadeus::FlightOffer,
            risk::blend::RiskAssessment,
            risk::blend::RiskLevel,
            risk::delay::DelayEstimate,
            risk::delay::DelayLevel,
            risk::rank::Preference,
            routes::watch::WatchStartRequest,
            routes::watch::WatchStartResponse,
            routes::watch::WatchStopResponse,
            services::watch::WatchEvent,
            services::watch::WatchAlternative,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_risk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    if config.amadeus_client_id.is_none() || config.amadeus_client_secret.is_none() {
        tracing::warn!(
            "AMADEUS_CLIENT_ID/AMADEUS_CLIENT_SECRET not set; offer searches will fail"
        );
    }
    if config.openai_api_key.is_none() {
        tracing::info!("OPENAI_API_KEY not set; analysis summaries disabled");
    }

    let cache_ttl = Duration::from_secs(config.cache_ttl_seconds);
    let engine = AnalysisEngine {
        weather: OpenMeteoClient::new(
            &config.open_meteo_forecast_url,
            &config.open_meteo_archive_url,
            cache_ttl,
        ),
        offers: AmadeusClient::new(
            &format!("https://{}", config.amadeus_host),
            config.amadeus_client_id.clone(),
            config.amadeus_client_secret.clone(),
            cache_ttl,
        ),
        summarizer: SummarizerClient::new(
            &config.openai_base_url,
            config.openai_api_key.clone(),
            &config.openai_model,
        ),
        tables: RiskTables::default(),
    };

    let app_state = AppState {
        engine,
        watches: WatchRegistry::new(),
        watch_poll_interval: Duration::from_secs(
            config.watch_poll_seconds.max(MIN_WATCH_POLL_SECONDS),
        ),
    };

    // CORS: browser clients POST analyses and DELETE watches
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/analyze", post(routes::analyze::analyze))
        .route("/api/v1/weather", post(routes::weather::route_weather))
        .route("/api/v1/delays", post(routes::delays::route_delays))
        .route("/api/v1/prices", post(routes::prices::route_prices))
        .route("/api/v1/watch", post(routes::watch::start_watch))
        .route(
            "/api/v1/watch/:id/stream",
            get(routes::watch::watch_stream),
        )
        .route("/api/v1/watch/:id", delete(routes::watch::stop_watch))
        .with_state(app_state);

    let app = Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
