/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Open-Meteo forecast endpoint (overridable for tests).
    pub open_meteo_forecast_url: String,
    /// Open-Meteo historical archive endpoint (overridable for tests).
    pub open_meteo_archive_url: String,
    /// Flight-offer provider host (Amadeus self-service API).
    pub amadeus_host: String,
    pub amadeus_client_id: Option<String>,
    pub amadeus_client_secret: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    /// Base URL for the summarizer API (overridable for tests).
    pub openai_base_url: String,
    /// Default TTL for cached provider responses (seconds).
    pub cache_ttl_seconds: u64,
    /// Interval between watch-session ticks (seconds).
    pub watch_poll_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            open_meteo_forecast_url: std::env::var("OPEN_METEO_FORECAST_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com/v1/forecast".to_string()),
            open_meteo_archive_url: std::env::var("OPEN_METEO_ARCHIVE_URL")
                .unwrap_or_else(|_| "https://archive-api.open-meteo.com/v1/archive".to_string()),
            amadeus_host: std::env::var("AMADEUS_HOST")
                .unwrap_or_else(|_| "test.api.amadeus.com".to_string()),
            amadeus_client_id: std::env::var("AMADEUS_CLIENT_ID").ok(),
            amadeus_client_secret: std::env::var("AMADEUS_CLIENT_SECRET").ok(),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            cache_ttl_seconds: std::env::var("CACHE_TTL_SECONDS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .expect("CACHE_TTL_SECONDS must be a valid u64"),
            watch_poll_seconds: std::env::var("WATCH_POLL_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("WATCH_POLL_SECONDS must be a valid u64"),
        }
    }
}
