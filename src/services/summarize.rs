//! Plain-language summary generation.
//!
//! Thin client over an OpenAI-compatible chat-completions endpoint. The
//! summary is strictly best-effort garnish: every failure (no API key,
//! network error, bad payload) maps to `SummarizationUnavailable`, and the
//! analysis pipeline degrades to `summary: null` instead of failing the
//! request.

use serde::Deserialize;

use crate::errors::AppError;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Client for the summarizer API.
#[derive(Clone)]
pub struct SummarizerClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl SummarizerClient {
    pub fn new(base_url: &str, api_key: Option<String>, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.to_string(),
            api_key,
            model: model.to_string(),
        }
    }

    /// Generate a short traveler-facing summary for the given prompt.
    pub async fn summarize(&self, prompt: &str) -> Result<String, AppError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::SummarizationUnavailable("Summarizer API key not configured".to_string())
        })?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a concise travel assistant. Summarize flight risk \
                                findings for a traveler in 2-3 plain sentences. No markdown."
                },
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.3,
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::SummarizationUnavailable(format!("Summarizer request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::SummarizationUnavailable(format!(
                "Summarizer returned HTTP {}",
                response.status()
            )));
        }

        let payload: ChatResponse = response.json().await.map_err(|e| {
            AppError::SummarizationUnavailable(format!("Summarizer parse error: {}", e))
        })?;

        let text = payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::SummarizationUnavailable("Summarizer returned no text".to_string())
            })?;

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_summarize_extracts_message_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "  Expect storms at JFK. "}}
                ]
            })))
            .mount(&server)
            .await;

        let client = SummarizerClient::new(&server.uri(), Some("sk-test".to_string()), "gpt-4o-mini");
        let text = client.summarize("route details").await.unwrap();
        assert_eq!(text, "Expect storms at JFK.");
    }

    #[tokio::test]
    async fn test_missing_key_is_summarization_unavailable() {
        let client = SummarizerClient::new("http://localhost:1", None, "gpt-4o-mini");
        let err = client.summarize("anything").await.unwrap_err();
        assert!(matches!(err, AppError::SummarizationUnavailable(_)));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_summarization_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = SummarizerClient::new(&server.uri(), Some("sk-test".to_string()), "gpt-4o-mini");
        let err = client.summarize("anything").await.unwrap_err();
        assert!(matches!(err, AppError::SummarizationUnavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_choices_is_summarization_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let client = SummarizerClient::new(&server.uri(), Some("sk-test".to_string()), "gpt-4o-mini");
        let err = client.summarize("anything").await.unwrap_err();
        assert!(matches!(err, AppError::SummarizationUnavailable(_)));
    }
}
