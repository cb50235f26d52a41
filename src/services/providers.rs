// AI Provider Service
// Mistral chat-completions client used by the remote classifier

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const MISTRAL_DEFAULT_URL: &str = "https://api.mistral.ai/v1/chat/completions";
pub const MISTRAL_DEFAULT_MODEL: &str = "mistral-small-latest";
pub const MISTRAL_PROVIDER: &str = "mistral";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API key rejected")]
    Unauthorized,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

impl ProviderError {
    /// Auth and quota failures will not improve on an immediate retry.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::Unauthorized | ProviderError::RateLimited)
    }
}

/// Map a non-success HTTP status to a provider error.
pub fn classify_status(status: StatusCode, body: String) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED => ProviderError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
        _ => ProviderError::ApiError {
            status: status.as_u16(),
            message: body,
        },
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    pub content: String,
    pub latency_ms: i64,
}

pub struct ProviderClient {
    client: Client,
    mistral_url: String,
}

impl ProviderClient {
    /// Endpoint precedence: explicit base URL, then `MISTRAL_API_URL`, then the public API.
    pub fn new(base_url: Option<&str>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        let mistral_url = base_url
            .map(str::to_string)
            .or_else(|| env::var("MISTRAL_API_URL").ok())
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| MISTRAL_DEFAULT_URL.to_string());

        Self { client, mistral_url }
    }

    pub fn url(&self) -> &str {
        &self.mistral_url
    }

    /// Single-message chat call asking for a JSON object reply.
    pub async fn call_mistral_json(
        &self,
        model: &str,
        api_key: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<ChatResult, ProviderError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens,
            temperature,
            response_format: Some(ResponseFormat {
                r#type: "json_object".to_string(),
            }),
        };

        let start = Instant::now();

        let response = self
            .client
            .post(&self.mistral_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let data: ChatResponse = response.json().await?;

        let content = data
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or(ProviderError::MissingContent)?;

        Ok(ChatResult { content, latency_ms })
    }
}

/// Mistral API key from `MISTRAL_API_KEY` or `AIGARD_MISTRAL_API_KEY`
pub fn env_api_key() -> Option<String> {
    ["MISTRAL_API_KEY", "AIGARD_MISTRAL_API_KEY"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .map(|val| val.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Mistral API key saved in the default config file
pub fn stored_api_key() -> Option<String> {
    let store = super::ConfigStore::open_default()?;
    store.get_api_key(MISTRAL_PROVIDER).ok().flatten()
}
