// LLM Classifier
// Optional remote second opinion on a chunk, behind a capability trait

use crate::models::{ExternalVerdict, Label};
use crate::services::config_store::AppConfig;
use crate::services::providers::{
    env_api_key, stored_api_key, ProviderClient, ProviderError, MISTRAL_PROVIDER,
};
use crate::services::text_processor::truncate_chars;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

const PROMPT_MAX_CHARS: usize = 6000;
const CLASSIFIER_TEMPERATURE: f64 = 0.1;
const CLASSIFIER_MAX_TOKENS: u32 = 500;

/// Remote classifier returning a verdict for one chunk of text.
#[async_trait]
pub trait ExternalClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// Malformed replies resolve to the neutral verdict; only transport,
    /// auth, quota and timeout failures are errors.
    async fn classify(&self, text: &str) -> Result<ExternalVerdict, ProviderError>;
}

/// Null object: always neutral, never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralClassifier;

#[async_trait]
impl ExternalClassifier for NeutralClassifier {
    fn name(&self) -> &str {
        "neutral"
    }

    async fn classify(&self, _text: &str) -> Result<ExternalVerdict, ProviderError> {
        Ok(ExternalVerdict::neutral())
    }
}

pub struct MistralClassifier {
    client: ProviderClient,
    api_key: String,
    model: String,
    timeout: Duration,
    max_attempts: u32,
}

impl MistralClassifier {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let timeout = Duration::from_secs(20);
        Self {
            client: ProviderClient::new(None, timeout + Duration::from_secs(5)),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
            max_attempts: 2,
        }
    }

    pub fn with_client(mut self, client: ProviderClient) -> Self {
        self.client = client;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build from config; `None` when disabled or no API key is available.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        let settings = &config.external;
        if !settings.enabled {
            return None;
        }
        // Environment, then the config handed in, then the config file on disk.
        let injected = config
            .api_keys
            .get(MISTRAL_PROVIDER)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        let api_key = env_api_key().or(injected).or_else(stored_api_key)?;

        let timeout = Duration::from_secs(settings.timeout_secs.max(1));
        let client = ProviderClient::new(settings.base_url.as_deref(), timeout + Duration::from_secs(5));
        Some(
            MistralClassifier::new(api_key, settings.model.clone())
                .with_client(client)
                .with_timeout(timeout)
                .with_max_attempts(settings.max_attempts),
        )
    }

    async fn classify_once(&self, prompt: &str) -> Result<ExternalVerdict, ProviderError> {
        let fut = self.client.call_mistral_json(
            &self.model,
            &self.api_key,
            prompt,
            CLASSIFIER_MAX_TOKENS,
            CLASSIFIER_TEMPERATURE,
        );
        let result = tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout.as_secs()))??;

        info!(
            "[CLASSIFIER] Mistral ok model={} latency_ms={}",
            self.model, result.latency_ms
        );
        Ok(parse_verdict(&result.content))
    }
}

#[async_trait]
impl ExternalClassifier for MistralClassifier {
    fn name(&self) -> &str {
        "mistral"
    }

    async fn classify(&self, text: &str) -> Result<ExternalVerdict, ProviderError> {
        let prompt = build_prompt(text);
        let mut last_err = ProviderError::MissingContent;

        for attempt in 1..=self.max_attempts {
            match self.classify_once(&prompt).await {
                Ok(verdict) => return Ok(verdict),
                Err(e) if !e.is_retryable() => {
                    warn!("[CLASSIFIER] Mistral gave up model={} attempt={} : {}", self.model, attempt, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("[CLASSIFIER] Mistral error model={} attempt={} : {}", self.model, attempt, e);
                    last_err = e;
                }
            }

            if attempt < self.max_attempts {
                let backoff_ms = 400u64 * attempt as u64;
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }

        Err(last_err)
    }
}

/// Prompt favouring structural cues over content; text capped at 6000 characters.
pub fn build_prompt(text: &str) -> String {
    format!(
        r#"Expert AI detector. Analyze STRUCTURE, not content.

RULES:
1. Personal facts do NOT prove human - AI has memory
2. Perfect clichés in perfect positions = AI
3. Slang + perfect logical flow = AI pretending to be casual
4. NO FLAWS = likely AI
5. Self-corrections, tangents, incomplete thoughts = human signals

JSON only: {{"label":"HUMAN"/"AI"/"MIXED","confidence":0-1,"ai_probability":0-1,"suspicious_phrases":[],"reasoning":"brief"}}

Text: "{}""#,
        truncate_chars(text, PROMPT_MAX_CHARS)
    )
}

fn extract_json(content: &str) -> Option<&str> {
    let trimmed = content.trim();
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (start < end).then(|| &trimmed[start..=end])
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    label: Option<String>,
    confidence: Option<f64>,
    ai_probability: Option<f64>,
    #[serde(default)]
    suspicious_phrases: Vec<String>,
    reasoning: Option<String>,
}

fn parse_label(label: &str) -> Label {
    match label.trim().to_uppercase().as_str() {
        "HUMAN" => Label::Human,
        "AI" => Label::Ai,
        _ => Label::Mixed,
    }
}

/// Lenient reply parsing; anything unreadable becomes the neutral verdict.
pub fn parse_verdict(content: &str) -> ExternalVerdict {
    let raw = extract_json(content).and_then(|json| serde_json::from_str::<RawVerdict>(json).ok());
    let Some(raw) = raw else {
        warn!("[CLASSIFIER] Unparseable reply, using neutral verdict");
        return ExternalVerdict::neutral();
    };

    let neutral = ExternalVerdict::neutral();
    ExternalVerdict {
        label: raw.label.as_deref().map(parse_label).unwrap_or(neutral.label),
        confidence: raw.confidence.unwrap_or(neutral.confidence),
        ai_probability: raw.ai_probability.unwrap_or(neutral.ai_probability),
        suspicious_phrases: raw
            .suspicious_phrases
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        reasoning: raw.reasoning.unwrap_or_default(),
    }
    .sanitized()
}
