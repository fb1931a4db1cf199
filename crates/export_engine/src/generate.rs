use engine_logging::{engine_debug, engine_warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GenerationSettings;

const MODEL_UNAVAILABLE_PATTERNS: &[&str] = &[
    "model_not_found",
    "does not exist",
    "not available",
    "unsupported model",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub primary_model: String,
    pub fallback_model: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("request timed out")]
    Timeout,
    #[error("generator returned empty content")]
    EmptyResponse,
    #[error("generation failed: {0}")]
    Failure(String),
}

#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// OpenAI-compatible `/chat/completions` client.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    settings: GenerationSettings,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiChatClient {
    /// Build a client reading the API key from `settings.api_key_env`.
    pub fn new(settings: GenerationSettings) -> Result<Self, GenerationError> {
        let api_key = std::env::var(&settings.api_key_env).ok();
        Self::with_api_key(settings, api_key)
    }

    pub fn with_api_key(
        settings: GenerationSettings,
        api_key: Option<String>,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| GenerationError::Failure(err.to_string()))?;
        Ok(Self {
            settings,
            api_key,
            client,
        })
    }

    async fn chat_once(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        let body = ChatBody {
            model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let payload =
            serde_json::to_vec(&body).map_err(|err| GenerationError::Failure(err.to_string()))?;
        let url = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        let mut builder = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        if let Some(key) = &self.api_key {
            builder = builder.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            let message = error_message(&bytes).unwrap_or_else(|| status.to_string());
            return Err(classify_status(status.as_u16(), &message));
        }

        let parsed: ChatResponse = serde_json::from_slice(&bytes)
            .map_err(|err| GenerationError::Failure(format!("malformed response: {err}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        engine_debug!("Model {} returned {} bytes", model, content.len());
        Ok(content)
    }
}

#[async_trait::async_trait]
impl TextGenerator for OpenAiChatClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        match self.chat_once(&request.primary_model, request).await {
            Err(GenerationError::ModelUnavailable(message)) => match &request.fallback_model {
                Some(fallback) => {
                    engine_warn!(
                        "Model {} unavailable ({}), retrying with {}",
                        request.primary_model,
                        message,
                        fallback
                    );
                    self.chat_once(fallback, request).await
                }
                None => Err(GenerationError::ModelUnavailable(message)),
            },
            other => other,
        }
    }
}

fn error_message(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => Some(envelope.error.message),
        Err(_) => Some(String::from_utf8_lossy(body).into_owned()),
    }
}

fn classify_status(status: u16, message: &str) -> GenerationError {
    let lower = message.to_ascii_lowercase();
    if status == 429 || lower.contains("rate limit") {
        return GenerationError::RateLimited(message.to_string());
    }
    let model_missing = MODEL_UNAVAILABLE_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern));
    if status == 404 || (status == 400 && model_missing) {
        return GenerationError::ModelUnavailable(message.to_string());
    }
    if (400..500).contains(&status) {
        return GenerationError::InvalidInput(message.to_string());
    }
    GenerationError::Failure(format!("http status {status}: {message}"))
}

fn map_reqwest_error(err: reqwest::Error) -> GenerationError {
    if err.is_timeout() {
        return GenerationError::Timeout;
    }
    GenerationError::Failure(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(
            classify_status(429, "slow down"),
            GenerationError::RateLimited("slow down".into())
        );
        assert_eq!(
            classify_status(400, "The model `x` does not exist"),
            GenerationError::ModelUnavailable("The model `x` does not exist".into())
        );
        assert_eq!(
            classify_status(400, "bad messages"),
            GenerationError::InvalidInput("bad messages".into())
        );
        assert!(matches!(
            classify_status(503, "down"),
            GenerationError::Failure(_)
        ));
    }

    #[test]
    fn error_body_message_is_preferred() {
        let body = br#"{"error":{"message":"model_not_found"}}"#;
        assert_eq!(error_message(body).as_deref(), Some("model_not_found"));
        assert_eq!(error_message(b"plain").as_deref(), Some("plain"));
        assert_eq!(error_message(b""), None);
    }
}
