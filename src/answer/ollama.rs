//! Ollama-backed answer service
//!
//! Answers recipe questions with a model served by a local Ollama instance
//! (default `http://localhost:11434`). Transient failures are retried with
//! exponential backoff.

use super::prompt::{build_system_prompt, build_user_prompt, clean_answer};
use super::{AnswerService, QuestionContext};
use crate::config::AssistantConfig;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

/// Maximum number of attempts per question
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff in milliseconds
const BASE_RETRY_DELAY_MS: u64 = 100;

/// Sampling temperature for answers
const ANSWER_TEMPERATURE: f32 = 0.4;

/// Request body for the Ollama generate endpoint
#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// Response from the Ollama generate endpoint (non-streaming)
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Error types for answer requests
#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Model returned an empty answer")]
    EmptyAnswer,

    #[error("All {attempts} retry attempts failed: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl AnswerError {
    fn is_retryable(&self) -> bool {
        match self {
            AnswerError::ConnectionFailed(_) | AnswerError::Timeout(_) => true,
            AnswerError::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Answer service talking to Ollama over HTTP
#[derive(Debug, Clone)]
pub struct OllamaAnswerService {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl OllamaAnswerService {
    /// Create a service for a server, model and request timeout
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, AnswerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnswerError::Client(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout,
        })
    }

    /// Create a service from the assistant settings
    pub fn from_config(config: &AssistantConfig) -> Result<Self, AnswerError> {
        Self::new(&config.base_url, &config.model, config.answer_timeout())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check if the Ollama server is reachable
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Ollama not available: {}", e);
                false
            }
        }
    }

    /// Send a single generate request
    async fn send_generate_request(&self, request: &GenerateRequest) -> Result<String, AnswerError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnswerError::Timeout(self.timeout.as_secs())
                } else {
                    AnswerError::ConnectionFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AnswerError::ServerError { status, message });
        }

        let generate_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AnswerError::ParseError(e.to_string()))?;

        Ok(generate_response.response)
    }

    /// Generate with retry logic
    ///
    /// Retries up to 3 times with exponential backoff (100ms, 200ms).
    async fn generate(&self, request: &GenerateRequest) -> Result<String, AnswerError> {
        let mut last_error: Option<AnswerError> = None;

        for attempt in 0..MAX_RETRY_ATTEMPTS {
            match self.send_generate_request(request).await {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::debug!("Answer request succeeded on attempt {}", attempt + 1);
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if !e.is_retryable() || attempt == MAX_RETRY_ATTEMPTS - 1 {
                        tracing::error!("Answer request failed (attempt {}): {}", attempt + 1, e);
                        last_error = Some(e);
                        break;
                    }

                    let delay_ms = BASE_RETRY_DELAY_MS * 2u64.pow(attempt);
                    tracing::warn!(
                        "Answer request failed (attempt {}), retrying in {}ms: {}",
                        attempt + 1,
                        delay_ms,
                        e
                    );
                    last_error = Some(e);
                    sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }

        Err(AnswerError::RetriesExhausted {
            attempts: MAX_RETRY_ATTEMPTS,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    fn build_request(&self, context: &QuestionContext) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: build_user_prompt(context),
            system: Some(build_system_prompt(context)),
            options: Some(GenerateOptions {
                temperature: ANSWER_TEMPERATURE,
            }),
            stream: false,
        }
    }
}

#[async_trait]
impl AnswerService for OllamaAnswerService {
    async fn answer(&self, context: &QuestionContext) -> Result<String> {
        let request = self.build_request(context);
        tracing::debug!(
            "Asking Ollama model {} about '{}' ({} history messages)",
            self.model,
            context.recipe.title,
            context.history.len()
        );

        let answer = clean_answer(&self.generate(&request).await?);
        if answer.is_empty() {
            return Err(AnswerError::EmptyAnswer.into());
        }
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::Recipe;

    fn service() -> OllamaAnswerService {
        OllamaAnswerService::new("http://localhost:11434/", "llama3.2", Duration::from_secs(30))
            .unwrap()
    }

    #[test]
    fn test_service_creation() {
        let service = service();
        assert_eq!(service.base_url, "http://localhost:11434");
        assert_eq!(service.model(), "llama3.2");
        assert_eq!(service.timeout.as_secs(), 30);
    }

    #[test]
    fn test_from_config() {
        let config = AssistantConfig {
            model: "mistral".to_string(),
            base_url: "http://kitchen:11434".to_string(),
            answer_timeout_seconds: 12,
            history_limit: 4,
        };
        let service = OllamaAnswerService::from_config(&config).unwrap();
        assert_eq!(service.base_url, "http://kitchen:11434");
        assert_eq!(service.model(), "mistral");
        assert_eq!(service.timeout.as_secs(), 12);
    }

    #[test]
    fn test_request_serialisation() {
        let context = QuestionContext {
            question: "How thick?".to_string(),
            recipe: Recipe {
                id: "crepes".to_string(),
                title: "Crepes".to_string(),
                servings: None,
                ingredients: vec![],
                steps: vec!["Pour a thin layer of batter".to_string()],
            },
            step_index: 0,
            history: vec![],
        };

        let request = service().build_request(&context);
        let json = serde_json::to_value(&request).expect("Failed to serialise");
        assert_eq!(json["model"], "llama3.2");
        assert_eq!(json["stream"], false);
        assert_eq!(json["prompt"], "Cook: How thick?\nAssistant:");
        assert!(json["system"].as_str().unwrap().contains("Recipe: Crepes"));
        assert!(json["options"]["temperature"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"model":"llama3.2","response":"About 2 mm.","done":true}"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.response, "About 2 mm.");
    }

    #[test]
    fn test_retryable_errors() {
        assert!(AnswerError::ConnectionFailed("refused".to_string()).is_retryable());
        assert!(AnswerError::Timeout(30).is_retryable());
        assert!(AnswerError::ServerError {
            status: 503,
            message: "busy".to_string()
        }
        .is_retryable());
        assert!(!AnswerError::ServerError {
            status: 404,
            message: "model not found".to_string()
        }
        .is_retryable());
        assert!(!AnswerError::ParseError("bad json".to_string()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = AnswerError::ServerError {
            status: 503,
            message: "model is loading".to_string(),
        };
        assert_eq!(err.to_string(), "Server error (503): model is loading");

        let err = AnswerError::RetriesExhausted {
            attempts: 3,
            last_error: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "All 3 retry attempts failed: connection refused"
        );
    }
}
