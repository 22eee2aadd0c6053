/*!
 * Provider implementations for structured-output LLM services.
 *
 * This module contains client implementations for various LLM providers:
 * - Gemini: Google Generative Language API, native response schemas
 * - OpenAI: OpenAI API and compatible servers, JSON mode
 * - Anthropic: Anthropic Messages API
 */

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::fmt::Debug;
use std::time::Duration;

use crate::app_config::{AnalysisConfig, LlmProviderKind};
use crate::errors::ProviderError;

pub mod anthropic;
pub mod gemini;
pub mod keys;
pub mod mock;
pub mod openai;

pub use self::keys::ApiKeyPool;

/// A prompt asking for JSON that follows `schema`
#[derive(Debug, Clone)]
pub struct JsonRequest {
    /// Instructions for the model
    pub system: String,
    /// Task payload
    pub prompt: String,
    /// JSON schema (draft-style, lowercase types) of the expected answer
    pub schema: Value,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_output_tokens: u32,
}

/// Raw text returned by a provider
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    /// Generated text, expected to hold JSON
    pub text: String,
    /// Prompt tokens if reported
    pub prompt_tokens: Option<u64>,
    /// Completion tokens if reported
    pub completion_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the batch processor. The API
/// key is passed per call so the caller can rotate keys.
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Provider display name
    fn name(&self) -> &str;

    /// Model identifier
    fn model(&self) -> &str;

    /// Generate a JSON answer for `request` using `api_key`
    async fn generate_json(&self, request: &JsonRequest, api_key: &str) -> Result<LlmResponse, ProviderError>;
}

/// Classify a non-success HTTP response
pub fn map_http_error(status: StatusCode, body: &str) -> ProviderError {
    let message: String = body.chars().take(500).collect();

    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(message),
        // Gemini reports exhausted quota as 429, some gateways use 503 with RESOURCE_EXHAUSTED
        _ if body.contains("RESOURCE_EXHAUSTED") => ProviderError::RateLimitExceeded(message),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message,
        },
    }
}

/// Map a transport error
pub fn map_transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() || error.is_connect() {
        ProviderError::ConnectionError(error.to_string())
    } else {
        ProviderError::RequestFailed(error.to_string())
    }
}

/// Append the schema to instructions for providers without native schema support
pub fn system_with_schema(system: &str, schema: &Value) -> String {
    format!(
        "{}\n\nRespond with a single JSON object only, no prose and no code fences. It must match this JSON schema:\n{}",
        system,
        serde_json::to_string(schema).unwrap_or_default()
    )
}

/// Build the configured provider
pub fn create_provider(config: &AnalysisConfig) -> Box<dyn LlmProvider> {
    let timeout = Duration::from_secs(config.get_timeout_secs());
    let model = config.get_model();
    let endpoint = config.get_endpoint();

    match config.provider {
        LlmProviderKind::Gemini => Box::new(gemini::Gemini::new(endpoint, model, timeout)),
        LlmProviderKind::OpenAI => Box::new(openai::OpenAI::new(endpoint, model, timeout)),
        LlmProviderKind::Anthropic => Box::new(anthropic::Anthropic::new(endpoint, model, timeout)),
    }
}
