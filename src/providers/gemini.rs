use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::errors::ProviderError;

use super::{map_http_error, map_transport_error, JsonRequest, LlmProvider, LlmResponse};

/// Gemini client for the Generative Language API
#[derive(Debug)]
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// API base URL
    endpoint: String,
    /// Model name
    model: String,
}

/// generateContent request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// Conversation turns
    contents: Vec<GeminiContent>,

    /// System instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,

    /// Sampling and output format
    generation_config: GenerationConfig,
}

/// A content block made of text parts
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    /// Author role (user, model)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Text parts
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

/// generateContent response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,

    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
}

impl GeminiRequest {
    /// Create a single-turn request
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: prompt.into() }],
            }],
            system_instruction: None,
            generation_config: GenerationConfig {
                temperature: None,
                max_output_tokens: None,
                response_mime_type: None,
                response_schema: None,
            },
        }
    }

    /// Set the system instruction
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system_instruction = Some(GeminiContent {
            role: None,
            parts: vec![GeminiPart { text: system.into() }],
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.generation_config.temperature = Some(temperature);
        self
    }

    /// Limit the number of generated tokens
    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.generation_config.max_output_tokens = Some(max_output_tokens);
        self
    }

    /// Constrain the output to JSON following `schema`
    pub fn json_schema(mut self, schema: &Value) -> Self {
        self.generation_config.response_mime_type = Some("application/json".to_string());
        self.generation_config.response_schema = Some(to_gemini_schema(schema));
        self
    }
}

/// Gemini expects OpenAPI-style upper-case type names and rejects some keywords
pub fn to_gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let converted = map.iter()
                .filter(|(key, _)| key.as_str() != "additionalProperties" && key.as_str() != "$schema")
                .map(|(key, value)| {
                    let value = match (key.as_str(), value) {
                        ("type", Value::String(t)) => Value::String(t.to_uppercase()),
                        _ => to_gemini_schema(value),
                    };
                    (key.clone(), value)
                })
                .collect();
            Value::Object(converted)
        },
        Value::Array(items) => Value::Array(items.iter().map(to_gemini_schema).collect()),
        other => other.clone(),
    }
}

impl Gemini {
    /// Create a new Gemini client
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    /// Complete a generateContent request
    pub async fn complete(&self, request: &GeminiRequest, api_key: &str) -> Result<GeminiResponse, ProviderError> {
        let api_url = format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );

        let response = self.client.post(&api_url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Gemini API error ({}): {}", status, error_text);
            return Err(map_http_error(status, &error_text));
        }

        response.json::<GeminiResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("Gemini response: {}", e)))
    }

    /// Extract text from the first candidate
    pub fn extract_text_from_response(response: &GeminiResponse) -> Option<String> {
        let candidate = response.candidates.first()?;
        if let Some(reason) = &candidate.finish_reason {
            if reason != "STOP" {
                debug!("Gemini finished with reason {}", reason);
            }
        }
        let content = candidate.content.as_ref()?;
        Some(content.parts.iter().map(|p| p.text.as_str()).collect())
    }
}

#[async_trait]
impl LlmProvider for Gemini {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_json(&self, request: &JsonRequest, api_key: &str) -> Result<LlmResponse, ProviderError> {
        let gemini_request = GeminiRequest::new(request.prompt.clone())
            .system(request.system.clone())
            .temperature(request.temperature)
            .max_output_tokens(request.max_output_tokens)
            .json_schema(&request.schema);

        let response = self.complete(&gemini_request, api_key).await?;
        let text = Self::extract_text_from_response(&response)
            .ok_or_else(|| ProviderError::ParseError("Gemini returned no candidate text".to_string()))?;

        Ok(LlmResponse {
            text,
            prompt_tokens: response.usage_metadata.as_ref().map(|u| u.prompt_token_count),
            completion_tokens: response.usage_metadata.as_ref().map(|u| u.candidates_token_count),
        })
    }
}
