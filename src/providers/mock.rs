/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::working()` - Answers every item of every batch
 * - `MockProvider::partial(n)` - Leaves out every n-th item
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::rate_limited(keys)` - Rejects the listed API keys with 429
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::analysis::batch::ITEMS_MARKER;
use crate::errors::ProviderError;

use super::{JsonRequest, LlmProvider, LlmResponse};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Answers every item
    Working,
    /// Answers, but leaves out every n-th item of a batch
    Partial { drop_every: usize },
    /// Wraps valid JSON in prose and a code fence
    Fenced,
    /// Answers with text that holds no JSON at all
    Malformed,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with a server error
    Failing,
    /// Returns 429 for the listed keys and answers for the others
    RateLimited { limited_keys: Vec<String> },
}

/// Mock provider for testing batch analysis
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Keys in the order they were used
    used_keys: Arc<Mutex<Vec<String>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&JsonRequest) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            used_keys: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock that omits every n-th item
    pub fn partial(drop_every: usize) -> Self {
        Self::new(MockBehavior::Partial { drop_every: drop_every.max(1) })
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that rejects the given keys as rate limited
    pub fn rate_limited(limited_keys: &[&str]) -> Self {
        Self::new(MockBehavior::RateLimited {
            limited_keys: limited_keys.iter().map(|k| k.to_string()).collect(),
        })
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&JsonRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Keys passed to `generate_json`, in call order
    pub fn used_keys(&self) -> Vec<String> {
        self.used_keys.lock().clone()
    }

    /// Items embedded in a batch prompt
    pub fn parse_items(prompt: &str) -> Vec<(usize, String)> {
        let Some(start) = prompt.rfind(ITEMS_MARKER) else {
            return Vec::new();
        };
        let payload = &prompt[start + ITEMS_MARKER.len()..];
        let Ok(Value::Array(items)) = serde_json::from_str::<Value>(payload.trim()) else {
            return Vec::new();
        };

        items.iter()
            .filter_map(|item| {
                let index = item.get("index")?.as_u64()? as usize;
                let text = item.get("text")?.as_str()?.to_string();
                Some((index, text))
            })
            .collect()
    }

    /// Canned answer for one item
    pub fn result_for(index: usize, text: &str) -> Value {
        let lower = text.to_lowercase();
        let sentiment = if ["love", "great", "awesome", "best"].iter().any(|w| lower.contains(w)) {
            "positive"
        } else if ["hate", "bad", "worst", "boring"].iter().any(|w| lower.contains(w)) {
            "negative"
        } else {
            "neutral"
        };
        let category = if text.contains('?') {
            "question"
        } else if sentiment == "positive" {
            "praise"
        } else if sentiment == "negative" {
            "criticism"
        } else {
            "discussion"
        };

        json!({
            "index": index,
            "translation": format!("[TRANSLATED] {}", text),
            "sentiment": sentiment,
            "category": category,
        })
    }

    /// Generate a response answering every item, skipping every `drop_every`-th when set
    pub fn generate_batch_response(items: &[(usize, String)], drop_every: Option<usize>) -> String {
        let results: Vec<Value> = items.iter()
            .enumerate()
            .filter(|(position, _)| drop_every.is_none_or(|n| position % n != n - 1))
            .map(|(_, (index, text))| Self::result_for(*index, text))
            .collect();
        json!({ "results": results }).to_string()
    }

    fn respond(&self, text: String, request: &JsonRequest) -> LlmResponse {
        LlmResponse {
            prompt_tokens: Some((request.system.len() + request.prompt.len()) as u64 / 4),
            completion_tokens: Some(text.len() as u64 / 4),
            text,
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone(),
            request_count: Arc::clone(&self.request_count),
            used_keys: Arc::clone(&self.used_keys),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate_json(&self, request: &JsonRequest, api_key: &str) -> Result<LlmResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.used_keys.lock().push(api_key.to_string());

        if let Some(generator) = self.custom_response {
            return Ok(self.respond(generator(request), request));
        }

        let items = Self::parse_items(&request.prompt);

        match &self.behavior {
            MockBehavior::Working => Ok(self.respond(Self::generate_batch_response(&items, None), request)),

            MockBehavior::Partial { drop_every } => {
                Ok(self.respond(Self::generate_batch_response(&items, Some(*drop_every)), request))
            }

            MockBehavior::Fenced => {
                let text = format!(
                    "Sure! Here are the results:\n```json\n{}\n```\nLet me know if you need more.",
                    Self::generate_batch_response(&items, None)
                );
                Ok(self.respond(text, request))
            }

            MockBehavior::Malformed => Ok(self.respond("I cannot help with that.".to_string(), request)),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.respond(Self::generate_batch_response(&items, None), request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::RateLimited { limited_keys } => {
                if limited_keys.iter().any(|k| k == api_key) {
                    Err(ProviderError::RateLimitExceeded(format!("key {} is rate limited", api_key)))
                } else {
                    Ok(self.respond(Self::generate_batch_response(&items, None), request))
                }
            }
        }
    }
}
