/*!
 * Batched structured-output requests.
 *
 * Items are sent to the model in fixed-size batches. Each item carries a
 * numeric index that the model must echo back; answers are matched by that
 * index, never by position. Items the model leaves out, duplicates or
 * mangles get the task's fallback value, so the output always has exactly
 * one entry per input item, in input order.
 */

use log::{debug, warn};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::app_config::AnalysisConfig;
use crate::errors::AnalysisError;
use crate::providers::{ApiKeyPool, JsonRequest, LlmProvider};

/// Line that introduces the JSON item list in every batch prompt
pub const ITEMS_MARKER: &str = "COMMENTS:";

/// Output tokens reserved per entry for the index, keys and labels
const TOKENS_PER_ENTRY: usize = 64;

/// Output tokens reserved for the answer envelope
const TOKENS_PER_ANSWER: usize = 256;

/// One unit of work inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItem {
    /// Identifier the model must echo back
    pub index: usize,
    /// Text sent to the model
    pub text: String,
}

impl BatchItem {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self { index, text: text.into() }
    }
}

/// A per-item task the batch processor can run
pub trait BatchTask: Send + Sync {
    /// Value produced for each item
    type Output: Clone + Send;

    /// Short name used in logs
    fn name(&self) -> &str;

    /// Instructions for the model
    fn system_prompt(&self) -> String;

    /// JSON schema properties of one result entry, `index` excluded
    fn result_properties(&self) -> Value;

    /// Parse one result entry; `None` marks it invalid
    fn parse_result(&self, entry: &Value) -> Option<Self::Output>;

    /// Value used when the model gave no usable answer for `item`
    fn fallback(&self, item: &BatchItem) -> Self::Output;
}

/// Batch processing options
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Items per request
    pub batch_size: usize,
    /// Pause between two batches
    pub batch_delay: Duration,
    /// Pause before retrying a rate-limited batch with the next key
    pub rate_limit_backoff: Duration,
    /// Sampling temperature
    pub temperature: f32,
    /// Longer item texts are cut to this many characters
    pub max_item_chars: usize,
    /// Ceiling for the output tokens requested per batch
    pub max_output_tokens: u32,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 20,
            batch_delay: Duration::from_millis(1000),
            rate_limit_backoff: Duration::from_millis(2000),
            temperature: 0.2,
            max_item_chars: 1500,
            max_output_tokens: 8192,
        }
    }
}

impl From<&AnalysisConfig> for BatchOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            rate_limit_backoff: Duration::from_millis(config.rate_limit_backoff_ms),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            ..Self::default()
        }
    }
}

/// Statistics for one or more batch runs
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchStats {
    /// Requests that produced a parsed answer or an error
    pub batches: usize,
    /// Batches that failed entirely
    pub failed_batches: usize,
    /// Items that received the fallback value
    pub fallback_items: usize,
    /// Times the processor switched API keys
    pub key_rotations: usize,
    /// Prompt tokens reported by the provider
    pub prompt_tokens: u64,
    /// Completion tokens reported by the provider
    pub completion_tokens: u64,
    /// Time spent waiting on the provider
    #[serde(skip)]
    pub api_duration: Duration,
}

impl BatchStats {
    /// Add token usage numbers
    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>) {
        self.prompt_tokens += prompt_tokens.unwrap_or(0);
        self.completion_tokens += completion_tokens.unwrap_or(0);
    }

    /// Fold another run into this one
    pub fn merge(&mut self, other: &BatchStats) {
        self.batches += other.batches;
        self.failed_batches += other.failed_batches;
        self.fallback_items += other.fallback_items;
        self.key_rotations += other.key_rotations;
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.api_duration += other.api_duration;
    }

    /// Total tokens
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} batches ({} failed), {} fallback items, {} key rotations, {} tokens in {:.1}s",
            self.batches,
            self.failed_batches,
            self.fallback_items,
            self.key_rotations,
            self.total_tokens(),
            self.api_duration.as_secs_f64()
        )
    }
}

/// Runs a `BatchTask` over a list of items
pub struct BatchProcessor<'a> {
    provider: &'a dyn LlmProvider,
    keys: &'a ApiKeyPool,
    options: BatchOptions,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(provider: &'a dyn LlmProvider, keys: &'a ApiKeyPool, options: BatchOptions) -> Self {
        Self { provider, keys, options }
    }

    /// Process every item; the result has one output per item, in input order
    pub async fn process<T: BatchTask>(
        &self,
        task: &T,
        items: &[BatchItem],
        progress: impl Fn(usize, usize),
    ) -> (Vec<T::Output>, BatchStats) {
        let mut stats = BatchStats::default();
        let mut outputs = Vec::with_capacity(items.len());
        let total = items.len();

        for (batch_number, batch) in items.chunks(self.options.batch_size.max(1)).enumerate() {
            if batch_number > 0 && !self.options.batch_delay.is_zero() {
                sleep(self.options.batch_delay).await;
            }

            match self.process_batch(task, batch, &mut stats).await {
                Ok(mut answers) => {
                    for item in batch {
                        match answers.remove(&item.index) {
                            Some(output) => outputs.push(output),
                            None => {
                                stats.fallback_items += 1;
                                outputs.push(task.fallback(item));
                            }
                        }
                    }
                },
                Err(e) => {
                    warn!("{} batch {} failed, using fallback values: {}", task.name(), batch_number + 1, e);
                    stats.failed_batches += 1;
                    stats.fallback_items += batch.len();
                    outputs.extend(batch.iter().map(|item| task.fallback(item)));
                }
            }

            progress(outputs.len(), total);
        }

        debug!("{}: {}", task.name(), stats.summary());
        (outputs, stats)
    }

    /// Send one batch, rotating keys on rate limits
    async fn process_batch<T: BatchTask>(
        &self,
        task: &T,
        batch: &[BatchItem],
        stats: &mut BatchStats,
    ) -> Result<HashMap<usize, T::Output>, AnalysisError> {
        let request = self.build_request(task, batch);
        // Every key once, then the first key again after the last backoff
        let max_attempts = self.keys.len() + 1;
        let mut attempt = 1;

        loop {
            let key = self.keys.current();
            let started = Instant::now();
            let result = self.provider.generate_json(&request, key).await;
            stats.api_duration += started.elapsed();

            match result {
                Ok(response) => {
                    stats.batches += 1;
                    stats.add_token_usage(response.prompt_tokens, response.completion_tokens);
                    return parse_results(task, &response.text, batch);
                },
                Err(e) if e.is_rate_limit() => {
                    if attempt >= max_attempts {
                        stats.batches += 1;
                        return Err(AnalysisError::KeysExhausted(self.keys.len()));
                    }
                    warn!("{} request rate limited (attempt {}/{}): {}", task.name(), attempt, max_attempts, e);
                    self.keys.rotate();
                    stats.key_rotations += 1;
                    attempt += 1;
                    sleep(self.options.rate_limit_backoff).await;
                },
                Err(e) => {
                    stats.batches += 1;
                    return Err(e.into());
                }
            }
        }
    }

    /// Build the prompt and schema for one batch
    pub fn build_request<T: BatchTask>(&self, task: &T, batch: &[BatchItem]) -> JsonRequest {
        let items: Vec<BatchItem> = batch.iter()
            .map(|item| BatchItem::new(item.index, truncate_chars(&item.text, self.options.max_item_chars)))
            .collect();
        let payload = serde_json::to_string(&items).unwrap_or_else(|_| "[]".to_string());

        let prompt = format!(
            "Process each of the following {} comments. Return a JSON object with a \"results\" array \
             holding exactly one entry per comment. Copy each comment's \"index\" unchanged into its entry.\n\n{}\n{}",
            items.len(),
            ITEMS_MARKER,
            payload
        );

        JsonRequest {
            system: task.system_prompt(),
            prompt,
            schema: results_schema(task.result_properties()),
            temperature: self.options.temperature,
            max_output_tokens: self.output_token_budget(&items),
        }
    }

    /// Output tokens to request for `items`, capped by the configured ceiling.
    ///
    /// Counts one token per input character so translations into denser
    /// scripts still fit.
    pub fn output_token_budget(&self, items: &[BatchItem]) -> u32 {
        let needed = items.iter()
            .map(|item| item.text.chars().count() + TOKENS_PER_ENTRY)
            .sum::<usize>()
            + TOKENS_PER_ANSWER;
        let ceiling = self.options.max_output_tokens as usize;

        if needed > ceiling {
            debug!("Batch of {} items may need {} output tokens, capped at {}", items.len(), needed, ceiling);
        }
        needed.min(ceiling) as u32
    }
}

/// Wrap per-entry properties into the `{"results": [...]}` answer schema
pub fn results_schema(properties: Value) -> Value {
    let mut entry_properties = Map::new();
    entry_properties.insert("index".to_string(), json!({"type": "integer"}));
    let mut required = vec![Value::String("index".to_string())];

    if let Value::Object(map) = properties {
        for (name, schema) in map {
            required.push(Value::String(name.clone()));
            entry_properties.insert(name, schema);
        }
    }

    json!({
        "type": "object",
        "properties": {
            "results": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": entry_properties,
                    "required": required,
                }
            }
        },
        "required": ["results"]
    })
}

/// Parse a model answer into per-index outputs
///
/// Entries with unknown indices are ignored. When an index appears twice the
/// first valid entry wins.
pub fn parse_results<T: BatchTask>(
    task: &T,
    text: &str,
    batch: &[BatchItem],
) -> Result<HashMap<usize, T::Output>, AnalysisError> {
    let json = extract_json(text)
        .ok_or_else(|| AnalysisError::MalformedOutput(preview(text)))?;
    let value: Value = serde_json::from_str(&json)
        .map_err(|e| AnalysisError::MalformedOutput(format!("{}: {}", e, preview(text))))?;

    let entries = match &value {
        Value::Array(entries) => entries,
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(entries)) => entries,
            _ => return Err(AnalysisError::MalformedOutput("missing \"results\" array".to_string())),
        },
        _ => return Err(AnalysisError::MalformedOutput(preview(text))),
    };

    let expected: HashMap<usize, ()> = batch.iter().map(|item| (item.index, ())).collect();
    let mut answers = HashMap::with_capacity(batch.len());

    for entry in entries {
        let Some(index) = entry_index(entry) else {
            debug!("Ignoring result entry without index: {}", entry);
            continue;
        };
        if !expected.contains_key(&index) {
            debug!("Ignoring result for unknown index {}", index);
            continue;
        }
        if answers.contains_key(&index) {
            continue;
        }
        if let Some(output) = task.parse_result(entry) {
            answers.insert(index, output);
        }
    }

    Ok(answers)
}

/// Index of a result entry, accepting numbers and numeric strings
fn entry_index(entry: &Value) -> Option<usize> {
    match entry.get("index")? {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extract a JSON document from model output that may carry prose or code fences
pub fn extract_json(response: &str) -> Option<String> {
    let trimmed = response.trim();

    // Leading document, possibly followed by prose
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        let mut values = serde_json::Deserializer::from_str(trimmed).into_iter::<Value>();
        if let Some(Ok(_)) = values.next() {
            return Some(trimmed[..values.byte_offset()].to_string());
        }
    }

    // Markdown code fence with language tag
    if let Some(start) = trimmed.find("```json") {
        if let Some(end) = trimmed[start + 7..].find("```") {
            return Some(trimmed[start + 7..start + 7 + end].trim().to_string());
        }
    }

    // Code fence without language tag
    if let Some(start) = trimmed.find("```") {
        if let Some(end) = trimmed[start + 3..].find("```") {
            let json = trimmed[start + 3..start + 3 + end].trim();
            if json.starts_with('{') || json.starts_with('[') {
                return Some(json.to_string());
            }
        }
    }

    // First { to last }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            return Some(trimmed[start..=end].to_string());
        }
    }

    None
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

fn preview(text: &str) -> String {
    text.chars().take(120).collect()
}
