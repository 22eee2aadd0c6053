use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;

use crate::filter::FilterOptions;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// YouTube Data API settings
    #[serde(default)]
    pub youtube: YouTubeConfig,

    /// Comment filter toggles
    #[serde(default)]
    pub filter: FilterOptions,

    /// LLM analysis settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Order in which comment threads are requested
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommentOrder {
    #[default]
    Relevance,
    Time,
}

impl CommentOrder {
    // @returns: Value of the `order` query parameter
    pub fn as_query_value(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::Time => "time",
        }
    }
}

/// YouTube Data API configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct YouTubeConfig {
    /// API key for the YouTube Data API v3
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Base URL of the API
    #[serde(default = "default_youtube_endpoint")]
    pub endpoint: String,

    /// Threads requested per page (API maximum is 100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Maximum number of thread pages to crawl (0 = no limit)
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Stop after this many top-level comments (0 = no limit)
    #[serde(default)]
    pub max_comments: usize,

    /// Thread ordering
    #[serde(default)]
    pub order: CommentOrder,

    /// Fetch the complete reply list when the thread only carries a preview
    #[serde(default = "default_true")]
    pub fetch_all_replies: bool,

    /// Number of reply lists fetched concurrently
    #[serde(default = "default_reply_batch_size")]
    pub reply_batch_size: usize,

    /// Delay between reply batches in milliseconds
    #[serde(default = "default_reply_batch_delay_ms")]
    pub reply_batch_delay_ms: u64,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_youtube_endpoint(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            max_comments: 0,
            order: CommentOrder::default(),
            fetch_all_replies: true,
            reply_batch_size: default_reply_batch_size(),
            reply_batch_delay_ms: default_reply_batch_delay_ms(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// LLM provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    // @provider: Google Gemini (native JSON schema support)
    #[default]
    Gemini,
    // @provider: OpenAI and compatible servers
    OpenAI,
    // @provider: Anthropic
    Anthropic,
}

impl LlmProviderKind {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Gemini => "Gemini",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Gemini => "gemini".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
        }
    }
}

impl std::fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for LlmProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API keys, rotated when one is rate limited
    #[serde(default)]
    pub api_keys: Vec<String>,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: LlmProviderKind) -> Self {
        let (model, endpoint) = match provider_type {
            LlmProviderKind::Gemini => (default_gemini_model(), default_gemini_endpoint()),
            LlmProviderKind::OpenAI => (default_openai_model(), default_openai_endpoint()),
            LlmProviderKind::Anthropic => (default_anthropic_model(), default_anthropic_endpoint()),
        };

        Self {
            provider_type: provider_type.to_lowercase_string(),
            model,
            api_keys: Vec::new(),
            endpoint,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// LLM analysis configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: LlmProviderKind,

    /// Available providers
    #[serde(default = "default_providers")]
    pub available_providers: Vec<ProviderConfig>,

    /// Translate comment text into `target_language`
    #[serde(default)]
    pub translate: bool,

    /// Classify sentiment and category
    #[serde(default)]
    pub classify: bool,

    /// Target language code for translation (ISO 639-1 or 639-2)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Comments sent per LLM request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Delay between consecutive batches in milliseconds
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Wait before retrying a rate limited batch with the next key
    #[serde(default = "default_rate_limit_backoff_ms")]
    pub rate_limit_backoff_ms: u64,

    /// Temperature parameter for generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Size of the global keyword frequency table
    #[serde(default = "default_keyword_table_size")]
    pub keyword_table_size: usize,

    /// Ceiling for the output tokens requested per batch
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            available_providers: default_providers(),
            translate: false,
            classify: false,
            target_language: default_target_language(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            rate_limit_backoff_ms: default_rate_limit_backoff_ms(),
            temperature: default_temperature(),
            keyword_table_size: default_keyword_table_size(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl AnalysisConfig {
    /// Whether any LLM stage is enabled
    pub fn uses_llm(&self) -> bool {
        self.translate || self.classify
    }

    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.provider.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider configuration, creating it if missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let position = self.available_providers.iter()
            .position(|p| p.provider_type == provider_str);

        match position {
            Some(index) => &mut self.available_providers[index],
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider.clone()));
                let last = self.available_providers.len() - 1;
                &mut self.available_providers[last]
            }
        }
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        match self.provider {
            LlmProviderKind::Gemini => default_gemini_model(),
            LlmProviderKind::OpenAI => default_openai_model(),
            LlmProviderKind::Anthropic => default_anthropic_model(),
        }
    }

    /// Get the non-empty API keys for the active provider
    pub fn get_api_keys(&self) -> Vec<String> {
        self.get_active_provider_config()
            .map(|p| p.api_keys.iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            LlmProviderKind::Gemini => default_gemini_endpoint(),
            LlmProviderKind::OpenAI => default_openai_endpoint(),
            LlmProviderKind::Anthropic => default_anthropic_endpoint(),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or_else(default_llm_timeout_secs)
    }
}

/// Export configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExportConfig {
    /// Directory receiving the sheets
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Also write the full report as JSON
    #[serde(default)]
    pub write_json: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            write_json: false,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_youtube_endpoint() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_max_pages() -> usize {
    50
}

fn default_reply_batch_size() -> usize {
    10
}

fn default_reply_batch_delay_ms() -> u64 {
    200
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_target_language() -> String {
    "en".to_string()
}

fn default_batch_size() -> usize {
    20
}

fn default_batch_delay_ms() -> u64 {
    1000
}

fn default_rate_limit_backoff_ms() -> u64 {
    2000
}

fn default_temperature() -> f32 {
    0.2
}

fn default_keyword_table_size() -> usize {
    50
}

fn default_output_dir() -> String {
    "output".to_string()
}

/// Smallest output budget that still fits one batch answer
const MIN_OUTPUT_TOKENS: u32 = 256;

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new(LlmProviderKind::Gemini),
        ProviderConfig::new(LlmProviderKind::OpenAI),
        ProviderConfig::new(LlmProviderKind::Anthropic),
    ]
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.youtube.api_key.trim().is_empty() {
            return Err(anyhow!("YouTube API key is required (youtube.api_key or YOUTUBE_API_KEY)"));
        }

        if self.youtube.page_size == 0 || self.youtube.page_size > 100 {
            return Err(anyhow!("youtube.page_size must be between 1 and 100, got {}", self.youtube.page_size));
        }

        if self.youtube.reply_batch_size == 0 {
            return Err(anyhow!("youtube.reply_batch_size must be at least 1"));
        }

        if self.analysis.uses_llm() {
            if self.analysis.batch_size == 0 {
                return Err(anyhow!("analysis.batch_size must be at least 1"));
            }

            if self.analysis.max_output_tokens < MIN_OUTPUT_TOKENS {
                return Err(anyhow!(
                    "analysis.max_output_tokens must be at least {}, got {}",
                    MIN_OUTPUT_TOKENS,
                    self.analysis.max_output_tokens
                ));
            }

            if self.analysis.get_api_keys().is_empty() {
                return Err(anyhow!(
                    "At least one API key is required for the {} provider",
                    self.analysis.provider.display_name()
                ));
            }
        }

        if self.analysis.translate {
            let _target_name = crate::language_utils::get_language_name(&self.analysis.target_language)?;
        }

        Ok(())
    }
}
