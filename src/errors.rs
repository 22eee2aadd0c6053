/*!
 * Error types for the ytcomments application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with LLM provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether switching to another API key may help
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimitExceeded(_))
    }
}

/// Errors that can occur while fetching videos and comments
#[derive(Error, Debug)]
pub enum FetchError {
    /// The input could not be resolved to a video id
    #[error("Invalid video URL or id: {0}")]
    InvalidVideoId(String),

    /// Daily API quota is used up
    #[error("YouTube API quota exceeded, try again tomorrow or use another API key")]
    QuotaExceeded,

    /// The uploader disabled comments
    #[error("Comments are disabled for video {0}")]
    CommentsDisabled(String),

    /// The video does not exist or is private
    #[error("Video not found: {0}")]
    VideoNotFound(String),

    /// Any other 403 (bad key, restricted API)
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Non-retryable API error
    #[error("YouTube API error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Transport failure after all retries
    #[error("Network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape
    #[error("Failed to parse YouTube response: {0}")]
    Parse(String),
}

impl FetchError {
    /// Whether a request that failed with this error is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            _ => false,
        }
    }
}

/// Errors that can occur during LLM batch analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The model answered, but not with the requested JSON
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    /// Every configured API key was rate limited for this batch
    #[error("All {0} API keys are rate limited")]
    KeysExhausted(usize),
}

/// Errors that can occur while writing export files
#[derive(Error, Debug)]
pub enum ExportError {
    /// Error from a file operation
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the CSV writer
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error serializing the JSON report
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
