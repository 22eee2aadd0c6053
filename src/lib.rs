/*!
 * # ytcomments - YouTube comment export with AI analysis
 *
 * A Rust library for collecting the comments of a YouTube video, cleaning
 * them up and exporting them as spreadsheets.
 *
 * ## Features
 *
 * - Fetch every comment thread of a video through the YouTube Data API v3,
 *   including complete reply lists
 * - Remove duplicates, emoji-only comments, advertisements and generic noise
 * - Translate and classify comments with an LLM provider:
 *   - Google Gemini
 *   - OpenAI API
 *   - Anthropic API
 * - Rotate across several API keys when a provider rate limits
 * - Export CSV sheets (comments and summary) plus an optional JSON report
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `comments`: Comment model, HTML stripping and deduplication
 * - `youtube`: API client, wire models and the paginating fetcher
 * - `filter`: Comment filters
 * - `providers`: Client implementations for LLM providers and key rotation
 * - `analysis`: Batched translation, classification and keyword extraction
 * - `report`: Flat rows and summary data for export
 * - `export`: CSV and JSON writers
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod analysis;
pub mod app_config;
pub mod app_controller;
pub mod comments;
pub mod errors;
pub mod export;
pub mod file_utils;
pub mod filter;
pub mod language_utils;
pub mod providers;
pub mod report;
pub mod youtube;

// Re-export main types for easier usage
pub use analysis::{AnalysisResult, Analyzer, Category, Sentiment};
pub use app_config::Config;
pub use comments::{dedupe_comments, Comment};
pub use errors::{AnalysisError, ExportError, FetchError, ProviderError};
pub use export::WorkbookExporter;
pub use filter::{apply_filters, FilterOptions};
pub use language_utils::{get_language_name, normalize_to_part2t};
pub use report::{CommentRow, Report};
pub use youtube::{parse_video_id, CommentFetcher, YouTubeClient};
