/*!
 * YouTube comment acquisition.
 *
 * - `client`: REST client for the Data API v3 with retry and backoff
 * - `fetcher`: pagination, deduplication and reply tree reconstruction
 * - `models`: API wire types
 */

use async_trait::async_trait;
use url::Url;

use crate::comments::Comment;
use crate::errors::FetchError;

pub use self::client::YouTubeClient;
pub use self::fetcher::{CommentFetcher, FetchOptions, FetchProgress};
pub use self::models::VideoInfo;

pub mod client;
pub mod fetcher;
pub mod models;

/// One page of top-level comment threads
#[derive(Debug, Clone, Default)]
pub struct ThreadPage {
    /// Threads with their inline reply preview
    pub threads: Vec<Comment>,
    /// Continuation token, absent on the last page
    pub next_page_token: Option<String>,
}

/// One page of replies to a single thread
#[derive(Debug, Clone, Default)]
pub struct ReplyPage {
    pub replies: Vec<Comment>,
    pub next_page_token: Option<String>,
}

/// Source of videos and comments
///
/// Implemented by [`YouTubeClient`]; tests substitute an in-memory source.
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// Fetch video metadata
    async fn video_info(&self, video_id: &str) -> Result<VideoInfo, FetchError>;

    /// Fetch one page of comment threads
    async fn thread_page(&self, video_id: &str, page_token: Option<&str>) -> Result<ThreadPage, FetchError>;

    /// Fetch one page of replies to `parent_id`
    async fn reply_page(&self, parent_id: &str, page_token: Option<&str>) -> Result<ReplyPage, FetchError>;
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract the video id from a bare id or any common YouTube URL form
pub fn parse_video_id(input: &str) -> Result<String, FetchError> {
    let trimmed = input.trim();
    if is_video_id(trimmed) {
        return Ok(trimmed.to_string());
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&with_scheme).map_err(|_| FetchError::InvalidVideoId(input.to_string()))?;
    let host = url.host_str().unwrap_or_default().trim_start_matches("www.").trim_start_matches("m.");
    let segments: Vec<&str> = url.path_segments().map(|s| s.filter(|p| !p.is_empty()).collect()).unwrap_or_default();

    let candidate = match host {
        "youtu.be" => segments.first().map(|s| s.to_string()),
        "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => match segments.as_slice() {
            ["watch"] => url.query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            ["shorts" | "embed" | "live" | "v", id, ..] => Some(id.to_string()),
            _ => None,
        },
        _ => None,
    };

    candidate
        .filter(|id| is_video_id(id))
        .ok_or_else(|| FetchError::InvalidVideoId(input.to_string()))
}
