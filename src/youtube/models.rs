/*!
 * Wire types of the YouTube Data API v3 and their conversion into
 * the crate's comment model.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::comments::Comment;

/// Page of `commentThreads.list`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadListResponse {
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<CommentThreadResource>,
}

/// A single comment thread
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadResource {
    pub id: String,
    pub snippet: CommentThreadSnippet,
    /// Up to five replies delivered with the thread
    #[serde(default)]
    pub replies: Option<ThreadReplies>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadSnippet {
    pub top_level_comment: CommentResource,
    #[serde(default)]
    pub total_reply_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct ThreadReplies {
    #[serde(default)]
    pub comments: Vec<CommentResource>,
}

/// Page of `comments.list`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentListResponse {
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<CommentResource>,
}

#[derive(Debug, Deserialize)]
pub struct CommentResource {
    pub id: String,
    pub snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSnippet {
    #[serde(default)]
    pub author_display_name: String,
    #[serde(default)]
    pub text_display: String,
    #[serde(default)]
    pub text_original: String,
    #[serde(default)]
    pub like_count: u64,
    pub published_at: DateTime<Utc>,
}

impl CommentResource {
    /// Convert into a comment without replies
    pub fn into_comment(self) -> Comment {
        let content = if self.snippet.text_display.is_empty() {
            self.snippet.text_original
        } else {
            self.snippet.text_display
        };

        Comment {
            id: self.id,
            published_at: self.snippet.published_at,
            author: self.snippet.author_display_name,
            content,
            like_count: self.snippet.like_count,
            reply_count: 0,
            replies: Vec::new(),
        }
    }
}

impl CommentThreadResource {
    /// Convert into a top-level comment carrying the inline reply preview.
    ///
    /// `reply_count` holds the API total, which may exceed the preview.
    pub fn into_comment(self) -> Comment {
        let total_reply_count = self.snippet.total_reply_count;
        let replies: Vec<Comment> = self.replies
            .map(|r| r.comments.into_iter().map(CommentResource::into_comment).collect())
            .unwrap_or_default();

        let mut comment = self.snippet.top_level_comment.into_comment();
        comment.reply_count = total_reply_count.max(replies.len());
        comment.replies = replies;
        comment
    }
}

/// Page of `videos.list`
#[derive(Debug, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
pub struct VideoResource {
    pub id: String,
    pub snippet: VideoSnippet,
    #[serde(default)]
    pub statistics: VideoStatistics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel_title: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Counters arrive as decimal strings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub comment_count: Option<String>,
}

fn parse_count(value: &Option<String>) -> u64 {
    value.as_deref().and_then(|v| v.parse().ok()).unwrap_or(0)
}

/// Video metadata shown in the summary sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub channel_title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
}

impl VideoInfo {
    /// Metadata with only the id known
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            channel_title: String::new(),
            published_at: None,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
        }
    }
}

impl From<VideoResource> for VideoInfo {
    fn from(video: VideoResource) -> Self {
        Self {
            view_count: parse_count(&video.statistics.view_count),
            like_count: parse_count(&video.statistics.like_count),
            comment_count: parse_count(&video.statistics.comment_count),
            id: video.id,
            title: video.snippet.title,
            channel_title: video.snippet.channel_title,
            published_at: video.snippet.published_at,
        }
    }
}

/// Error envelope returned with non-2xx responses
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub reason: String,
}

impl ApiErrorResponse {
    /// First machine-readable reason, e.g. `quotaExceeded`
    pub fn reason(&self) -> Option<&str> {
        self.error.errors.first().map(|e| e.reason.as_str())
    }
}
