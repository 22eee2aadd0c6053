/*!
 * Comment model shared by the fetcher, filters, analysis and export.
 *
 * A comment thread is a tree of depth at most two: a top-level comment
 * and the flat list of replies attached to it.
 */

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static LINE_BREAK_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid line break regex"));

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid entity regex"));

/// A YouTube comment, either top-level or a reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment id as issued by the API
    pub id: String,

    /// Publication time
    pub published_at: DateTime<Utc>,

    /// Author display name
    pub author: String,

    /// Raw HTML content (`textDisplay`)
    pub content: String,

    /// Like count
    pub like_count: u64,

    /// Number of replies; equals `replies.len()` once the thread is filtered
    pub reply_count: usize,

    /// Replies, oldest first. Always empty for replies.
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    /// Create a comment without replies, published now
    pub fn new(id: impl Into<String>, author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            published_at: Utc::now(),
            author: author.into(),
            content: content.into(),
            like_count: 0,
            reply_count: 0,
            replies: Vec::new(),
        }
    }

    /// Attach replies and sync the reply count
    pub fn with_replies(mut self, replies: Vec<Comment>) -> Self {
        self.reply_count = replies.len();
        self.replies = replies;
        self
    }

    /// Set the like count
    pub fn with_likes(mut self, like_count: u64) -> Self {
        self.like_count = like_count;
        self
    }

    /// Content with HTML markup removed and entities decoded
    pub fn plain_text(&self) -> String {
        strip_html(&self.content)
    }

    /// Key used for content-based deduplication
    pub fn content_key(&self) -> String {
        self.plain_text().trim().to_string()
    }

    /// Number of comments in this thread, the parent included
    pub fn thread_size(&self) -> usize {
        1 + self.replies.len()
    }
}

/// Remove HTML tags from API content and decode the entities YouTube emits
pub fn strip_html(html: &str) -> String {
    let with_breaks = LINE_BREAK_TAG.replace_all(html, "\n");
    let without_tags = HTML_TAG.replace_all(&with_breaks, "");

    let decoded = NUMERIC_ENTITY.replace_all(&without_tags, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });

    // &amp; last so "&amp;lt;" stays "&lt;"
    decoded
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Remembers ids and content keys across several batches of comments
#[derive(Debug, Default)]
pub struct Deduper {
    seen_ids: HashSet<String>,
    seen_content: HashSet<String>,
}

impl Deduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when neither the id nor the content was seen before
    pub fn admit(&mut self, comment: &Comment) -> bool {
        if !self.seen_ids.insert(comment.id.clone()) {
            return false;
        }
        self.seen_content.insert(comment.content_key())
    }
}

/// Drop comments whose id or trimmed plain content was already seen.
///
/// The first occurrence wins and order is preserved.
pub fn dedupe_comments(comments: Vec<Comment>) -> Vec<Comment> {
    let mut deduper = Deduper::new();
    comments.into_iter().filter(|comment| deduper.admit(comment)).collect()
}

/// Total number of comments across threads, replies included
pub fn count_all(threads: &[Comment]) -> usize {
    threads.iter().map(Comment::thread_size).sum()
}
