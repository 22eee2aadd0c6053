/*!
 * Flat, export-ready view of an analyzed comment set.
 */

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::keywords::KeywordCount;
use crate::analysis::{AnalysisResult, BatchStats, Category, Sentiment};
use crate::comments::Comment;
use crate::filter::FilterStats;
use crate::youtube::VideoInfo;

/// One comment as a table row; replies follow their parent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRow {
    /// 1-based number of the thread the comment belongs to
    pub thread: usize,
    pub comment_id: String,
    /// Set for replies
    pub parent_id: Option<String>,
    pub author: String,
    pub published_at: DateTime<Utc>,
    pub like_count: u64,
    /// Replies kept after filtering; zero for replies
    pub reply_count: usize,
    /// Plain text content
    pub text: String,
    pub translation: Option<String>,
    pub analysis: Option<AnalysisResult>,
}

impl CommentRow {
    fn from_comment(thread: usize, comment: &Comment, parent_id: Option<&str>) -> Self {
        Self {
            thread,
            comment_id: comment.id.clone(),
            parent_id: parent_id.map(str::to_string),
            author: comment.author.clone(),
            published_at: comment.published_at,
            like_count: comment.like_count,
            reply_count: comment.replies.len(),
            text: comment.plain_text(),
            translation: None,
            analysis: None,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Translation when present, otherwise the original text
    pub fn display_text(&self) -> &str {
        self.translation.as_deref().unwrap_or(&self.text)
    }
}

/// Flatten threads into rows: each parent, then its replies
pub fn flatten_threads(threads: &[Comment]) -> Vec<CommentRow> {
    let mut rows = Vec::with_capacity(crate::comments::count_all(threads));
    for (i, parent) in threads.iter().enumerate() {
        rows.push(CommentRow::from_comment(i + 1, parent, None));
        for reply in &parent.replies {
            rows.push(CommentRow::from_comment(i + 1, reply, Some(&parent.id)));
        }
    }
    rows
}

/// Everything the exporter writes for one video
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub video: VideoInfo,
    pub generated_at: DateTime<Utc>,
    /// Comments fetched before filtering
    pub fetched_comments: usize,
    pub filter_stats: FilterStats,
    /// Target language name when translation ran
    pub target_language: Option<String>,
    /// Provider and model when analysis ran
    pub analysis_provider: Option<String>,
    pub analysis_stats: Option<BatchStats>,
    pub keywords: Vec<KeywordCount>,
    pub rows: Vec<CommentRow>,
}

impl Report {
    pub fn new(video: VideoInfo, rows: Vec<CommentRow>) -> Self {
        Self {
            video,
            generated_at: Utc::now(),
            fetched_comments: rows.len(),
            filter_stats: FilterStats::default(),
            target_language: None,
            analysis_provider: None,
            analysis_stats: None,
            keywords: Vec::new(),
            rows,
        }
    }

    pub fn thread_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_reply()).count()
    }

    pub fn reply_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_reply()).count()
    }

    /// Rows per sentiment, in `Sentiment::ALL` order; empty without analysis
    pub fn sentiment_distribution(&self) -> Vec<(Sentiment, usize)> {
        if !self.has_analysis() {
            return Vec::new();
        }
        Sentiment::ALL.iter()
            .map(|s| (*s, self.analyses().filter(|a| a.sentiment == *s).count()))
            .collect()
    }

    /// Rows per category, taxonomy order then `Unclassified`; empty without analysis
    pub fn category_distribution(&self) -> Vec<(Category, usize)> {
        if !self.has_analysis() {
            return Vec::new();
        }
        Category::TAXONOMY.iter()
            .chain(std::iter::once(&Category::Unclassified))
            .map(|c| (*c, self.analyses().filter(|a| a.category == *c).count()))
            .collect()
    }

    pub fn has_analysis(&self) -> bool {
        self.rows.iter().any(|r| r.analysis.is_some())
    }

    fn analyses(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.rows.iter().filter_map(|r| r.analysis.as_ref())
    }
}
