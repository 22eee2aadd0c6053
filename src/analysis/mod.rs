/*!
 * LLM-backed comment analysis.
 *
 * - `batch`: generic batch processor with index reconciliation, fallbacks
 *   and API key rotation
 * - `tasks`: translation and classification tasks
 * - `keywords`: global keyword frequency table
 * - `analyzer`: runs the enabled tasks over report rows
 */

use serde::{Deserialize, Serialize};
use std::fmt;

pub use self::analyzer::Analyzer;
pub use self::batch::{BatchItem, BatchOptions, BatchProcessor, BatchStats, BatchTask};
pub use self::keywords::KeywordTable;
pub use self::tasks::{ClassificationTask, TranslationTask};

pub mod analyzer;
pub mod batch;
pub mod keywords;
pub mod tasks;

/// Overall tone of a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Self::Positive, Self::Neutral, Self::Negative];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }

    /// Parse a model label, case-insensitively
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        Self::ALL.into_iter().find(|s| s.label() == label)
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Comment category taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Praise,
    Criticism,
    Question,
    Suggestion,
    Discussion,
    Humor,
    Other,
    /// Classification failed or was not returned
    #[default]
    Unclassified,
}

impl Category {
    /// Categories offered to the model
    pub const TAXONOMY: [Category; 7] = [
        Self::Praise,
        Self::Criticism,
        Self::Question,
        Self::Suggestion,
        Self::Discussion,
        Self::Humor,
        Self::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Praise => "praise",
            Self::Criticism => "criticism",
            Self::Question => "question",
            Self::Suggestion => "suggestion",
            Self::Discussion => "discussion",
            Self::Humor => "humor",
            Self::Other => "other",
            Self::Unclassified => "unclassified",
        }
    }

    /// Parse a model label; anything outside the taxonomy becomes `Other`
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        Self::TAXONOMY.into_iter()
            .find(|c| c.label() == label)
            .unwrap_or(Self::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sentiment and category of one comment, as returned by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub category: Category,
}

/// Per-comment analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AnalysisResult {
    pub sentiment: Sentiment,
    pub category: Category,
    /// At most three entries of the global keyword table
    pub keywords: Vec<String>,
}
