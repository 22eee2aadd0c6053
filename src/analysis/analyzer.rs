use anyhow::Result;
use log::info;

use crate::app_config::AnalysisConfig;
use crate::language_utils;
use crate::providers::{create_provider, ApiKeyPool, LlmProvider};
use crate::report::CommentRow;

use super::batch::{BatchItem, BatchOptions, BatchProcessor, BatchStats};
use super::keywords::{KeywordTable, KEYWORDS_PER_COMMENT};
use super::tasks::{ClassificationTask, TranslationTask};
use super::AnalysisResult;

/// Outcome of an analysis run
#[derive(Debug, Clone, Default)]
pub struct AnalysisSummary {
    pub stats: BatchStats,
    pub keywords: KeywordTable,
}

/// Runs the enabled LLM tasks over report rows
#[derive(Debug)]
pub struct Analyzer {
    provider: Box<dyn LlmProvider>,
    keys: ApiKeyPool,
    options: BatchOptions,
    translation: Option<TranslationTask>,
    classify: bool,
    keyword_table_size: usize,
}

impl Analyzer {
    /// Analyzer with no task enabled
    pub fn new(provider: Box<dyn LlmProvider>, keys: ApiKeyPool, options: BatchOptions) -> Self {
        Self {
            provider,
            keys,
            options,
            translation: None,
            classify: false,
            keyword_table_size: 50,
        }
    }

    /// Build the configured provider, key pool and tasks
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        let keys = ApiKeyPool::new(config.get_api_keys())?;
        let mut analyzer = Self::new(create_provider(config), keys, BatchOptions::from(config))
            .with_classification(config.classify)
            .with_keyword_table_size(config.keyword_table_size);

        if config.translate {
            let name = language_utils::get_language_name(&config.target_language)?;
            analyzer = analyzer.with_translation(name);
        }
        Ok(analyzer)
    }

    /// Translate into the named language
    pub fn with_translation(mut self, target_language: impl Into<String>) -> Self {
        self.translation = Some(TranslationTask::new(target_language));
        self
    }

    /// Enable sentiment and category classification
    pub fn with_classification(mut self, classify: bool) -> Self {
        self.classify = classify;
        self
    }

    /// Number of entries in the global keyword table
    pub fn with_keyword_table_size(mut self, size: usize) -> Self {
        self.keyword_table_size = size;
        self
    }

    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }

    pub fn target_language(&self) -> Option<&str> {
        self.translation.as_ref().map(|t| t.target_language())
    }

    /// Fill `translation` and `analysis` of every row
    ///
    /// Failed batches leave fallback values in place; this never fails.
    /// Keywords are counted over translations when present.
    pub async fn analyze(
        &self,
        rows: &mut [CommentRow],
        progress: impl Fn(&str, usize, usize),
    ) -> AnalysisSummary {
        let processor = BatchProcessor::new(self.provider.as_ref(), &self.keys, self.options.clone());
        let mut stats = BatchStats::default();

        if let Some(task) = &self.translation {
            info!("Translating {} comments into {}", rows.len(), task.target_language());
            let items = to_items(rows);
            let (translations, task_stats) = processor
                .process(task, &items, |done, total| progress("Translating", done, total))
                .await;
            for (row, translation) in rows.iter_mut().zip(translations) {
                row.translation = Some(translation);
            }
            stats.merge(&task_stats);
        }

        let keywords = KeywordTable::build(rows.iter().map(|r| r.display_text()), self.keyword_table_size);

        if self.classify {
            info!("Classifying {} comments", rows.len());
            let items = to_items(rows);
            let task = ClassificationTask::new();
            let (classifications, task_stats) = processor
                .process(&task, &items, |done, total| progress("Classifying", done, total))
                .await;
            for (row, classification) in rows.iter_mut().zip(classifications) {
                row.analysis = Some(AnalysisResult {
                    sentiment: classification.sentiment,
                    category: classification.category,
                    keywords: keywords.top_keywords(row.display_text(), KEYWORDS_PER_COMMENT),
                });
            }
            stats.merge(&task_stats);
        }

        info!("Analysis finished: {}", stats.summary());
        AnalysisSummary { stats, keywords }
    }
}

/// Batch items indexed by row position; classification reads translations when present
fn to_items(rows: &[CommentRow]) -> Vec<BatchItem> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| BatchItem::new(i, row.display_text()))
        .collect()
}
