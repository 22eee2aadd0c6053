use serde_json::{json, Value};

use super::batch::{BatchItem, BatchTask};
use super::{Category, Classification, Sentiment};

/// Translate comments into one target language
#[derive(Debug, Clone)]
pub struct TranslationTask {
    /// English name of the target language, e.g. "German"
    target_language: String,
}

impl TranslationTask {
    pub fn new(target_language: impl Into<String>) -> Self {
        Self { target_language: target_language.into() }
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }
}

impl BatchTask for TranslationTask {
    type Output = String;

    fn name(&self) -> &str {
        "translation"
    }

    fn system_prompt(&self) -> String {
        format!(
            "You translate YouTube comments into {lang}. Keep the meaning, tone, slang, emoji, \
             @mentions and timestamps. Do not add explanations. If a comment is already written \
             in {lang}, return it unchanged.",
            lang = self.target_language
        )
    }

    fn result_properties(&self) -> Value {
        json!({
            "translation": {"type": "string"}
        })
    }

    fn parse_result(&self, entry: &Value) -> Option<String> {
        let translation = entry.get("translation")?.as_str()?.trim();
        if translation.is_empty() {
            None
        } else {
            Some(translation.to_string())
        }
    }

    /// The untranslated text
    fn fallback(&self, item: &BatchItem) -> String {
        item.text.clone()
    }
}

/// Assign a sentiment and a category to each comment
#[derive(Debug, Clone, Default)]
pub struct ClassificationTask;

impl ClassificationTask {
    pub fn new() -> Self {
        Self
    }
}

impl BatchTask for ClassificationTask {
    type Output = Classification;

    fn name(&self) -> &str {
        "classification"
    }

    fn system_prompt(&self) -> String {
        let categories: Vec<&str> = Category::TAXONOMY.iter().map(|c| c.label()).collect();
        format!(
            "You classify YouTube comments. For each comment give its sentiment \
             (positive, neutral or negative) and exactly one category from: {}. \
             Use \"other\" when nothing fits. Judge the comment in its own language.",
            categories.join(", ")
        )
    }

    fn result_properties(&self) -> Value {
        let sentiments: Vec<&str> = Sentiment::ALL.iter().map(|s| s.label()).collect();
        let categories: Vec<&str> = Category::TAXONOMY.iter().map(|c| c.label()).collect();
        json!({
            "sentiment": {"type": "string", "enum": sentiments},
            "category": {"type": "string", "enum": categories}
        })
    }

    fn parse_result(&self, entry: &Value) -> Option<Classification> {
        let sentiment = Sentiment::from_label(entry.get("sentiment")?.as_str()?)?;
        let category = entry.get("category")
            .and_then(Value::as_str)
            .map(Category::from_label)
            .unwrap_or(Category::Other);
        Some(Classification { sentiment, category })
    }

    /// Neutral and unclassified
    fn fallback(&self, _item: &BatchItem) -> Classification {
        Classification::default()
    }
}
