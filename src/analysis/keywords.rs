use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Word tokens: a letter followed by letters, digits or inner apostrophes
static WORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\p{L}[\p{L}\p{N}']*").expect("valid word regex")
});

/// Minimum token length in characters
pub const MIN_KEYWORD_CHARS: usize = 3;

/// Keywords attached to each comment
pub const KEYWORDS_PER_COMMENT: usize = 3;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // English
        "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
        "one", "our", "out", "has", "him", "his", "how", "man", "new", "now", "old", "see", "two",
        "way", "who", "its", "did", "get", "got", "let", "say", "she", "too", "use", "yes", "yeah",
        "this", "that", "with", "have", "from", "they", "will", "would", "there", "their", "what",
        "about", "which", "when", "make", "like", "just", "than", "then", "them", "these", "some",
        "been", "were", "into", "more", "very", "your", "also", "only", "even", "much", "here",
        "it's", "i'm", "don't", "can't", "that's", "you're", "doesn't", "didn't", "isn't",
        "really", "because", "could", "should", "being", "does", "why", "where", "each", "other",
        "over", "such", "after", "before", "still", "every", "those", "well", "ever", "always",
        "know", "think", "thing", "things", "going", "want", "need", "video", "videos", "watch",
        // German, Spanish, French fillers common in comment sections
        "der", "die", "das", "und", "ist", "nicht", "ich", "ein", "eine", "mit", "auf", "für",
        "que", "los", "las", "por", "con", "para", "una", "del", "pero", "más", "esto", "este",
        "les", "des", "est", "pas", "une", "pour", "qui", "dans", "sur", "avec", "mais", "c'est",
    ]
    .into_iter()
    .collect()
});

/// A keyword with its number of occurrences across all comments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub word: String,
    pub count: usize,
}

/// Most frequent words across a set of comments
#[derive(Debug, Clone, Default, Serialize)]
pub struct KeywordTable {
    /// Sorted by descending count, then alphabetically
    entries: Vec<KeywordCount>,
}

impl KeywordTable {
    /// Count tokens of at least three characters, skip stop words and keep the top `size`
    pub fn build<'a>(texts: impl IntoIterator<Item = &'a str>, size: usize) -> Self {
        let mut counts: HashMap<String, usize> = HashMap::new();

        for text in texts {
            for token in tokenize(text) {
                *counts.entry(token).or_insert(0) += 1;
            }
        }

        let mut entries: Vec<KeywordCount> = counts.into_iter()
            .map(|(word, count)| KeywordCount { word, count })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
        entries.truncate(size);

        Self { entries }
    }

    pub fn entries(&self) -> &[KeywordCount] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `limit` table entries found in `text` by substring match, in table order
    pub fn top_keywords(&self, text: &str, limit: usize) -> Vec<String> {
        let lower = text.to_lowercase();
        self.entries.iter()
            .filter(|entry| lower.contains(entry.word.as_str()))
            .take(limit)
            .map(|entry| entry.word.clone())
            .collect()
    }
}

/// Lowercased tokens that can be keywords
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    WORD_REGEX.find_iter(text)
        .map(|m| m.as_str().trim_end_matches('\'').to_lowercase())
        .filter(|word| word.chars().count() >= MIN_KEYWORD_CHARS && !STOP_WORDS.contains(word.as_str()))
}
