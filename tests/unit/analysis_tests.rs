/*!
 * Tests for batch analysis: index reconciliation, fallbacks, key rotation and keywords
 */

use std::time::Duration;
use ytcomments::analysis::batch::{BatchItem, BatchOptions, BatchProcessor};
use ytcomments::analysis::{Category, ClassificationTask, KeywordTable, Sentiment, TranslationTask};
use ytcomments::providers::mock::{MockBehavior, MockProvider};
use ytcomments::providers::{ApiKeyPool, JsonRequest};

fn options(batch_size: usize) -> BatchOptions {
    BatchOptions {
        batch_size,
        batch_delay: Duration::ZERO,
        rate_limit_backoff: Duration::ZERO,
        ..BatchOptions::default()
    }
}

fn items(count: usize) -> Vec<BatchItem> {
    (0..count).map(|i| BatchItem::new(i, format!("comment {}", i))).collect()
}

fn keys(names: &[&str]) -> ApiKeyPool {
    ApiKeyPool::new(names.iter().map(|k| k.to_string()).collect()).unwrap()
}

/// Reverses the result order and adds a stray index
fn shuffled_response(request: &JsonRequest) -> String {
    let mut results: Vec<serde_json::Value> = MockProvider::parse_items(&request.prompt)
        .iter()
        .map(|(index, text)| MockProvider::result_for(*index, text))
        .collect();
    results.reverse();
    results.push(serde_json::json!({"index": 10_000, "translation": "stray"}));
    serde_json::json!({ "results": results }).to_string()
}

/// Test that the output always has one entry per input, whatever the provider does
#[tokio::test]
async fn test_process_withAnyBehavior_shouldReturnOneOutputPerItem() {
    let behaviors = vec![
        MockBehavior::Working,
        MockBehavior::Partial { drop_every: 3 },
        MockBehavior::Fenced,
        MockBehavior::Malformed,
        MockBehavior::Intermittent { fail_every: 2 },
        MockBehavior::Failing,
    ];
    let pool = keys(&["k"]);
    let task = TranslationTask::new("German");

    for behavior in behaviors {
        let provider = MockProvider::new(behavior.clone());
        let processor = BatchProcessor::new(&provider, &pool, options(4));
        for count in [0, 1, 4, 9] {
            let input = items(count);
            let (outputs, _) = processor.process(&task, &input, |_, _| {}).await;
            assert_eq!(outputs.len(), count, "{:?} with {} items", behavior, count);
        }
    }
}

/// Test that results are matched by index, not by position
#[tokio::test]
async fn test_process_withReorderedResults_shouldMatchByIndex() {
    let provider = MockProvider::working().with_custom_response(shuffled_response);
    let pool = keys(&["k"]);
    let processor = BatchProcessor::new(&provider, &pool, options(5));

    let (outputs, stats) = processor.process(&TranslationTask::new("German"), &items(5), |_, _| {}).await;

    let expected: Vec<String> = (0..5).map(|i| format!("[TRANSLATED] comment {}", i)).collect();
    assert_eq!(outputs, expected);
    assert_eq!(stats.fallback_items, 0);
}

/// Test that fenced JSON surrounded by prose is accepted
#[tokio::test]
async fn test_process_withFencedJson_shouldParse() {
    let provider = MockProvider::new(MockBehavior::Fenced);
    let pool = keys(&["k"]);
    let processor = BatchProcessor::new(&provider, &pool, options(10));

    let (outputs, stats) = processor.process(&ClassificationTask::new(), &items(3), |_, _| {}).await;

    assert!(outputs.iter().all(|c| c.category == Category::Discussion));
    assert_eq!(stats.failed_batches, 0);
}

/// Test that malformed output falls back for the whole batch
#[tokio::test]
async fn test_process_withMalformedOutput_shouldFallBack() {
    let provider = MockProvider::new(MockBehavior::Malformed);
    let pool = keys(&["k"]);
    let processor = BatchProcessor::new(&provider, &pool, options(10));

    let (outputs, stats) = processor.process(&ClassificationTask::new(), &items(3), |_, _| {}).await;

    assert!(outputs.iter().all(|c| c.sentiment == Sentiment::Neutral && c.category == Category::Unclassified));
    assert_eq!(stats.failed_batches, 1);
    assert_eq!(stats.fallback_items, 3);
}

/// Test that only the failing batch of an intermittent provider falls back
#[tokio::test]
async fn test_process_withIntermittentProvider_shouldIsolateFailedBatch() {
    let provider = MockProvider::intermittent(2);
    let pool = keys(&["k"]);
    let processor = BatchProcessor::new(&provider, &pool, options(2));

    let input = items(6);
    let (outputs, stats) = processor.process(&TranslationTask::new("German"), &input, |_, _| {}).await;

    assert_eq!(outputs[0], "[TRANSLATED] comment 0");
    assert_eq!(outputs[2], "comment 2");
    assert_eq!(outputs[3], "comment 3");
    assert_eq!(outputs[4], "[TRANSLATED] comment 4");
    assert_eq!(stats.failed_batches, 1);
}

/// Test that a rate-limited key is rotated out and later batches keep the new key
#[tokio::test]
async fn test_process_withRateLimitedFirstKey_shouldUseNextKey() {
    let provider = MockProvider::rate_limited(&["key-1"]);
    let pool = keys(&["key-1", "key-2", "key-3"]);
    let processor = BatchProcessor::new(&provider, &pool, options(2));

    let (outputs, stats) = processor.process(&TranslationTask::new("German"), &items(4), |_, _| {}).await;

    assert!(outputs.iter().all(|o| o.starts_with("[TRANSLATED]")));
    assert_eq!(stats.key_rotations, 1);
    assert_eq!(provider.used_keys(), vec!["key-1", "key-2", "key-2"]);
}

/// Test that progress reports every batch
#[tokio::test]
async fn test_process_shouldReportProgressPerBatch() {
    let provider = MockProvider::working();
    let pool = keys(&["k"]);
    let processor = BatchProcessor::new(&provider, &pool, options(3));
    let reports = parking_lot::Mutex::new(Vec::new());

    processor.process(&TranslationTask::new("German"), &items(7), |done, total| {
        reports.lock().push((done, total));
    }).await;

    assert_eq!(reports.into_inner(), vec![(3, 7), (6, 7), (7, 7)]);
}

/// Test that prompts carry the task instructions and every item
#[test]
fn test_buildRequest_shouldEmbedItemsAndSchema() {
    let provider = MockProvider::working();
    let pool = keys(&["k"]);
    let processor = BatchProcessor::new(&provider, &pool, options(10));
    let batch = vec![BatchItem::new(7, "hola"), BatchItem::new(8, "bonjour")];

    let request = processor.build_request(&TranslationTask::new("English"), &batch);

    assert!(request.system.contains("English"));
    assert_eq!(MockProvider::parse_items(&request.prompt), vec![(7, "hola".to_string()), (8, "bonjour".to_string())]);
    assert_eq!(request.schema["properties"]["results"]["items"]["required"], serde_json::json!(["index", "translation"]));
}

/// Test that the output budget grows with the batch and stops at the ceiling
#[test]
fn test_buildRequest_shouldSizeOutputBudgetFromBatch() {
    let provider = MockProvider::working();
    let pool = keys(&["k"]);
    let task = TranslationTask::new("English");

    let processor = BatchProcessor::new(&provider, &pool, options(10));
    let small = vec![BatchItem::new(0, "hola"), BatchItem::new(1, "bonjour")];
    let request = processor.build_request(&task, &small);
    assert_eq!(request.max_output_tokens, (4 + 64) + (7 + 64) + 256);

    let long_text = "x".repeat(1500);
    let large: Vec<BatchItem> = (0..20).map(|i| BatchItem::new(i, long_text.as_str())).collect();
    let capped = BatchProcessor::new(&provider, &pool, BatchOptions { max_output_tokens: 4096, ..options(20) });
    assert_eq!(capped.build_request(&task, &large).max_output_tokens, 4096);
}

/// Test the keyword table on a small corpus
#[test]
fn test_keywordTable_shouldRankAndMatchBySubstring() {
    let texts = [
        "The drummer is incredible",
        "That drum fill at 3:12!",
        "Drummer deserves a raise",
        "Vocals are too quiet in the mix",
    ];
    let table = KeywordTable::build(texts, 5);

    assert_eq!(table.entries()[0].word, "drummer");
    assert_eq!(table.entries()[0].count, 2);
    assert!(table.len() <= 5);
    assert_eq!(table.top_keywords("Best DRUMMER ever", 3), vec!["drummer".to_string(), "drum".to_string()]);
}
