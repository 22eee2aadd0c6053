/*!
 * Integration tests for the comment crawler over an in-memory source
 */

use parking_lot::Mutex;
use std::time::Duration;
use ytcomments::errors::FetchError;
use ytcomments::youtube::{CommentFetcher, FetchOptions, FetchProgress};
use crate::common;
use crate::common::mock_source::{MockCommentSource, PageFailure};

fn options() -> FetchOptions {
    FetchOptions {
        max_pages: 0,
        max_comments: 0,
        fetch_all_replies: true,
        reply_batch_size: 2,
        reply_batch_delay: Duration::ZERO,
    }
}

/// Test that every page is requested until the token runs out
#[tokio::test]
async fn test_fetchAll_withThreePages_shouldFollowTokens() {
    let source = MockCommentSource::new("vid", vec![
        common::numbered_comments("a", 3),
        common::numbered_comments("b", 3),
        common::numbered_comments("c", 2),
    ]);
    let fetcher = CommentFetcher::new(source.clone(), options());

    let threads = fetcher.fetch_all("vid").await.unwrap();

    assert_eq!(threads.len(), 8);
    assert_eq!(threads[0].id, "a-0");
    assert_eq!(threads[7].id, "c-1");
    assert_eq!(source.thread_calls(), 3);
}

/// Test the page and comment limits
#[tokio::test]
async fn test_fetchAll_withLimits_shouldStopEarly() {
    let pages = vec![
        common::numbered_comments("a", 3),
        common::numbered_comments("b", 3),
        common::numbered_comments("c", 3),
    ];

    let source = MockCommentSource::new("vid", pages.clone());
    let fetcher = CommentFetcher::new(source.clone(), FetchOptions { max_pages: 2, ..options() });
    assert_eq!(fetcher.fetch_all("vid").await.unwrap().len(), 6);
    assert_eq!(source.thread_calls(), 2);

    let source = MockCommentSource::new("vid", pages);
    let fetcher = CommentFetcher::new(source.clone(), FetchOptions { max_comments: 4, ..options() });
    let threads = fetcher.fetch_all("vid").await.unwrap();
    assert_eq!(threads.len(), 4);
    assert_eq!(threads[3].id, "b-0");
    assert_eq!(source.thread_calls(), 2);
}

/// Test that threads repeated across pages are kept once
#[tokio::test]
async fn test_fetchAll_withDuplicatesAcrossPages_shouldDedupe() {
    let mut second = common::numbered_comments("a", 2);
    second.push(common::comment("new", "Brand new thought", 50));
    let source = MockCommentSource::new("vid", vec![common::numbered_comments("a", 3), second]);

    let threads = CommentFetcher::new(source, options()).fetch_all("vid").await.unwrap();
    let ids: Vec<&str> = threads.iter().map(|t| t.id.as_str()).collect();

    assert_eq!(ids, vec!["a-0", "a-1", "a-2", "new"]);
}

/// Test that repeated threads do not count against the comment limit
#[tokio::test]
async fn test_fetchAll_withDuplicatesAndCommentLimit_shouldFillLimitWithUniqueThreads() {
    let mut second = common::numbered_comments("a", 2);
    second.extend(common::numbered_comments("b", 3));
    let source = MockCommentSource::new("vid", vec![common::numbered_comments("a", 3), second]);
    let fetcher = CommentFetcher::new(source.clone(), FetchOptions { max_comments: 5, ..options() });

    let threads = fetcher.fetch_all("vid").await.unwrap();
    let ids: Vec<&str> = threads.iter().map(|t| t.id.as_str()).collect();

    assert_eq!(ids, vec!["a-0", "a-1", "a-2", "b-0", "b-1"]);
    assert_eq!(source.thread_calls(), 2);
}

/// Test that truncated previews are replaced by the full, sorted reply list
#[tokio::test]
async fn test_fetchAll_withTruncatedPreview_shouldFetchAllReplies() {
    let preview = vec![common::comment("r-9", "Last reply", 90)];
    let mut full: Vec<_> = (0..10)
        .rev()
        .map(|i| common::comment(&format!("r-{}", i), &format!("Reply {}", i), i * 10))
        .collect();
    full.push(common::comment("r-3", "Reply 3", 30));

    let source = MockCommentSource::new("vid", vec![vec![
        common::thread_with_preview("p", "Parent", preview, 10),
        common::comment("q", "No replies here", 5),
    ]])
    .with_replies("p", full, 4);

    let threads = CommentFetcher::new(source.clone(), options()).fetch_all("vid").await.unwrap();

    let replies: Vec<&str> = threads[0].replies.iter().map(|r| r.id.as_str()).collect();
    let expected: Vec<String> = (0..10).map(|i| format!("r-{}", i)).collect();
    assert_eq!(replies, expected);
    assert_eq!(source.reply_calls(), vec!["p", "p", "p"]);
    assert!(threads[1].replies.is_empty());
}

/// Test that a failed reply fetch keeps the preview and does not abort the crawl
#[tokio::test]
async fn test_fetchAll_withFailingReplies_shouldKeepPreview() {
    let preview = vec![common::comment("r-1", "Preview reply", 1)];
    let source = MockCommentSource::new("vid", vec![vec![
        common::thread_with_preview("p", "Parent", preview, 25),
    ]])
    .fail_replies("p");

    let threads = CommentFetcher::new(source, options()).fetch_all("vid").await.unwrap();

    assert_eq!(threads[0].replies.len(), 1);
    assert_eq!(threads[0].replies[0].id, "r-1");
}

/// Test that reply completion can be switched off
#[tokio::test]
async fn test_fetchAll_withoutReplyCompletion_shouldNotRequestReplies() {
    let preview = vec![common::comment("r-1", "Preview reply", 1)];
    let source = MockCommentSource::new("vid", vec![vec![
        common::thread_with_preview("p", "Parent", preview, 25),
    ]]);
    let fetcher = CommentFetcher::new(source.clone(), FetchOptions { fetch_all_replies: false, ..options() });

    let threads = fetcher.fetch_all("vid").await.unwrap();

    assert_eq!(threads[0].replies.len(), 1);
    assert!(source.reply_calls().is_empty());
}

/// Test that thread page errors propagate
#[tokio::test]
async fn test_fetchAll_withDisabledComments_shouldFail() {
    let source = MockCommentSource::new("vid", vec![common::numbered_comments("a", 2)])
        .fail_on_page(0, PageFailure::CommentsDisabled);

    let result = CommentFetcher::new(source, options()).fetch_all("vid").await;

    assert!(matches!(result, Err(FetchError::CommentsDisabled(ref id)) if id == "vid"));
}

/// Test that an error on a later page discards the partial crawl
#[tokio::test]
async fn test_fetchAll_withQuotaExceededMidway_shouldFail() {
    let source = MockCommentSource::new("vid", vec![
        common::numbered_comments("a", 2),
        common::numbered_comments("b", 2),
    ])
    .fail_on_page(1, PageFailure::QuotaExceeded);

    let result = CommentFetcher::new(source.clone(), options()).fetch_all("vid").await;

    assert!(matches!(result, Err(FetchError::QuotaExceeded)));
    assert_eq!(source.thread_calls(), 2);
}

/// Test that a network failure is surfaced as is
#[tokio::test]
async fn test_fetchAll_withNetworkFailure_shouldFail() {
    let source = MockCommentSource::new("vid", vec![common::numbered_comments("a", 2)])
        .fail_on_page(0, PageFailure::Network);

    let result = CommentFetcher::new(source, options()).fetch_all("vid").await;

    assert!(matches!(result, Err(FetchError::Network(_))));
}

/// Test the progress events for pages and reply batches
#[tokio::test]
async fn test_fetchAllWithProgress_shouldReportPagesAndReplyBatches() {
    common::init_test_logging();
    let threads: Vec<_> = (0..3)
        .map(|i| common::thread_with_preview(&format!("p{}", i), &format!("Parent {}", i), Vec::new(), 1))
        .collect();
    let mut source = MockCommentSource::new("vid", vec![threads, common::numbered_comments("x", 1)]);
    for i in 0..3 {
        let parent = format!("p{}", i);
        source = source.with_replies(&parent, vec![common::comment(&format!("{}-r", parent), "reply", 1)], 10);
    }
    let events = Mutex::new(Vec::new());

    CommentFetcher::new(source, options())
        .fetch_all_with_progress("vid", |event| events.lock().push(event))
        .await
        .unwrap();

    assert_eq!(events.into_inner(), vec![
        FetchProgress::Threads { pages: 1, comments: 3 },
        FetchProgress::Threads { pages: 2, comments: 4 },
        FetchProgress::Replies { done: 2, total: 3 },
        FetchProgress::Replies { done: 3, total: 3 },
    ]);
}

/// Test that metadata of a missing video is reported as not found
#[tokio::test]
async fn test_videoInfo_withMissingVideo_shouldFail() {
    let fetcher = CommentFetcher::new(MockCommentSource::missing_video(), options());
    assert!(matches!(fetcher.video_info("nope").await, Err(FetchError::VideoNotFound(_))));

    let fetcher = CommentFetcher::new(MockCommentSource::new("vid", Vec::new()), options());
    assert_eq!(fetcher.video_info("vid").await.unwrap().title, "Test video vid");
}
