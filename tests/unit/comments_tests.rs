/*!
 * Tests for the comment model and deduplication
 */

use ytcomments::comments::{count_all, dedupe_comments, strip_html, Comment};
use crate::common;

/// Test that dedupe drops repeated ids and repeated content, first one wins
#[test]
fn test_dedupeComments_withIdAndContentDuplicates_shouldKeepFirst() {
    let comments = vec![
        common::comment("a", "Great breakdown of the chorus", 0),
        common::comment("b", "Second opinion here", 1),
        common::comment("a", "Different text, same id", 2),
        common::comment("c", "  Great breakdown of the chorus  ", 3),
        common::comment("d", "Great <b>breakdown</b> of the chorus", 4),
        common::comment("e", "Something new", 5),
    ];

    let deduped = dedupe_comments(comments);
    let ids: Vec<&str> = deduped.iter().map(|c| c.id.as_str()).collect();

    assert_eq!(ids, vec!["a", "b", "e"]);
}

/// Test that deduplicating twice changes nothing
#[test]
fn test_dedupeComments_appliedTwice_shouldBeIdempotent() {
    let mut comments = common::numbered_comments("x", 20);
    comments.extend(common::numbered_comments("x", 10));
    comments.push(common::comment("other", "Comment number 3 about x", 99));

    let once = dedupe_comments(comments);
    let twice = dedupe_comments(once.clone());

    assert_eq!(once.len(), 20);
    assert_eq!(once, twice);
}

/// Test that case differences are not treated as duplicates
#[test]
fn test_dedupeComments_withDifferentCase_shouldKeepBoth() {
    let deduped = dedupe_comments(vec![
        common::comment("a", "Nice", 0),
        common::comment("b", "nice", 1),
    ]);
    assert_eq!(deduped.len(), 2);
}

/// Test HTML stripping of typical API content
#[test]
fn test_stripHtml_withApiMarkup_shouldReturnPlainText() {
    let html = r#"<a href="https://www.youtube.com/watch?v=x&amp;t=83">1:23</a> best part<br>Tom &amp; Jerry &quot;live&quot; &#39;ok&#39; &#x1F600;"#;
    assert_eq!(strip_html(html), "1:23 best part\nTom & Jerry \"live\" 'ok' 😀");
}

/// Test that with_replies keeps reply_count in sync and count_all includes replies
#[test]
fn test_withReplies_shouldSyncReplyCount() {
    let thread = Comment::new("p", "author", "parent").with_replies(vec![
        Comment::new("r1", "a", "one"),
        Comment::new("r2", "b", "two"),
    ]);

    assert_eq!(thread.reply_count, 2);
    assert_eq!(thread.thread_size(), 3);
    assert_eq!(count_all(&[thread, Comment::new("q", "c", "solo")]), 4);
}
