/*!
 * Common test utilities for the ytcomments test suite
 */

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use ytcomments::comments::Comment;


/// Route library logs through env_logger's test writer
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Read a CSV sheet written by the exporter into rows of strings
pub fn read_sheet(path: &Path) -> Result<Vec<Vec<String>>> {
    let content = fs::read_to_string(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(content.trim_start_matches('\u{feff}').as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Fixed timestamp `offset_secs` after a reference instant
pub fn at(offset_secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + offset_secs, 0).unwrap()
}

/// A comment published `offset_secs` after the reference instant
pub fn comment(id: &str, content: &str, offset_secs: i64) -> Comment {
    let mut comment = Comment::new(id, format!("author-{}", id), content);
    comment.published_at = at(offset_secs);
    comment
}

/// A thread whose reply preview is `preview` but that reports `reply_count` replies
pub fn thread_with_preview(id: &str, content: &str, preview: Vec<Comment>, reply_count: usize) -> Comment {
    let mut thread = comment(id, content, 0).with_replies(preview);
    thread.reply_count = reply_count;
    thread
}

/// Numbered distinct comments `prefix-0 .. prefix-(count-1)`
pub fn numbered_comments(prefix: &str, count: usize) -> Vec<Comment> {
    (0..count)
        .map(|i| comment(&format!("{}-{}", prefix, i), &format!("Comment number {} about {}", i, prefix), i as i64))
        .collect()
}
