/*!
 * Comment crawling.
 *
 * Threads are paginated sequentially until the continuation token runs out
 * or a configured bound is hit. Threads whose reply preview is incomplete get
 * their full reply list fetched in small concurrent batches.
 */

use futures::future::join_all;
use log::{debug, info, warn};
use std::time::Duration;

use crate::app_config::YouTubeConfig;
use crate::comments::{dedupe_comments, Comment, Deduper};
use crate::errors::FetchError;

use super::{CommentSource, VideoInfo};

/// Upper bound on reply pages per thread (100 replies each)
const MAX_REPLY_PAGES: usize = 50;

/// Crawl bounds and batching parameters
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum thread pages (0 = no limit)
    pub max_pages: usize,
    /// Maximum top-level comments (0 = no limit)
    pub max_comments: usize,
    /// Complete truncated reply previews
    pub fetch_all_replies: bool,
    /// Reply lists fetched concurrently per batch
    pub reply_batch_size: usize,
    /// Pause between reply batches
    pub reply_batch_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&YouTubeConfig::default())
    }
}

impl From<&YouTubeConfig> for FetchOptions {
    fn from(config: &YouTubeConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            max_comments: config.max_comments,
            fetch_all_replies: config.fetch_all_replies,
            reply_batch_size: config.reply_batch_size.max(1),
            reply_batch_delay: Duration::from_millis(config.reply_batch_delay_ms),
        }
    }
}

/// Progress notifications emitted while crawling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchProgress {
    /// A thread page arrived
    Threads { pages: usize, comments: usize },
    /// A reply batch finished
    Replies { done: usize, total: usize },
}

/// Crawls all comments of a video from a [`CommentSource`]
pub struct CommentFetcher<S: CommentSource> {
    source: S,
    options: FetchOptions,
}

impl<S: CommentSource> CommentFetcher<S> {
    /// Create a fetcher over `source`
    pub fn new(source: S, options: FetchOptions) -> Self {
        Self { source, options }
    }

    /// Fetch video metadata
    pub async fn video_info(&self, video_id: &str) -> Result<VideoInfo, FetchError> {
        self.source.video_info(video_id).await
    }

    /// Fetch all threads of a video without progress reporting
    pub async fn fetch_all(&self, video_id: &str) -> Result<Vec<Comment>, FetchError> {
        self.fetch_all_with_progress(video_id, |_| {}).await
    }

    /// Fetch all threads of a video, deduplicated, with complete reply lists
    pub async fn fetch_all_with_progress(
        &self,
        video_id: &str,
        progress: impl Fn(FetchProgress),
    ) -> Result<Vec<Comment>, FetchError> {
        let mut threads = self.fetch_threads(video_id, &progress).await?;

        if self.options.fetch_all_replies {
            self.complete_replies(&mut threads, &progress).await;
        }

        for thread in &mut threads {
            let replies = std::mem::take(&mut thread.replies);
            let mut replies = dedupe_comments(replies);
            replies.sort_by_key(|r| r.published_at);
            thread.replies = replies;
        }

        Ok(threads)
    }

    async fn fetch_threads(
        &self,
        video_id: &str,
        progress: &impl Fn(FetchProgress),
    ) -> Result<Vec<Comment>, FetchError> {
        let mut threads = Vec::new();
        let mut deduper = Deduper::new();
        let mut duplicates = 0;
        let mut page_token: Option<String> = None;
        let mut pages = 0;

        loop {
            let page = self.source.thread_page(video_id, page_token.as_deref()).await?;
            pages += 1;

            // Dedupe before the limit check so repeats do not use up the budget
            for thread in page.threads {
                if deduper.admit(&thread) {
                    threads.push(thread);
                } else {
                    duplicates += 1;
                }
            }

            debug!("Fetched thread page {} ({} comments so far)", pages, threads.len());
            progress(FetchProgress::Threads { pages, comments: threads.len() });

            if self.options.max_comments > 0 && threads.len() >= self.options.max_comments {
                threads.truncate(self.options.max_comments);
                info!("Reached comment limit of {}", self.options.max_comments);
                break;
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }

            if self.options.max_pages > 0 && pages >= self.options.max_pages {
                info!("Reached page limit of {}", self.options.max_pages);
                break;
            }
        }

        if duplicates > 0 {
            info!("Removed {} duplicate comments", duplicates);
        }

        Ok(threads)
    }

    /// Replace truncated reply previews with the full reply lists
    async fn complete_replies(&self, threads: &mut [Comment], progress: &impl Fn(FetchProgress)) {
        let pending: Vec<usize> = threads.iter()
            .enumerate()
            .filter(|(_, t)| t.reply_count > t.replies.len())
            .map(|(i, _)| i)
            .collect();

        if pending.is_empty() {
            return;
        }

        info!("Fetching replies for {} threads", pending.len());
        let total = pending.len();
        let mut done = 0;

        for (batch_index, batch) in pending.chunks(self.options.reply_batch_size).enumerate() {
            if batch_index > 0 && !self.options.reply_batch_delay.is_zero() {
                tokio::time::sleep(self.options.reply_batch_delay).await;
            }

            let requests = batch.iter().map(|&i| self.fetch_replies(&threads[i].id));
            let results = join_all(requests).await;

            for (&i, result) in batch.iter().zip(results) {
                match result {
                    Ok(replies) => {
                        threads[i].reply_count = replies.len();
                        threads[i].replies = replies;
                    },
                    Err(e) => {
                        warn!("Keeping {} preview replies for {}: {}", threads[i].replies.len(), threads[i].id, e);
                    }
                }
            }

            done += batch.len();
            progress(FetchProgress::Replies { done, total });
        }
    }

    async fn fetch_replies(&self, parent_id: &str) -> Result<Vec<Comment>, FetchError> {
        let mut replies = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_REPLY_PAGES {
            let page = self.source.reply_page(parent_id, page_token.as_deref()).await?;
            replies.extend(page.replies);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(replies)
    }
}
