use async_trait::async_trait;
use log::{debug, error, warn};
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::app_config::{CommentOrder, YouTubeConfig};
use crate::errors::FetchError;

use super::models::{
    ApiErrorResponse, CommentListResponse, CommentResource, CommentThreadListResponse,
    CommentThreadResource, VideoInfo, VideoListResponse,
};
use super::{CommentSource, ReplyPage, ThreadPage};

/// Client for the YouTube Data API v3
pub struct YouTubeClient {
    /// HTTP client for making requests
    client: Client,
    /// API key appended to every request
    api_key: String,
    /// Base URL of the API
    endpoint: String,
    /// Threads per page
    page_size: u32,
    /// Thread ordering
    order: CommentOrder,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
}

impl YouTubeClient {
    /// Create a new client from configuration
    pub fn new(config: &YouTubeConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            order: config.order,
            max_retries: config.retry_count,
            backoff_base_ms: config.retry_backoff_ms,
        }
    }

    fn build_url(&self, resource: &str, params: &[(&str, &str)]) -> Result<Url, FetchError> {
        let mut url = Url::parse(&format!("{}/{}", self.endpoint, resource))
            .map_err(|e| FetchError::Network(format!("Invalid YouTube endpoint {}: {}", self.endpoint, e)))?;

        url.query_pairs_mut()
            .extend_pairs(params.iter())
            .append_pair("key", &self.api_key);

        Ok(url)
    }

    /// Delay before retry number `attempt` (1-based), with up to 25% jitter
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(16));
        let jitter = if base >= 4 { rand::rng().random_range(0..=base / 4) } else { 0 };
        Duration::from_millis(base + jitter)
    }

    /// GET a resource and decode the JSON body, retrying transient failures
    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, &str)],
        subject: &str,
    ) -> Result<T, FetchError> {
        let url = self.build_url(resource, params)?;

        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.max_retries {
            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json::<T>().await
                            .map_err(|e| FetchError::Parse(format!("{} response: {}", resource, e)));
                    }

                    let body = response.text().await
                        .unwrap_or_else(|_| "Failed to get error response text".to_string());
                    let err = map_error_status(status, &body, subject);

                    if !err.is_retryable() {
                        error!("YouTube API error on {} ({}): {}", resource, status, err);
                        return Err(err);
                    }

                    warn!("YouTube API error on {} ({}) - attempt {}/{}", resource, status, attempt + 1, self.max_retries + 1);
                    last_error = Some(err);
                },
                Err(e) => {
                    warn!("YouTube API network error on {}: {} - attempt {}/{}", resource, e, attempt + 1, self.max_retries + 1);
                    last_error = Some(FetchError::Network(e.to_string()));
                }
            }

            attempt += 1;

            if attempt <= self.max_retries {
                let delay = self.backoff_delay(attempt);
                debug!("Retrying {} in {:?}", resource, delay);
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            FetchError::Network(format!("{} request failed after {} attempts", resource, self.max_retries + 1))
        }))
    }
}

/// Map a non-success status to a domain error.
///
/// 403 is split by the API's reason so quota and disabled-comments cases
/// reach the user with a precise message.
pub fn map_error_status(status: StatusCode, body: &str, subject: &str) -> FetchError {
    let parsed = serde_json::from_str::<ApiErrorResponse>(body).ok();
    let reason = parsed.as_ref().and_then(|p| p.reason()).unwrap_or("");
    let message = parsed.as_ref()
        .map(|p| p.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.chars().take(300).collect());

    match status {
        StatusCode::FORBIDDEN => match reason {
            "quotaExceeded" | "dailyLimitExceeded" | "rateLimitExceeded" => FetchError::QuotaExceeded,
            "commentsDisabled" => FetchError::CommentsDisabled(subject.to_string()),
            _ => FetchError::Forbidden(message),
        },
        StatusCode::NOT_FOUND => FetchError::VideoNotFound(subject.to_string()),
        _ => FetchError::ApiError {
            status_code: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl CommentSource for YouTubeClient {
    async fn video_info(&self, video_id: &str) -> Result<VideoInfo, FetchError> {
        let response: VideoListResponse = self
            .get_json("videos", &[("part", "snippet,statistics"), ("id", video_id)], video_id)
            .await?;

        response.items
            .into_iter()
            .next()
            .map(VideoInfo::from)
            .ok_or_else(|| FetchError::VideoNotFound(video_id.to_string()))
    }

    async fn thread_page(&self, video_id: &str, page_token: Option<&str>) -> Result<ThreadPage, FetchError> {
        let page_size = self.page_size.to_string();
        let mut params = vec![
            ("part", "snippet,replies"),
            ("videoId", video_id),
            ("maxResults", page_size.as_str()),
            ("order", self.order.as_query_value()),
            ("textFormat", "html"),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let response: CommentThreadListResponse = self.get_json("commentThreads", &params, video_id).await?;

        Ok(ThreadPage {
            threads: response.items.into_iter().map(CommentThreadResource::into_comment).collect(),
            next_page_token: response.next_page_token,
        })
    }

    async fn reply_page(&self, parent_id: &str, page_token: Option<&str>) -> Result<ReplyPage, FetchError> {
        let mut params = vec![
            ("part", "snippet"),
            ("parentId", parent_id),
            ("maxResults", "100"),
            ("textFormat", "html"),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let response: CommentListResponse = self.get_json("comments", &params, parent_id).await?;

        Ok(ReplyPage {
            replies: response.items.into_iter().map(CommentResource::into_comment).collect(),
            next_page_token: response.next_page_token,
        })
    }
}
