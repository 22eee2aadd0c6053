/*!
 * Tests for the YouTube client's retry loop against a local HTTP server
 */

use anyhow::Result;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use ytcomments::app_config::YouTubeConfig;
use ytcomments::errors::FetchError;
use ytcomments::youtube::{CommentSource, YouTubeClient};

const VIDEO_ID: &str = "dQw4w9WgXcQ";

fn client(server: &MockServer, retry_count: u32) -> YouTubeClient {
    let config = YouTubeConfig {
        api_key: "test-key".to_string(),
        endpoint: server.uri(),
        retry_count,
        retry_backoff_ms: 1,
        timeout_secs: 5,
        ..YouTubeConfig::default()
    };
    YouTubeClient::new(&config)
}

fn empty_page() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"items": []}))
}

fn api_error(status: u16, reason: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "error": {
            "code": status,
            "message": format!("simulated {}", reason),
            "errors": [{"reason": reason}]
        }
    }))
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map(|r| r.len()).unwrap_or_default()
}

/// Test that server errors are retried until a page arrives
#[tokio::test]
async fn test_threadPage_withTransientServerErrors_shouldRetryAndSucceed() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/commentThreads"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/commentThreads"))
        .and(query_param("key", "test-key"))
        .respond_with(empty_page())
        .mount(&server)
        .await;

    let page = client(&server, 3).thread_page(VIDEO_ID, None).await?;

    assert!(page.threads.is_empty());
    assert_eq!(request_count(&server).await, 3);
    Ok(())
}

/// Test that 429 responses are retried
#[tokio::test]
async fn test_threadPage_withTooManyRequests_shouldRetry() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET")).respond_with(empty_page()).mount(&server).await;

    client(&server, 3).thread_page(VIDEO_ID, None).await?;

    assert_eq!(request_count(&server).await, 2);
    Ok(())
}

/// Test that the retry budget is retry_count + 1 attempts
#[tokio::test]
async fn test_threadPage_withPersistentServerError_shouldStopAfterBudget() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(502)).mount(&server).await;

    let error = client(&server, 2).thread_page(VIDEO_ID, None).await.unwrap_err();

    assert!(matches!(error, FetchError::ApiError { status_code: 502, .. }));
    assert_eq!(request_count(&server).await, 3);
    Ok(())
}

/// Test that an exhausted quota fails on the first attempt
#[tokio::test]
async fn test_threadPage_withQuotaExceeded_shouldNotRetry() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(api_error(403, "quotaExceeded")).mount(&server).await;

    let error = client(&server, 3).thread_page(VIDEO_ID, None).await.unwrap_err();

    assert!(matches!(error, FetchError::QuotaExceeded));
    assert_eq!(request_count(&server).await, 1);
    Ok(())
}

/// Test that disabled comments fail on the first attempt
#[tokio::test]
async fn test_threadPage_withCommentsDisabled_shouldNotRetry() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(api_error(403, "commentsDisabled")).mount(&server).await;

    let error = client(&server, 3).thread_page(VIDEO_ID, None).await.unwrap_err();

    assert!(matches!(error, FetchError::CommentsDisabled(ref id) if id == VIDEO_ID));
    assert_eq!(request_count(&server).await, 1);
    Ok(())
}

/// Test that an unreachable server surfaces as a network error after retrying
#[tokio::test]
async fn test_threadPage_withUnreachableServer_shouldFailWithNetworkError() -> Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let address = listener.local_addr()?;
    drop(listener);

    let config = YouTubeConfig {
        api_key: "test-key".to_string(),
        endpoint: format!("http://{}", address),
        retry_count: 1,
        retry_backoff_ms: 1,
        timeout_secs: 2,
        ..YouTubeConfig::default()
    };

    let error = YouTubeClient::new(&config).thread_page(VIDEO_ID, None).await.unwrap_err();

    assert!(matches!(error, FetchError::Network(_)));
    Ok(())
}
