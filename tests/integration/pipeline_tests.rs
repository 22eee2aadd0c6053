/*!
 * End-to-end tests: fetch, filter, analyze and export with in-memory sources
 */

use anyhow::Result;
use std::time::Duration;
use ytcomments::analysis::BatchOptions;
use ytcomments::app_config::Config;
use ytcomments::app_controller::Controller;
use ytcomments::errors::FetchError;
use ytcomments::export::WorkbookExporter;
use ytcomments::providers::mock::MockProvider;
use ytcomments::providers::ApiKeyPool;
use ytcomments::{Analyzer, FilterOptions};
use crate::common;
use crate::common::mock_source::{MockCommentSource, PageFailure};

const VIDEO_ID: &str = "dQw4w9WgXcQ";

fn controller(filter: FilterOptions) -> Result<Controller> {
    let mut config = Config::default();
    config.youtube.api_key = "test".to_string();
    config.youtube.reply_batch_delay_ms = 0;
    config.filter = filter;
    Controller::with_config(config)
}

fn analyzer(provider: MockProvider) -> Result<Analyzer> {
    let options = BatchOptions {
        batch_size: 3,
        batch_delay: Duration::ZERO,
        rate_limit_backoff: Duration::ZERO,
        ..BatchOptions::default()
    };
    let keys = ApiKeyPool::new(vec!["llm-key".to_string()])?;
    Ok(Analyzer::new(Box::new(provider), keys, options))
}

/// Two pages: a thread with a truncated preview, spam, an emoji-only reply and a repeat
fn source() -> MockCommentSource {
    let page_one = vec![
        common::thread_with_preview(
            "t1",
            "I love how the bass line carries the chorus",
            vec![common::comment("t1.r1", "Bass player is great", 10)],
            3,
        ),
        common::comment("t2", "Check out my channel for free followers", 20),
        common::comment("t3", "Why was the bridge cut from the radio edit?", 30),
    ];
    let page_two = vec![
        common::comment("t3", "Why was the bridge cut from the radio edit?", 30),
        common::comment("t4", "The bass tone is boring on this mix", 40),
    ];

    MockCommentSource::new(VIDEO_ID, vec![page_one, page_two]).with_replies(
        "t1",
        vec![
            common::comment("t1.r1", "Bass player is great", 10),
            common::comment("t1.r2", "🎸🎸🎸", 11),
            common::comment("t1.r3", "Totally agree about the bass", 12),
        ],
        100,
    )
}

/// Test the complete pipeline with translation and classification
#[tokio::test]
async fn test_runWith_withAnalysis_shouldExportAnalyzedSheets() -> Result<()> {
    common::init_test_logging();
    let dir = common::create_temp_dir()?;
    let controller = controller(FilterOptions::default())?;
    let analyzer = analyzer(MockProvider::working())?
        .with_translation("German")
        .with_classification(true);
    let exporter = WorkbookExporter::new(dir.path()).with_json(true);

    let paths = controller.run_with(VIDEO_ID, source(), Some(&analyzer), &exporter).await?;

    let rows = common::read_sheet(&paths.comments)?;
    assert_eq!(rows[0].len(), 13);
    let ids: Vec<&str> = rows[1..].iter().map(|r| r[2].as_str()).collect();
    assert_eq!(ids, vec!["t1", "t1.r1", "t1.r3", "t3", "t4"]);

    // Parent reply count matches the retained replies
    assert_eq!(rows[1][7], "2");
    assert_eq!(rows[1][9], "[TRANSLATED] I love how the bass line carries the chorus");
    assert_eq!(rows[1][10], "positive");
    assert_eq!(rows[1][11], "praise");
    assert!(rows[1][12].contains("bass"));
    assert_eq!(rows[4][11], "question");
    assert_eq!(rows[5][10], "negative");

    let summary = common::read_sheet(&paths.summary)?;
    let value = |section: &str, name: &str| {
        summary.iter()
            .find(|r| r[0] == section && r[1] == name)
            .map(|r| r[2].clone())
            .unwrap_or_default()
    };
    assert_eq!(value("video", "title"), format!("Test video {}", VIDEO_ID));
    assert_eq!(value("export", "fetched_comments"), "7");
    assert_eq!(value("filter", "advertisement"), "1");
    assert_eq!(value("filter", "emoji_only"), "1");
    assert_eq!(value("analysis", "provider"), "Mock (mock-model)");
    assert_eq!(value("analysis", "fallback_items"), "0");
    assert_eq!(value("keyword", "bass"), "4");

    assert!(paths.json.is_some());
    Ok(())
}

/// Test that without an analyzer only the base columns are written
#[tokio::test]
async fn test_runWith_withoutAnalysis_shouldExportPlainSheet() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let controller = controller(FilterOptions::none())?;
    let exporter = WorkbookExporter::new(dir.path());

    let paths = controller.run_with(VIDEO_ID, source(), None, &exporter).await?;

    let rows = common::read_sheet(&paths.comments)?;
    assert_eq!(rows[0].len(), 9);
    assert_eq!(rows.len(), 1 + 7);
    assert!(paths.json.is_none());

    let summary = common::read_sheet(&paths.summary)?;
    assert!(summary.iter().any(|r| r[0] == "keyword" && r[1] == "bass"));
    assert!(summary.iter().all(|r| r[0] != "sentiment"));
    Ok(())
}

/// Test that a failing provider still produces a complete export
#[tokio::test]
async fn test_runWith_withFailingProvider_shouldExportFallbacks() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let controller = controller(FilterOptions::default())?;
    let analyzer = analyzer(MockProvider::failing())?
        .with_translation("German")
        .with_classification(true);
    let exporter = WorkbookExporter::new(dir.path());

    let paths = controller.run_with(VIDEO_ID, source(), Some(&analyzer), &exporter).await?;

    let rows = common::read_sheet(&paths.comments)?;
    assert_eq!(rows.len(), 6);
    for row in &rows[1..] {
        assert_eq!(row[9], row[8], "translation falls back to the original");
        assert_eq!(row[10], "neutral");
        assert_eq!(row[11], "unclassified");
    }
    Ok(())
}

/// Test that a missing video fails before anything is written
#[tokio::test]
async fn test_runWith_withMissingVideo_shouldFailWithoutOutput() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let out = dir.path().join("out");
    let controller = controller(FilterOptions::default())?;
    let exporter = WorkbookExporter::new(&out);

    let error = controller
        .run_with(VIDEO_ID, MockCommentSource::missing_video(), None, &exporter)
        .await
        .unwrap_err();

    assert!(matches!(error.downcast_ref::<FetchError>(), Some(FetchError::VideoNotFound(_))));
    assert!(!out.exists());
    Ok(())
}

/// Test that disabled comments surface as a fetch error
#[tokio::test]
async fn test_runWith_withCommentsDisabled_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let controller = controller(FilterOptions::default())?;
    let exporter = WorkbookExporter::new(dir.path());
    let source = source().fail_on_page(0, PageFailure::CommentsDisabled);

    let error = controller.run_with(VIDEO_ID, source, None, &exporter).await.unwrap_err();

    assert!(matches!(error.downcast_ref::<FetchError>(), Some(FetchError::CommentsDisabled(_))));
    Ok(())
}

/// Test that an unparseable video reference is rejected by `run`
#[tokio::test]
async fn test_run_withInvalidVideo_shouldFail() -> Result<()> {
    let controller = controller(FilterOptions::default())?;

    let error = controller.run("https://vimeo.com/12345").await.unwrap_err();

    assert!(matches!(error.downcast_ref::<FetchError>(), Some(FetchError::InvalidVideoId(_))));
    Ok(())
}
