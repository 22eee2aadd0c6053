use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{info, warn};
use std::time::{Duration, Instant};

use crate::analysis::{Analyzer, KeywordTable};
use crate::app_config::Config;
use crate::comments::count_all;
use crate::export::{ExportPaths, WorkbookExporter};
use crate::filter::apply_filters_with_stats;
use crate::report::{flatten_threads, Report};
use crate::youtube::{parse_video_id, CommentFetcher, CommentSource, FetchOptions, FetchProgress, YouTubeClient};

// @module: Application controller for the comment pipeline

/// Main application controller: fetch, filter, analyze, export
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole pipeline for a video URL or id
    pub async fn run(&self, video: &str) -> Result<ExportPaths> {
        let video_id = parse_video_id(video)?;
        let client = YouTubeClient::new(&self.config.youtube);

        let analyzer = if self.config.analysis.uses_llm() {
            Some(Analyzer::from_config(&self.config.analysis)
                .context("Failed to set up the analysis provider")?)
        } else {
            None
        };

        let exporter = WorkbookExporter::from(&self.config.export);
        self.run_with(&video_id, client, analyzer.as_ref(), &exporter).await
    }

    /// Run the pipeline over an arbitrary comment source
    pub async fn run_with<S: CommentSource>(
        &self,
        video_id: &str,
        source: S,
        analyzer: Option<&Analyzer>,
        exporter: &WorkbookExporter,
    ) -> Result<ExportPaths> {
        let start_time = Instant::now();
        let multi_progress = MultiProgress::new();

        let fetcher = CommentFetcher::new(source, FetchOptions::from(&self.config.youtube));
        let video = fetcher.video_info(video_id).await?;
        info!("Video: {} ({})", video.title, video.channel_title);

        // Fetch
        let fetch_pb = multi_progress.add(ProgressBar::new_spinner());
        fetch_pb.set_style(spinner_style());
        fetch_pb.enable_steady_tick(Duration::from_millis(120));
        let threads = fetcher.fetch_all_with_progress(video_id, |update| match update {
            FetchProgress::Threads { pages, comments } => {
                fetch_pb.set_message(format!("Fetching comments: {} threads, {} pages", comments, pages));
            },
            FetchProgress::Replies { done, total } => {
                fetch_pb.set_message(format!("Fetching replies: {}/{} threads", done, total));
            },
        }).await;
        fetch_pb.finish_and_clear();
        let threads = threads?;

        let fetched = count_all(&threads);
        let fetch_elapsed = start_time.elapsed();
        info!("Fetched {} comments in {} threads ({})", fetched, threads.len(), Self::format_duration(fetch_elapsed));

        // Filter
        let (threads, filter_stats) = apply_filters_with_stats(threads, &self.config.filter);
        info!(
            "Filtering kept {} of {} comments (emoji-only {}, ads {}, generic {}, with parent {})",
            filter_stats.kept,
            filter_stats.examined,
            filter_stats.emoji_only,
            filter_stats.advertisement,
            filter_stats.generic,
            filter_stats.dropped_with_parent
        );
        if threads.is_empty() {
            warn!("No comments left after filtering");
        }

        let mut report = Report::new(video, flatten_threads(&threads));
        report.fetched_comments = fetched;
        report.filter_stats = filter_stats;

        // Analyze
        match analyzer {
            Some(analyzer) if !report.rows.is_empty() => {
                let analysis_start = Instant::now();
                let analysis_pb = multi_progress.add(ProgressBar::new(report.rows.len() as u64));
                analysis_pb.set_style(bar_style());

                let summary = analyzer.analyze(&mut report.rows, |label, done, total| {
                    analysis_pb.set_length(total as u64);
                    analysis_pb.set_position(done as u64);
                    analysis_pb.set_message(label.to_string());
                }).await;
                analysis_pb.finish_and_clear();

                report.keywords = summary.keywords.entries().to_vec();
                report.analysis_stats = Some(summary.stats);
                report.target_language = analyzer.target_language().map(str::to_string);
                report.analysis_provider = Some(format!(
                    "{} ({})",
                    analyzer.provider().name(),
                    analyzer.provider().model()
                ));
                info!("Analysis completed in {}", Self::format_duration(analysis_start.elapsed()));
            },
            _ => {
                let table = KeywordTable::build(
                    report.rows.iter().map(|r| r.text.as_str()),
                    self.config.analysis.keyword_table_size,
                );
                report.keywords = table.entries().to_vec();
            }
        }

        // Export
        let paths = exporter.export(&report)
            .with_context(|| format!("Failed to write export files to {:?}", exporter.output_dir()))?;

        info!("Success: {}", paths.comments.display());
        info!("Summary: {}", paths.summary.display());
        if let Some(json) = &paths.json {
            info!("Report: {}", json.display());
        }
        info!("Done in {}", Self::format_duration(start_time.elapsed()));

        Ok(paths)
    }

    // Format duration in a human-readable format (HH:MM:SS)
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} comments ({percent}%) {msg} {eta}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}
