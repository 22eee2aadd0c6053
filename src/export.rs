/*!
 * Spreadsheet export.
 *
 * A report becomes two UTF-8 CSV sheets that open directly in Excel,
 * LibreOffice or Google Sheets:
 * - `<video>_comments.csv`: one row per comment, replies right after their parent
 * - `<video>_summary.csv`: video metadata, filter counts, distributions and keywords
 *
 * Optionally the whole report is also written as pretty-printed JSON.
 */

use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::app_config::ExportConfig;
use crate::errors::ExportError;
use crate::file_utils::FileManager;
use crate::report::{CommentRow, Report};

/// Byte order mark so spreadsheet apps detect UTF-8
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Leading characters that make spreadsheet apps evaluate a cell
const FORMULA_TRIGGERS: [char; 6] = ['=', '+', '-', '@', '\t', '\r'];

/// Files written for one report
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPaths {
    pub comments: PathBuf,
    pub summary: PathBuf,
    pub json: Option<PathBuf>,
}

/// Writes reports into an output directory
#[derive(Debug, Clone)]
pub struct WorkbookExporter {
    output_dir: PathBuf,
    write_json: bool,
}

impl WorkbookExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            write_json: false,
        }
    }

    /// Also write the JSON report
    pub fn with_json(mut self, write_json: bool) -> Self {
        self.write_json = write_json;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write all sheets for `report`
    pub fn export(&self, report: &Report) -> Result<ExportPaths, ExportError> {
        std::fs::create_dir_all(&self.output_dir)?;

        let video_id = &report.video.id;
        let comments = FileManager::generate_output_path(&self.output_dir, video_id, "comments", "csv");
        let summary = FileManager::generate_output_path(&self.output_dir, video_id, "summary", "csv");

        write_comments_sheet(&comments, report)?;
        write_summary_sheet(&summary, report)?;

        let json = if self.write_json {
            let path = FileManager::generate_output_path(&self.output_dir, video_id, "report", "json");
            let writer = BufWriter::new(File::create(&path)?);
            serde_json::to_writer_pretty(writer, report)?;
            Some(path)
        } else {
            None
        };

        info!("Wrote {} rows to {:?}", report.rows.len(), comments);
        Ok(ExportPaths { comments, summary, json })
    }
}

impl From<&ExportConfig> for WorkbookExporter {
    fn from(config: &ExportConfig) -> Self {
        Self::new(&config.output_dir).with_json(config.write_json)
    }
}

fn sheet_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>, ExportError> {
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(UTF8_BOM)?;
    Ok(csv::Writer::from_writer(file))
}

/// Column headers of the comments sheet
pub fn comment_headers(with_translation: bool, with_analysis: bool) -> Vec<&'static str> {
    let mut headers = vec![
        "thread", "type", "comment_id", "parent_id", "author", "published_at", "likes", "replies", "text",
    ];
    if with_translation {
        headers.push("translation");
    }
    if with_analysis {
        headers.extend(["sentiment", "category", "keywords"]);
    }
    headers
}

/// Quote free text that a spreadsheet would run as a formula
pub fn sanitize_cell(value: &str) -> String {
    if value.starts_with(FORMULA_TRIGGERS) {
        format!("'{}", value)
    } else {
        value.to_string()
    }
}

fn comment_record(row: &CommentRow, with_translation: bool, with_analysis: bool) -> Vec<String> {
    let mut record = vec![
        row.thread.to_string(),
        if row.is_reply() { "reply" } else { "comment" }.to_string(),
        row.comment_id.clone(),
        row.parent_id.clone().unwrap_or_default(),
        sanitize_cell(&row.author),
        row.published_at.to_rfc3339(),
        row.like_count.to_string(),
        row.reply_count.to_string(),
        sanitize_cell(&row.text),
    ];
    if with_translation {
        record.push(sanitize_cell(row.translation.as_deref().unwrap_or_default()));
    }
    if with_analysis {
        match &row.analysis {
            Some(analysis) => {
                record.push(analysis.sentiment.to_string());
                record.push(analysis.category.to_string());
                record.push(sanitize_cell(&analysis.keywords.join(", ")));
            },
            None => record.extend([String::new(), String::new(), String::new()]),
        }
    }
    record
}

fn write_comments_sheet(path: &Path, report: &Report) -> Result<(), ExportError> {
    let with_translation = report.target_language.is_some();
    let with_analysis = report.has_analysis();

    let mut writer = sheet_writer(path)?;
    writer.write_record(comment_headers(with_translation, with_analysis))?;
    for row in &report.rows {
        writer.write_record(comment_record(row, with_translation, with_analysis))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_summary_sheet(path: &Path, report: &Report) -> Result<(), ExportError> {
    let mut writer = sheet_writer(path)?;
    writer.write_record(["section", "name", "value"])?;

    let video = &report.video;
    let mut rows: Vec<(&str, String, String)> = vec![
        ("video", "id".to_string(), video.id.clone()),
        ("video", "url".to_string(), format!("https://www.youtube.com/watch?v={}", video.id)),
        ("video", "title".to_string(), sanitize_cell(&video.title)),
        ("video", "channel".to_string(), sanitize_cell(&video.channel_title)),
        ("video", "published_at".to_string(), video.published_at.map(|d| d.to_rfc3339()).unwrap_or_default()),
        ("video", "views".to_string(), video.view_count.to_string()),
        ("video", "likes".to_string(), video.like_count.to_string()),
        ("video", "comments_reported".to_string(), video.comment_count.to_string()),
        ("export", "generated_at".to_string(), report.generated_at.to_rfc3339()),
        ("export", "fetched_comments".to_string(), report.fetched_comments.to_string()),
        ("export", "threads".to_string(), report.thread_count().to_string()),
        ("export", "replies".to_string(), report.reply_count().to_string()),
    ];

    let stats = &report.filter_stats;
    rows.extend([
        ("filter", "examined".to_string(), stats.examined.to_string()),
        ("filter", "kept".to_string(), stats.kept.to_string()),
        ("filter", "emoji_only".to_string(), stats.emoji_only.to_string()),
        ("filter", "advertisement".to_string(), stats.advertisement.to_string()),
        ("filter", "generic".to_string(), stats.generic.to_string()),
        ("filter", "dropped_with_parent".to_string(), stats.dropped_with_parent.to_string()),
    ]);

    if let Some(provider) = &report.analysis_provider {
        rows.push(("analysis", "provider".to_string(), sanitize_cell(provider)));
    }
    if let Some(language) = &report.target_language {
        rows.push(("analysis", "target_language".to_string(), language.clone()));
    }
    if let Some(batch_stats) = &report.analysis_stats {
        rows.extend([
            ("analysis", "batches".to_string(), batch_stats.batches.to_string()),
            ("analysis", "failed_batches".to_string(), batch_stats.failed_batches.to_string()),
            ("analysis", "fallback_items".to_string(), batch_stats.fallback_items.to_string()),
            ("analysis", "tokens".to_string(), batch_stats.total_tokens().to_string()),
        ]);
    }

    for (sentiment, count) in report.sentiment_distribution() {
        rows.push(("sentiment", sentiment.to_string(), count.to_string()));
    }
    for (category, count) in report.category_distribution() {
        rows.push(("category", category.to_string(), count.to_string()));
    }
    for keyword in &report.keywords {
        rows.push(("keyword", sanitize_cell(&keyword.word), keyword.count.to_string()));
    }

    for (section, name, value) in rows {
        writer.write_record([section, name.as_str(), value.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}
