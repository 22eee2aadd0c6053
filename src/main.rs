// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

use ytcomments::app_config::{self, Config, LlmProviderKind};
use ytcomments::app_controller::Controller;
use ytcomments::file_utils::FileManager;

/// CLI Wrapper for LlmProviderKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliProvider {
    Gemini,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
}

impl From<CliProvider> for LlmProviderKind {
    fn from(cli_provider: CliProvider) -> Self {
        match cli_provider {
            CliProvider::Gemini => LlmProviderKind::Gemini,
            CliProvider::OpenAI => LlmProviderKind::OpenAI,
            CliProvider::Anthropic => LlmProviderKind::Anthropic,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch, filter, analyze and export the comments of a video (default command)
    Run(RunArgs),

    /// Generate shell completions for ytcomments
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// YouTube video URL or 11-character video id
    #[arg(value_name = "VIDEO")]
    video: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// YouTube Data API key
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    youtube_api_key: Option<String>,

    /// LLM provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliProvider>,

    /// Model name for the LLM provider
    #[arg(short, long)]
    model: Option<String>,

    /// Comma-separated API keys for the LLM provider
    #[arg(long, env = "LLM_API_KEYS", hide_env_values = true)]
    llm_api_keys: Option<String>,

    /// Translate comments
    #[arg(short, long)]
    translate: bool,

    /// Classify sentiment and category
    #[arg(short = 'a', long)]
    classify: bool,

    /// Target language code for translation (e.g., 'en', 'de', 'ja')
    #[arg(short = 'T', long)]
    target_language: Option<String>,

    /// Directory for the exported sheets
    #[arg(short, long)]
    output_dir: Option<String>,

    /// Also write the full report as JSON
    #[arg(long)]
    json: bool,

    /// Stop after this many top-level comments
    #[arg(long)]
    max_comments: Option<usize>,

    /// Keep emoji-only comments
    #[arg(long)]
    keep_emoji: bool,

    /// Keep advertisement and spam comments
    #[arg(long)]
    keep_ads: bool,

    /// Remove short generic comments ("first", "nice video")
    #[arg(long)]
    drop_generic: bool,

    /// Disable all comment filters
    #[arg(long, conflicts_with_all = ["keep_emoji", "keep_ads", "drop_generic"])]
    no_filter: bool,
}

/// ytcomments - YouTube comment export with AI analysis
///
/// Downloads every comment thread of a YouTube video, filters noise, optionally
/// translates and classifies the comments with an LLM, and writes spreadsheets.
#[derive(Parser, Debug)]
#[command(name = "ytcomments")]
#[command(version)]
#[command(about = "Export and analyze YouTube comments")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "ytcomments fetches the comments of a YouTube video, filters noise and exports them as spreadsheets.

EXAMPLES:
    ytcomments https://youtu.be/dQw4w9WgXcQ              # Export all comments
    ytcomments -t -T de dQw4w9WgXcQ                       # Translate into German
    ytcomments -a -p openai -m gpt-4o-mini dQw4w9WgXcQ    # Classify with OpenAI
    ytcomments --max-comments 500 --json dQw4w9WgXcQ      # First 500 threads, plus JSON
    ytcomments completions bash > ytcomments.bash         # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. API keys can also come from YOUTUBE_API_KEY and
    LLM_API_KEYS (comma-separated).

SUPPORTED PROVIDERS:
    gemini    - Google Gemini (default: gemini-1.5-flash)
    openai    - OpenAI API or compatible servers
    anthropic - Anthropic Claude API")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Marker for log level
    fn get_marker_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "✖",
            Level::Warn => "!",
            Level::Info => "›",
            Level::Debug => "·",
            Level::Trace => "…",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // Dependency debug output stays out of the terminal
        metadata.level() <= self.level
            && (metadata.target().starts_with("ytcomments") || metadata.level() <= Level::Warn)
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_marker_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    if let Err(e) = CustomLogger::init(LevelFilter::Trace) {
        eprintln!("Failed to initialize logger: {}", e);
    }
    log::set_max_level(LevelFilter::Info);

    if let Err(e) = run_cli().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<()> {
    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "ytcomments", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Run(args)) => run(args).await,
        None => run(cli.run).await,
    }
}

/// Load the config file, creating a default one when it does not exist
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if FileManager::file_exists(config_path) {
        let content = FileManager::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&content)
            .context(format!("Failed to parse config file: {}", config_path))?;
        Ok(config)
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        FileManager::write_to_file(config_path, &config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        Ok(config)
    }
}

/// Apply command line overrides on top of the file configuration
fn apply_overrides(config: &mut Config, options: &RunArgs) {
    if let Some(key) = &options.youtube_api_key {
        config.youtube.api_key = key.trim().to_string();
    }

    if let Some(provider) = &options.provider {
        config.analysis.provider = provider.clone().into();
    }

    if let Some(model) = &options.model {
        config.analysis.active_provider_config_mut().model = model.clone();
    }

    if let Some(keys) = &options.llm_api_keys {
        let keys: Vec<String> = keys.split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if !keys.is_empty() {
            config.analysis.active_provider_config_mut().api_keys = keys;
        }
    }

    if options.translate {
        config.analysis.translate = true;
    }

    if options.classify {
        config.analysis.classify = true;
    }

    if let Some(target_language) = &options.target_language {
        config.analysis.target_language = target_language.clone();
    }

    if let Some(output_dir) = &options.output_dir {
        config.export.output_dir = output_dir.clone();
    }

    if options.json {
        config.export.write_json = true;
    }

    if let Some(max_comments) = options.max_comments {
        config.youtube.max_comments = max_comments;
    }

    if options.no_filter {
        config.filter = ytcomments::filter::FilterOptions::none();
    } else {
        if options.keep_emoji {
            config.filter.exclude_emoji_only = false;
        }
        if options.keep_ads {
            config.filter.exclude_advertisements = false;
        }
        if options.drop_generic {
            config.filter.exclude_generic = true;
        }
    }

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run(options: RunArgs) -> Result<()> {
    let video = options.video.clone()
        .ok_or_else(|| anyhow!("VIDEO is required: pass a YouTube URL or video id"))?;

    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level_filter(&config_log_level));
    }

    let mut config = load_or_create_config(&options.config_path)?;
    apply_overrides(&mut config, &options);
    log::set_max_level(level_filter(&config.log_level));

    let controller = Controller::with_config(config)
        .context("Configuration validation failed")?;

    controller.run(&video).await?;
    Ok(())
}
