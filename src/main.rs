// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use subsession::app_config::{self, Config};
use subsession::app_controller::{self, Controller, QueueSummary};
use subsession::providers::gemini::Gemini;
use subsession::translation::{EventSink, TranslationEvent};

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
    /// Translate subtitle files (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for subsession
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct TranslateArgs {
    /// Subtitle files or directories to translate
    #[arg(value_name = "INPUT_PATH")]
    inputs: Vec<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force: bool,

    /// Directory for translated files (default: next to each input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Source language name or code (e.g. 'English', 'en')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language name or code (e.g. 'Portuguese', 'pt')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Extra context for the translator (show name, tone, glossary)
    #[arg(long)]
    context: Option<String>,

    /// API key; repeat to add more keys for rotation
    #[arg(short = 'k', long = "api-key", env = "SUBSESSION_API_KEYS", value_delimiter = ',')]
    api_keys: Vec<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Do not write or read progress checkpoints
    #[arg(long)]
    no_progress: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// subsession - Session-based subtitle translation
///
/// Translates SRT subtitle files through a multi-turn conversation with a
/// Gemini model, resuming interrupted jobs and rotating API keys on quota errors.
#[derive(Parser, Debug)]
#[command(name = "subsession")]
#[command(version)]
#[command(about = "Session-based subtitle translation tool")]
#[command(long_about = "subsession sends each subtitle file to a language model in one conversation and keeps asking it to continue until every block is translated.

EXAMPLES:
    subsession movie.srt                          # Translate using default config
    subsession -t es movie.srt                    # Translate into Spanish
    subsession -k KEY1 -k KEY2 season1/           # Rotate between two API keys
    subsession -o out/ --force *.srt              # Write to out/, overwrite existing
    subsession completions bash > subsession.bash # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

    Interrupted translations leave a .progress file next to the output; running
    the same command again resumes from it.")]
#[command(args_conflicts_with_subcommands = true)]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
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
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()), now, record.level(), record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace is the ceiling; the effective level is lowered once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subsession", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    }
}

/// Apply command line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(source) = &options.source_language {
        config.source_language = source.clone();
    }
    if let Some(target) = &options.target_language {
        config.target_language = target.clone();
    }
    if let Some(context) = &options.context {
        config.context = context.clone();
    }
    if let Some(model) = &options.model {
        config.provider.model = model.clone();
    }
    if !options.api_keys.is_empty() {
        config.provider.api_keys = options.api_keys.clone();
    }
    if options.no_progress {
        config.save_progress = false;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    if let Some(level) = &options.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    if options.inputs.is_empty() {
        return Err(anyhow::anyhow!("INPUT_PATH is required when no subcommand is specified"));
    }

    let mut config = Config::load_or_create(&options.config)?;
    apply_overrides(&mut config, &options);
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());
    app_controller::require_api_keys(&config)?;

    let backend = Gemini::new(&config.provider.model, &config.provider.endpoint, config.provider.timeout_secs)
        .context("Failed to create Gemini client")?;

    let (events, receiver) = EventSink::channel();
    let mut controller = Controller::with_config(config, backend)?
        .with_events(events)
        .with_output_dir(options.output_dir.clone())
        .with_force_overwrite(options.force);

    let queued = controller.enqueue(&options.inputs)?;
    if queued == 0 {
        return Ok(());
    }
    info!(
        "Queued {} file(s): {} -> {} with {}",
        queued,
        controller.config().source_language,
        controller.config().target_language,
        controller.config().provider.model
    );

    let cancel_flag = Arc::new(AtomicBool::new(false));
    spawn_ctrl_c_handler(Arc::clone(&cancel_flag));
    let display = tokio::spawn(drive_progress_bar(receiver));

    let flag = Arc::clone(&cancel_flag);
    let summary = controller.run(move || flag.load(Ordering::SeqCst)).await;

    // Closing the channel ends the display task
    drop(controller);
    let _ = display.await;

    report_summary(&summary);
    if summary.failed > 0 {
        return Err(anyhow::anyhow!("{} file(s) failed to translate", summary.failed));
    }
    Ok(())
}

fn spawn_ctrl_c_handler(flag: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current request");
            flag.store(true, Ordering::SeqCst);
        }
    });
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} blocks ({percent}%) {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}

/// Render engine events until the sending side is dropped
async fn drive_progress_bar(mut receiver: UnboundedReceiver<TranslationEvent>) {
    let mut bar: Option<ProgressBar> = None;

    while let Some(event) = receiver.recv().await {
        match event {
            TranslationEvent::Progress { current, total } => {
                let pb = bar.get_or_insert_with(|| {
                    let pb = ProgressBar::new(total as u64);
                    pb.set_style(progress_style());
                    pb
                });
                pb.set_length(total as u64);
                pb.set_position(current as u64);
            }
            TranslationEvent::Status(message) => {
                if let Some(pb) = &bar {
                    pb.set_message(message);
                }
            }
            TranslationEvent::CredentialChanged { index, masked } => {
                let line = format!("Switched to API key {} ({})", index + 1, masked);
                match &bar {
                    Some(pb) => pb.println(line),
                    None => info!("{}", line),
                }
            }
            TranslationEvent::FileCompleted { output, .. } => {
                if let Some(pb) = bar.take() {
                    pb.finish_and_clear();
                }
                info!("Success: {}", output.display());
            }
            TranslationEvent::FileFailed { input, message } => {
                if let Some(pb) = bar.take() {
                    pb.abandon();
                }
                error!("Failed: {} ({})", input.display(), message);
            }
        }
    }

    if let Some(pb) = bar.take() {
        pb.abandon();
    }
}

fn report_summary(summary: &QueueSummary) {
    let duration = app_controller::format_duration(summary.duration);
    if summary.cancelled {
        warn!(
            "Cancelled after {}: {} completed, {} remaining; rerun to resume",
            duration, summary.completed, summary.remaining
        );
    } else {
        info!(
            "Done in {}: {} completed, {} skipped, {} failed",
            duration, summary.completed, summary.skipped, summary.failed
        );
    }
}
