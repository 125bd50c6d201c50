use anyhow::{anyhow, Result};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::TranslationError;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::providers::ChatBackend;
use crate::translation::{EventSink, TranslationEngine, TranslationEvent, TranslationOutcome, TranslationRequest};

// @module: File queue controller for subtitle translation

/// State of one queued file
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    /// Not processed yet
    Pending,
    /// Output written
    Completed,
    /// Output already existed and overwriting was not requested
    Skipped,
    /// Translation failed with the given message
    Failed(String),
}

/// A file in the queue together with its output path
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedFile {
    pub input: PathBuf,
    pub output: PathBuf,
    pub status: FileStatus,
}

/// Result of one pass over the queue
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueSummary {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Files still pending when the pass ended
    pub remaining: usize,
    /// The pass stopped because cancellation was requested
    pub cancelled: bool,
    pub duration: Duration,
}

impl QueueSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.cancelled && self.remaining == 0
    }
}

/// Sequential translation queue sharing one engine across files
pub struct Controller<B: ChatBackend> {
    // @field: App configuration
    config: Config,
    // @field: Engine shared by every file, so rotation state carries over
    engine: TranslationEngine<B>,
    events: EventSink,
    queue: Vec<QueuedFile>,
    output_dir: Option<PathBuf>,
    force_overwrite: bool,
    source_language: String,
    target_language: String,
}

impl<B: ChatBackend> Controller<B> {
    // @method: Create a controller; validates the config and the credential list
    pub fn with_config(config: Config, backend: B) -> Result<Self> {
        config.validate()?;

        let source_language = language_utils::resolve_language_name(&config.source_language)?;
        let target_language = language_utils::resolve_language_name(&config.target_language)?;
        let engine = TranslationEngine::new(backend, config.api_keys(), config.engine_config())?;

        Ok(Self {
            config,
            engine,
            events: EventSink::disabled(),
            queue: Vec::new(),
            output_dir: None,
            force_overwrite: false,
            source_language,
            target_language,
        })
    }

    /// Forward engine and queue events to `events`
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.engine = self.engine.with_events(events.clone());
        self.events = events;
        self
    }

    /// Write outputs to `dir` instead of next to each input
    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    /// Translate even when the output already exists
    pub fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &TranslationEngine<B> {
        &self.engine
    }

    pub fn queue(&self) -> &[QueuedFile] {
        &self.queue
    }

    /// Inputs whose last attempt failed, in queue order
    pub fn failed_files(&self) -> Vec<&Path> {
        self.queue
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Failed(_)))
            .map(|f| f.input.as_path())
            .collect()
    }

    /// Add files and directories to the queue; directories are searched
    /// recursively for subtitle files. Returns how many files were added.
    ///
    /// With an output directory, files found under a searched directory keep
    /// their relative location below it. A file whose output path is already
    /// taken by another queued file is left out, since both would share one
    /// output and one progress checkpoint.
    pub fn enqueue(&mut self, paths: &[PathBuf]) -> Result<usize> {
        let files = FileManager::collect_subtitle_files(paths)?;
        let tag = language_utils::language_tag(&self.config.target_language);
        let mut added = 0;

        for source in files {
            let input = source.path;
            if self.queue.iter().any(|f| f.input == input) {
                continue;
            }
            if is_translation_output(&input, &tag) {
                debug!("Skipping {}, it is already a translation", input.display());
                continue;
            }

            let output = self.output_path_for(&input, &source.relative_dir, &tag);
            if let Some(owner) = self.queue.iter().find(|f| f.output == output) {
                warn!(
                    "Skipping {}, its output {} is already claimed by {}",
                    input.display(), output.display(), owner.input.display()
                );
                continue;
            }

            self.queue.push(QueuedFile { input, output, status: FileStatus::Pending });
            added += 1;
        }

        if added == 0 {
            warn!("No subtitle files found in the given paths");
        }
        Ok(added)
    }

    /// Drop every file from the queue
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    fn output_path_for(&self, input: &Path, relative_dir: &Path, tag: &str) -> PathBuf {
        let dir = match &self.output_dir {
            Some(dir) => dir.join(relative_dir),
            None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        FileManager::generate_output_path(input, dir, tag)
    }

    /// Translate every pending file in order.
    ///
    /// `cancel` is checked between files and by the engine between
    /// continuation rounds; once it returns true the pass ends and the
    /// remaining files stay pending.
    pub async fn run<F>(&mut self, cancel: F) -> QueueSummary
    where
        F: Fn() -> bool + Send + Sync,
    {
        let start_time = Instant::now();
        let mut summary = QueueSummary::default();

        for index in 0..self.queue.len() {
            if self.queue[index].status != FileStatus::Pending {
                continue;
            }
            if cancel() {
                summary.cancelled = true;
                break;
            }

            let stop = self.process(index, &cancel, &mut summary).await;
            if stop {
                break;
            }
        }

        summary.remaining = self.queue.iter().filter(|f| f.status == FileStatus::Pending).count();
        summary.duration = start_time.elapsed();
        info!(
            "Queue finished in {}: {} completed, {} skipped, {} failed, {} remaining",
            format_duration(summary.duration),
            summary.completed, summary.skipped, summary.failed, summary.remaining
        );
        summary
    }

    /// Mark failed files pending again and run the queue over them only
    pub async fn retry_failed<F>(&mut self, cancel: F) -> QueueSummary
    where
        F: Fn() -> bool + Send + Sync,
    {
        let mut retried = 0;
        for file in &mut self.queue {
            if matches!(file.status, FileStatus::Failed(_)) {
                file.status = FileStatus::Pending;
                retried += 1;
            }
        }

        if retried == 0 {
            info!("No failed files to retry");
            return QueueSummary::default();
        }

        info!("Retrying {} failed file(s)", retried);
        self.engine.reset_credentials();
        self.run(cancel).await
    }

    /// Process one file; returns true when the queue must stop
    async fn process<F>(&mut self, index: usize, cancel: &F, summary: &mut QueueSummary) -> bool
    where
        F: Fn() -> bool + Send + Sync,
    {
        let input = self.queue[index].input.clone();
        let output = self.queue[index].output.clone();

        if FileManager::file_exists(&output) && !self.force_overwrite {
            warn!("Skipping {}, translation already exists (use --force to overwrite)", input.display());
            self.queue[index].status = FileStatus::Skipped;
            summary.skipped += 1;
            return false;
        }

        if let Some(parent) = output.parent() {
            if let Err(e) = FileManager::ensure_dir(parent) {
                self.fail(index, &input, e.to_string(), summary);
                return false;
            }
        }

        info!("Translating {} ({}/{})", input.display(), index + 1, self.queue.len());
        self.events.status(format!("Processing: {}", input.display()));

        let request = TranslationRequest::new(&input, &output)
            .with_languages(&self.source_language, &self.target_language)
            .with_context(&self.config.context);

        match self.engine.translate_file(&request, cancel).await {
            Ok(TranslationOutcome::Completed { output_path, .. }) => {
                self.queue[index].status = FileStatus::Completed;
                summary.completed += 1;
                self.events.emit(TranslationEvent::FileCompleted { input, output: output_path });
                false
            }
            Ok(TranslationOutcome::Cancelled(report)) => {
                info!(
                    "Stopped {} at {}/{} blocks; progress kept for the next run",
                    input.display(), report.translated_blocks, report.total_blocks
                );
                summary.cancelled = true;
                true
            }
            Err(e) => {
                let stop = matches!(e, TranslationError::AllCredentialsExhausted { .. });
                self.fail(index, &input, e.to_string(), summary);
                if stop {
                    error!("Every API key is out of quota; stopping the queue");
                }
                stop
            }
        }
    }

    fn fail(&mut self, index: usize, input: &Path, message: String, summary: &mut QueueSummary) {
        error!("Failed to translate {}: {}", input.display(), message);
        self.queue[index].status = FileStatus::Failed(message.clone());
        summary.failed += 1;
        self.events.emit(TranslationEvent::FileFailed { input: input.to_path_buf(), message });
    }
}

/// Whether `path` is named like an output for language `tag`, e.g. `movie.pt.srt`
fn is_translation_output(path: &Path, tag: &str) -> bool {
    path.file_stem()
        .and_then(|stem| Path::new(stem).extension())
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(tag))
}

/// Fail early with a readable message when no API key is configured
pub fn require_api_keys(config: &Config) -> Result<()> {
    if config.api_keys().is_empty() {
        return Err(anyhow!(
            "No API key configured; set provider.api_keys in the config file, pass --api-key or set SUBSESSION_API_KEYS"
        ));
    }
    Ok(())
}

/// Format a duration in a human-readable form
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
