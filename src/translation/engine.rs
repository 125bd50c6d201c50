/*!
 * Session-based translation engine.
 *
 * One file is driven to completion through a single conversation:
 * the whole subtitle file goes out in the opening message, then "continue"
 * is sent until the accumulated block count reaches the input's count, the
 * near-completion streak fires, or the caller cancels. Every reply is
 * checkpointed to disk so an interrupted job resumes where it stopped.
 */

use log::{debug, error, info, warn};

use crate::errors::TranslationError;
use crate::file_utils::FileManager;
use crate::providers::{ChatBackend, ChatReply, ChatSession, SessionParams};
use crate::subtitle_codec;

use super::backoff::BackoffPolicy;
use super::completion::{CompletionTracker, DEFAULT_REQUIRED_STREAK, DEFAULT_THRESHOLD_PERCENT};
use super::credentials::{mask_credential, CredentialRotator};
use super::events::EventSink;
use super::job::{JobStats, TranslationJob, TranslationOutcome, TranslationRequest};
use super::progress::ProgressFile;
use super::prompts::{TranslationPromptBuilder, CONTINUE_MESSAGE};

/// Default number of attempts per credential before rotating
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Engine tuning, fixed for the engine's lifetime
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Mirror accumulated blocks to a checkpoint file
    pub save_progress: bool,
    /// Attempts per credential before rotating
    pub max_retries: u32,
    /// Wait schedule between quota retries
    pub backoff: BackoffPolicy,
    /// Completion percentage at which stalls start counting
    pub completion_threshold_percent: f64,
    /// Consecutive stalled observations that end a job
    pub completion_required_streak: u32,
    /// Generation and safety parameters passed through to every session
    pub session: SessionParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            save_progress: true,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffPolicy::default(),
            completion_threshold_percent: DEFAULT_THRESHOLD_PERCENT,
            completion_required_streak: DEFAULT_REQUIRED_STREAK,
            session: SessionParams::default(),
        }
    }
}

/// Drives files through a conversational backend with credential rotation
pub struct TranslationEngine<B: ChatBackend> {
    backend: B,
    rotator: CredentialRotator,
    config: EngineConfig,
    events: EventSink,
}

impl<B: ChatBackend> TranslationEngine<B> {
    /// Create an engine; fails when `credentials` is empty
    pub fn new(mut backend: B, credentials: Vec<String>, config: EngineConfig) -> Result<Self, TranslationError> {
        let rotator = CredentialRotator::new(credentials)?;
        backend.configure(rotator.current());

        Ok(Self {
            backend,
            rotator,
            config,
            events: EventSink::disabled(),
        })
    }

    /// Emit progress, status and credential events to `events`
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.rotator.set_events(events.clone());
        self.events = events;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rotator(&self) -> &CredentialRotator {
        &self.rotator
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Make every credential eligible again, e.g. after quotas have reset
    pub fn reset_credentials(&mut self) {
        self.rotator.reset_exhausted();
    }

    /// Translate one file.
    ///
    /// `cancel` is polled once per continuation round; returning true stops
    /// the job before the next request and leaves the checkpoint in place.
    /// On error the checkpoint is left in place as well.
    pub async fn translate_file<F>(&mut self, request: &TranslationRequest, cancel: F) -> Result<TranslationOutcome, TranslationError>
    where
        F: Fn() -> bool + Send + Sync,
    {
        match self.run_job(request, &cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("Error during translation of {}: {}", request.input_path.display(), e);
                Err(e)
            }
        }
    }

    async fn run_job<F>(&mut self, request: &TranslationRequest, cancel: &F) -> Result<TranslationOutcome, TranslationError>
    where
        F: Fn() -> bool + Send + Sync,
    {
        if !FileManager::file_exists(&request.input_path) {
            return Err(TranslationError::InputNotFound(request.input_path.clone()));
        }

        let input_text = FileManager::read_to_string(&request.input_path)
            .map_err(|e| TranslationError::File(e.to_string()))?;
        let total_blocks = subtitle_codec::count_blocks(&input_text);
        info!("Total SRT blocks in input file: {}", total_blocks);
        self.events.status(format!("Total SRT blocks: {}", total_blocks));

        let tracker = CompletionTracker::new(
            self.config.completion_threshold_percent,
            self.config.completion_required_streak,
        );
        let mut job = TranslationJob::new(request.clone(), total_blocks, tracker);
        let progress = ProgressFile::for_output(&request.output_path);

        if self.config.save_progress {
            if let Some(blocks) = progress.load()? {
                if blocks.len() > total_blocks {
                    warn!(
                        "Progress file {} holds {} blocks but only {} are expected; keeping the first {}",
                        progress.path().display(), blocks.len(), total_blocks, total_blocks
                    );
                }
                job.append(blocks);
                if !job.is_empty() {
                    info!("Loaded {}/{} blocks from progress file", job.len(), total_blocks);
                    self.events.status(format!("Loaded {}/{} blocks from progress", job.len(), total_blocks));
                    self.events.progress(job.len(), total_blocks);
                }
            }
        }

        let mut session = self.backend.start_session(&self.config.session, Vec::new());

        if job.is_empty() {
            self.events.status("Starting translation...");
            let message = TranslationPromptBuilder::new(&request.source_language, &request.target_language)
                .with_context(&request.context)
                .build_opening_message(&input_text);

            let reply = self.send_with_retry(&mut session, &message, &mut job.stats).await?;
            self.absorb(&mut job, &reply);
            self.checkpoint(&job, &progress)?;
        }

        let mut converged_early = false;
        while !job.is_complete() {
            if cancel() {
                info!("Translation cancelled");
                self.events.status("Translation cancellation requested");
                return Ok(TranslationOutcome::Cancelled(job.report()));
            }

            let current = job.len();
            if job.tracker.observe(current, total_blocks) {
                info!(
                    "Translation reached {}% completion for {} consecutive tries. Marking as complete.",
                    self.config.completion_threshold_percent, self.config.completion_required_streak
                );
                self.events.status(format!(
                    "Translation completed ({}% threshold reached)",
                    self.config.completion_threshold_percent
                ));
                converged_early = true;
                break;
            }

            self.events.status("Continuing translation...");
            let reply = self.send_with_retry(&mut session, CONTINUE_MESSAGE, &mut job.stats).await?;
            self.absorb(&mut job, &reply);
            self.checkpoint(&job, &progress)?;
        }

        FileManager::write_atomic(&request.output_path, &subtitle_codec::serialize(job.blocks()))
            .map_err(|e| TranslationError::File(e.to_string()))?;

        if self.config.save_progress {
            progress.remove()?;
        }

        let report = job.report();
        info!("Translation completed and saved to {}", request.output_path.display());
        log_stats(&report.stats);
        self.events.status(format!("Translation completed and saved to {}", request.output_path.display()));

        Ok(TranslationOutcome::Completed {
            output_path: request.output_path.clone(),
            report,
            converged_early,
        })
    }

    fn absorb(&self, job: &mut TranslationJob, reply: &ChatReply) {
        let discarded_before = job.stats.discarded_segments;
        let added = job.absorb_reply(&reply.text);
        let discarded = job.stats.discarded_segments - discarded_before;
        if discarded > 0 {
            warn!(
                "Discarded {} malformed segment(s) from reply ({} total this job)",
                discarded, job.stats.discarded_segments
            );
        }
        debug!("Reply added {} new block(s)", added);

        info!("Translated {}/{} blocks", job.len(), job.total_blocks());
        self.events.status(format!("Translated {}/{} blocks", job.len(), job.total_blocks()));
        self.events.progress(job.len(), job.total_blocks());
    }

    fn checkpoint(&self, job: &TranslationJob, progress: &ProgressFile) -> Result<(), TranslationError> {
        if self.config.save_progress {
            progress.save(job.blocks())?;
        }
        Ok(())
    }

    /// Send `message`, backing off on quota errors and rotating credentials
    /// once a credential has used up its attempts
    async fn send_with_retry(
        &mut self,
        session: &mut B::Session,
        message: &str,
        stats: &mut JobStats,
    ) -> Result<ChatReply, TranslationError> {
        let mut attempt: u32 = 0;

        loop {
            if let Some(delay) = self.config.backoff.wait_before(attempt) {
                info!(
                    "Backing off for {:.2} seconds (attempt {}/{})",
                    delay.as_secs_f64(), attempt, self.config.max_retries
                );
                tokio::time::sleep(delay).await;
            }

            stats.requests += 1;
            match session.send(message).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_quota_exhausted() => {
                    if attempt + 1 >= self.config.max_retries {
                        self.handle_quota_exhaustion(session)?;
                        stats.rotations += 1;
                        attempt = 0;
                    } else {
                        stats.quota_retries += 1;
                        attempt += 1;
                        warn!("Resource exhausted, retrying... ({}/{})", attempt, self.config.max_retries);
                    }
                }
                Err(e) => {
                    error!("Unexpected error during API request: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    /// Retire the current credential and rebind the session to the next one,
    /// keeping the conversation history
    fn handle_quota_exhaustion(&mut self, session: &mut B::Session) -> Result<(), TranslationError> {
        let current = self.rotator.current().to_string();
        warn!("API key {} exhausted its retry budget", mask_credential(&current));
        self.rotator.mark_exhausted(&current);

        if !self.rotator.has_available() {
            return Err(TranslationError::AllCredentialsExhausted { total: self.rotator.len() });
        }

        self.rotator.rotate();
        self.backend.configure(self.rotator.current());
        *session = self.backend.start_session(&self.config.session, session.history().to_vec());
        Ok(())
    }
}

fn log_stats(stats: &JobStats) {
    debug!(
        "Job stats: {} request(s), {} quota retr(ies), {} rotation(s), {} discarded segment(s), {} duplicate(s)",
        stats.requests, stats.quota_retries, stats.rotations, stats.discarded_segments, stats.duplicates_skipped
    );
}
