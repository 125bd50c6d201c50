/*!
 * Per-file translation state.
 */

use std::collections::HashSet;
use std::path::PathBuf;

use crate::subtitle_codec::{self, SubtitleBlock};
use super::completion::CompletionTracker;

/// What to translate and where to put it
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub source_language: String,
    pub target_language: String,
    pub context: String,
}

impl TranslationRequest {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            source_language: "English".to_string(),
            target_language: "Portuguese".to_string(),
            context: String::new(),
        }
    }

    pub fn with_languages(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_language = source.into();
        self.target_language = target.into();
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// Counters collected over one job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStats {
    /// Requests that reached the provider, including failed ones
    pub requests: usize,
    /// Quota errors answered with a backoff retry
    pub quota_retries: usize,
    /// Credential rotations triggered by this job
    pub rotations: usize,
    /// Reply segments dropped for not being subtitle blocks
    pub discarded_segments: usize,
    /// Reply blocks already present in the accumulated set
    pub duplicates_skipped: usize,
}

/// Summary of where a job ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub translated_blocks: usize,
    pub total_blocks: usize,
    pub stats: JobStats,
}

/// Terminal outcome of a job that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    /// Output written and checkpoint removed
    Completed {
        output_path: PathBuf,
        report: JobReport,
        /// Accepted through the near-completion streak with fewer blocks than expected
        converged_early: bool,
    },
    /// Stopped by the cancel check; checkpoint left for resumption
    Cancelled(JobReport),
}

impl TranslationOutcome {
    pub fn report(&self) -> &JobReport {
        match self {
            Self::Completed { report, .. } => report,
            Self::Cancelled(report) => report,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Accumulated state of one file being translated
#[derive(Debug)]
pub struct TranslationJob {
    request: TranslationRequest,
    total_blocks: usize,
    blocks: Vec<SubtitleBlock>,
    seen: HashSet<SubtitleBlock>,
    pub(crate) tracker: CompletionTracker,
    pub(crate) stats: JobStats,
}

impl TranslationJob {
    pub fn new(request: TranslationRequest, total_blocks: usize, tracker: CompletionTracker) -> Self {
        Self {
            request,
            total_blocks,
            blocks: Vec::new(),
            seen: HashSet::new(),
            tracker,
            stats: JobStats::default(),
        }
    }

    pub fn request(&self) -> &TranslationRequest {
        &self.request
    }

    pub fn total_blocks(&self) -> usize {
        self.total_blocks
    }

    pub fn blocks(&self) -> &[SubtitleBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.blocks.len() >= self.total_blocks
    }

    /// Append blocks not seen before, never growing past the expected total.
    /// Returns how many were added.
    pub fn append(&mut self, blocks: impl IntoIterator<Item = SubtitleBlock>) -> usize {
        let mut added = 0;
        for block in blocks {
            if self.is_complete() {
                break;
            }
            if self.seen.contains(&block) {
                self.stats.duplicates_skipped += 1;
                continue;
            }
            self.seen.insert(block.clone());
            self.blocks.push(block);
            added += 1;
        }
        added
    }

    /// Extract blocks from a model reply and append the new ones
    pub fn absorb_reply(&mut self, reply: &str) -> usize {
        let extraction = subtitle_codec::extract_blocks_with_stats(reply);
        self.stats.discarded_segments += extraction.discarded;
        self.append(extraction.blocks)
    }

    pub fn report(&self) -> JobReport {
        JobReport {
            translated_blocks: self.blocks.len(),
            total_blocks: self.total_blocks,
            stats: self.stats.clone(),
        }
    }
}
