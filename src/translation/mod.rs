/*!
 * Session-based subtitle translation.
 *
 * This module contains the translation engine and the small policies it is
 * built from. It is split into several submodules:
 *
 * - `engine`: Drives one file through a multi-turn session
 * - `job`: Per-file request, accumulated state and outcome
 * - `backoff`: Exponential backoff with jitter for quota retries
 * - `credentials`: Credential pool with exhaustion tracking and rotation
 * - `completion`: Near-completion streak detection
 * - `progress`: On-disk checkpoints for resumption
 * - `events`: Typed notifications for progress displays
 * - `prompts`: Opening and continuation messages
 */

// Re-export main types for easier usage
pub use self::backoff::BackoffPolicy;
pub use self::completion::CompletionTracker;
pub use self::credentials::{mask_credential, CredentialRotator};
pub use self::engine::{EngineConfig, TranslationEngine};
pub use self::events::{EventSink, TranslationEvent};
pub use self::job::{JobReport, JobStats, TranslationJob, TranslationOutcome, TranslationRequest};
pub use self::progress::ProgressFile;

// Submodules
pub mod backoff;
pub mod completion;
pub mod credentials;
pub mod engine;
pub mod events;
pub mod job;
pub mod progress;
pub mod prompts;
