/*!
 * # subsession - Session-based subtitle translation
 *
 * A Rust library that translates SRT subtitle files through a single
 * multi-turn conversation with a generative language model.
 *
 * ## Features
 *
 * - Whole-file prompting with "continue" follow-ups until every block is back
 * - Resumable jobs through on-disk progress checkpoints
 * - Exponential backoff with jitter on quota errors
 * - Credential rotation that keeps the conversation history
 * - Near-completion detection for models that stall on the last blocks
 * - Sequential file queue with failed-file retry
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `app_controller`: File queue driving the translation engine
 * - `subtitle_codec`: Block counting, extraction and serialization
 * - `translation`: The engine and its policies:
 *   - `translation::engine`: Per-file conversation driver
 *   - `translation::backoff`: Retry delay schedule
 *   - `translation::credentials`: Credential rotation
 *   - `translation::completion`: Near-completion streak
 *   - `translation::progress`: Checkpoint files
 * - `providers`: Conversational backends:
 *   - `providers::gemini`: Google Generative Language API client
 *   - `providers::mock`: Scripted backend for tests
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod subtitle_codec;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, QueueSummary};
pub use subtitle_codec::SubtitleBlock;
pub use translation::{TranslationEngine, TranslationEvent, TranslationOutcome, TranslationRequest};
