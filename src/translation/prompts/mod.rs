/*!
 * Prompt construction for session-based subtitle translation.
 *
 * This module provides:
 * - The instruction template embedding languages and free-form context
 * - The opening message that carries the whole subtitle file
 * - The continuation message used for every follow-up turn
 */

pub mod templates;

// Re-export main types
pub use templates::{PromptTemplate, TranslationPromptBuilder, CONTINUE_MESSAGE, MESSAGE_PART_SEPARATOR};
