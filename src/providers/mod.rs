/*!
 * Conversational provider contract and implementations.
 *
 * The engine talks to a language model through two traits:
 * - `ChatBackend`: binds a credential and opens sessions
 * - `ChatSession`: a stateful multi-turn conversation
 *
 * Implementations:
 * - `gemini`: Google Generative Language REST API
 * - `mock`: scripted backend for tests
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One message in a conversation history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, text: text.into() }
    }
}

/// Sampling parameters passed to the model unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

/// Content-filter threshold for one harm category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    pub fn new(category: impl Into<String>, threshold: impl Into<String>) -> Self {
        Self { category: category.into(), threshold: threshold.into() }
    }
}

/// Fixed per-session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    #[serde(default)]
    pub generation: GenerationParams,
    #[serde(default = "default_safety_settings")]
    pub safety_settings: Vec<SafetySetting>,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            generation: GenerationParams::default(),
            safety_settings: default_safety_settings(),
        }
    }
}

/// Text returned by the model for one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
}

/// A stateful conversation with the model
#[async_trait]
pub trait ChatSession: Send {
    /// Send a user message and wait for the model's reply.
    ///
    /// On success both the message and the reply are appended to the history;
    /// on failure the history is left unchanged so the message can be resent.
    async fn send(&mut self, message: &str) -> Result<ChatReply, ProviderError>;

    /// Conversation so far
    fn history(&self) -> &[ChatTurn];
}

/// Credential binding and session factory for a provider
pub trait ChatBackend: Send {
    /// Session type produced by this backend
    type Session: ChatSession;

    /// Bind subsequent sessions to `credential`
    fn configure(&mut self, credential: &str);

    /// Open a session, optionally seeded with an earlier conversation
    fn start_session(&self, params: &SessionParams, history: Vec<ChatTurn>) -> Self::Session;
}

fn default_temperature() -> f32 {
    1.0
}

fn default_top_p() -> f32 {
    0.95
}

fn default_top_k() -> u32 {
    64
}

fn default_max_output_tokens() -> u32 {
    8192
}

/// Every harm category with blocking disabled; subtitles routinely contain
/// violence and profanity that must be translated as-is
pub fn default_safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .into_iter()
    .map(|category| SafetySetting::new(category, "BLOCK_NONE"))
    .collect()
}

pub mod gemini;
pub mod mock;
