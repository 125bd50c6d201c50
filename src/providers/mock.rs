/*!
 * Scripted provider for testing.
 *
 * A `MockBackend` replays a queue of canned replies shared by every session it
 * opens, and records what was sent, with which credential, and how long the
 * conversation history was at that point.
 */

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::ProviderError;
use super::{ChatBackend, ChatReply, ChatSession, ChatTurn, SessionParams};

/// One canned outcome for a `send` call
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Successful reply with this text
    Text(String),
    /// Rate-limit error
    QuotaExhausted,
    /// Non-retryable API error
    ApiError { status_code: u16, message: String },
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    fn into_result(self) -> Result<ChatReply, ProviderError> {
        match self {
            Self::Text(text) => Ok(ChatReply { text }),
            Self::QuotaExhausted => Err(ProviderError::QuotaExhausted("Simulated quota exhaustion".to_string())),
            Self::ApiError { status_code, message } => Err(ProviderError::ApiError { status_code, message }),
        }
    }
}

/// A message the engine sent through a mock session
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    /// Credential bound when the session was opened
    pub credential: String,
    /// Message text
    pub text: String,
    /// History length before the message
    pub history_len: usize,
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<MockReply>,
    sent: Vec<SentMessage>,
    configured: Vec<String>,
    sessions_started: usize,
}

/// Backend whose sessions replay a shared script
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    credential: String,
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a backend that replays `replies` in order
    pub fn with_script(replies: impl IntoIterator<Item = MockReply>) -> Self {
        let backend = Self::default();
        backend.state.lock().script.extend(replies);
        backend
    }

    /// Queue more replies
    pub fn push(&self, reply: MockReply) {
        self.state.lock().script.push_back(reply);
    }

    /// Everything sent so far
    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().sent.clone()
    }

    /// Credentials passed to `configure`, in order
    pub fn configured(&self) -> Vec<String> {
        self.state.lock().configured.clone()
    }

    /// Number of sessions opened
    pub fn sessions_started(&self) -> usize {
        self.state.lock().sessions_started
    }

    /// Replies not consumed yet
    pub fn remaining(&self) -> usize {
        self.state.lock().script.len()
    }
}

impl ChatBackend for MockBackend {
    type Session = MockSession;

    fn configure(&mut self, credential: &str) {
        self.credential = credential.to_string();
        self.state.lock().configured.push(credential.to_string());
    }

    fn start_session(&self, _params: &SessionParams, history: Vec<ChatTurn>) -> MockSession {
        self.state.lock().sessions_started += 1;
        MockSession {
            credential: self.credential.clone(),
            state: Arc::clone(&self.state),
            history,
        }
    }
}

/// Session handed out by `MockBackend`
#[derive(Debug)]
pub struct MockSession {
    credential: String,
    state: Arc<Mutex<MockState>>,
    history: Vec<ChatTurn>,
}

#[async_trait]
impl ChatSession for MockSession {
    async fn send(&mut self, message: &str) -> Result<ChatReply, ProviderError> {
        let reply = {
            let mut state = self.state.lock();
            state.sent.push(SentMessage {
                credential: self.credential.clone(),
                text: message.to_string(),
                history_len: self.history.len(),
            });
            state.script.pop_front()
        };

        let reply = reply
            .ok_or_else(|| ProviderError::RequestFailed("Mock script exhausted".to_string()))?
            .into_result()?;

        self.history.push(ChatTurn::user(message));
        self.history.push(ChatTurn::model(reply.text.clone()));
        Ok(reply)
    }

    fn history(&self) -> &[ChatTurn] {
        &self.history
    }
}
