/*!
 * Typed notifications emitted while translating.
 *
 * The engine never calls into a UI directly; it pushes these events onto an
 * unbounded channel and whoever holds the receiver decides what to do.
 */

use std::path::PathBuf;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Notification emitted by the engine or the file queue
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationEvent {
    /// Accumulated block count changed
    Progress {
        /// Blocks translated so far
        current: usize,
        /// Blocks expected in total
        total: usize,
    },
    /// Human-readable status line
    Status(String),
    /// The active credential changed
    CredentialChanged {
        /// Index of the new current credential
        index: usize,
        /// Masked form of the new credential
        masked: String,
    },
    /// A queued file finished successfully
    FileCompleted {
        input: PathBuf,
        output: PathBuf,
    },
    /// A queued file failed
    FileFailed {
        input: PathBuf,
        message: String,
    },
}

/// Cloneable sending half; sending never blocks and a dropped receiver is ignored
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<TranslationEvent>>,
}

impl EventSink {
    /// A sink that discards everything
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Create a connected sink/receiver pair
    pub fn channel() -> (Self, UnboundedReceiver<TranslationEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender: Some(sender) }, receiver)
    }

    /// Emit an event
    pub fn emit(&self, event: TranslationEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }

    /// Emit a status line
    pub fn status(&self, message: impl Into<String>) {
        self.emit(TranslationEvent::Status(message.into()));
    }

    /// Emit a progress update
    pub fn progress(&self, current: usize, total: usize) {
        self.emit(TranslationEvent::Progress { current, total });
    }
}
