/*!
 * Credential rotation for pooling API quota across several keys.
 */

use std::collections::HashSet;

use log::{info, warn};

use crate::errors::TranslationError;
use super::events::{EventSink, TranslationEvent};

/// Mask a secret for display, keeping the first and last five characters
pub fn mask_credential(credential: &str) -> String {
    let chars: Vec<char> = credential.chars().collect();
    if chars.len() <= 10 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Ordered, fixed set of credentials with an exhaustion set and a current index
#[derive(Debug)]
pub struct CredentialRotator {
    credentials: Vec<String>,
    current_index: usize,
    exhausted: HashSet<String>,
    events: EventSink,
}

impl CredentialRotator {
    /// Create a rotator; fails when `credentials` is empty.
    /// Repeated credentials are kept once, in first-seen order.
    pub fn new(credentials: Vec<String>) -> Result<Self, TranslationError> {
        let given = credentials.len();
        let mut seen = HashSet::new();
        let credentials: Vec<String> = credentials
            .into_iter()
            .filter(|c| seen.insert(c.clone()))
            .collect();

        if credentials.len() < given {
            warn!(
                "Dropped {} repeated API key(s); rotating through {} distinct key(s)",
                given - credentials.len(), credentials.len()
            );
        }

        if credentials.is_empty() {
            return Err(TranslationError::Configuration(
                "At least one API key must be provided".to_string(),
            ));
        }

        Ok(Self {
            credentials,
            current_index: 0,
            exhausted: HashSet::new(),
            events: EventSink::disabled(),
        })
    }

    /// Send `CredentialChanged` events to `events` on every rotation
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Replace the event sink
    pub fn set_events(&mut self, events: EventSink) {
        self.events = events;
    }

    /// The credential at the current index
    pub fn current(&self) -> &str {
        &self.credentials[self.current_index]
    }

    /// Current index into the credential list
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Number of credentials in the pool
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always false; construction rejects an empty pool
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Advance to the next credential, wrapping around, and notify listeners
    pub fn rotate(&mut self) -> usize {
        self.current_index = (self.current_index + 1) % self.credentials.len();
        let masked = mask_credential(self.current());
        info!("Rotated to API key {} ({})", self.current_index + 1, masked);
        self.events.emit(TranslationEvent::CredentialChanged {
            index: self.current_index,
            masked,
        });
        self.current_index
    }

    /// Record `credential` as out of quota; repeated calls are no-ops
    pub fn mark_exhausted(&mut self, credential: &str) {
        self.exhausted.insert(credential.to_string());
    }

    /// Whether at least one credential has not been marked exhausted
    pub fn has_available(&self) -> bool {
        self.exhausted.len() < self.credentials.len()
    }

    /// Number of credentials marked exhausted
    pub fn exhausted_count(&self) -> usize {
        self.exhausted.len()
    }

    /// Forget every exhaustion mark; the current index is kept
    pub fn reset_exhausted(&mut self) {
        self.exhausted.clear();
    }
}
