//! Conversation history with exchange-based trimming.

use kokoro_protocol::{ChatMessage, MessageRole};
use log::debug;

/// Ordered conversation history for one session.
///
/// Trimming counts user/assistant exchanges only; system and tool entries
/// are excluded from the count. When the history holds more complete
/// exchanges than allowed, whole exchanges are removed from the front —
/// including their tool messages, so no orphaned tool result survives — and
/// a leading system message keeps its position.
#[derive(Debug, Default, Clone)]
pub struct History {
    entries: Vec<ChatMessage>,
}

impl History {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    pub fn push(&mut self, message: ChatMessage) {
        self.entries.push(message);
    }

    /// Read-only view of the entries.
    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    /// Number of exchanges currently held (one per user message).
    pub fn exchange_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|message| message.role == MessageRole::User)
            .count()
    }

    /// Drop the oldest exchanges until at most `max` remain.
    pub fn trim_to_exchanges(&mut self, max: usize) {
        let before = self.entries.len();
        while self.exchange_count() > max {
            if !self.remove_oldest_exchange() {
                break;
            }
        }
        if self.entries.len() != before {
            debug!(
                "trimmed history (removed={}, exchanges={})",
                before - self.entries.len(),
                self.exchange_count()
            );
        }
    }

    /// Remove the oldest exchange: the first user message and everything up
    /// to (excluding) the next user message.
    fn remove_oldest_exchange(&mut self) -> bool {
        let Some(start) = self
            .entries
            .iter()
            .position(|message| message.role == MessageRole::User)
        else {
            return false;
        };
        let end = self.entries[start + 1..]
            .iter()
            .position(|message| message.role == MessageRole::User)
            .map(|offset| start + 1 + offset)
            .unwrap_or(self.entries.len());
        self.entries.drain(start..end);
        true
    }
}
