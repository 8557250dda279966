//! Thread model.

use chrono::{DateTime, Utc};

use super::Message;

/// A thread of messages as returned by a search.
#[derive(Debug, Clone, Default)]
pub struct Thread {
    /// Thread identifier.
    pub id: String,
    /// Authors, matched authors first.
    pub authors: Vec<String>,
    /// Subject of the thread.
    pub subject: String,
    /// Union of the tags of all messages.
    pub tags: Vec<String>,
    /// Date of the most recent message.
    pub newest: Option<DateTime<Utc>>,
    /// Date of the oldest message.
    pub oldest: Option<DateTime<Utc>>,
    /// Number of messages matching the query.
    pub matched: usize,
    /// Matching messages, oldest first.
    pub messages: Vec<Message>,
}

impl Thread {
    /// Returns the number of messages in the thread.
    #[must_use]
    pub const fn message_count(&self) -> usize {
        self.messages.len()
    }
}
