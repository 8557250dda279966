//! Collaborators the runtime calls back into.

use std::cell::RefCell;

use tracing::{debug, error, info, trace, warn};

use super::Theme;
use crate::error::{Error, Result};
use crate::model::{Message, MessageId};

/// Tracing target for messages logged by scripts.
pub const SCRIPT_LOG_TARGET: &str = "glance::script";

/// Host-side services exposed to scripts.
///
/// Calls happen synchronously on the event loop, while a script is running.
pub trait Host {
    /// Current status text.
    fn status(&self) -> String;

    /// Every message in the current listing, in display order.
    fn all_messages(&self) -> Vec<Message>;

    /// Marked messages, in display order.
    fn marked_messages(&self) -> Vec<Message>;

    /// The message under the cursor, if any.
    fn selected_message(&self) -> Option<Message>;

    /// Applies tag operations (`+tag`, `-tag`) to messages. Completes before
    /// returning, so scripts observe the effect on their next statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the mail index could not be updated.
    fn tag(&self, ids: &[MessageId], tags: &[String]) -> Result<()>;

    /// Installs a new color theme.
    fn set_theme(&self, theme: Theme);

    /// Emits a message logged by the script at the given upper-cased level.
    fn log(&self, level: &str, message: &str) {
        log_script_message(level, message);
    }

    /// Reports a non-fatal script failure.
    fn report(&self, error: &Error) {
        warn!(%error, "script error");
    }
}

/// Routes a script log line to the matching tracing level.
pub fn log_script_message(level: &str, message: &str) {
    match level {
        "TRACE" => trace!(target: SCRIPT_LOG_TARGET, "{message}"),
        "DEBUG" => debug!(target: SCRIPT_LOG_TARGET, "{message}"),
        "INFO" => info!(target: SCRIPT_LOG_TARGET, "{message}"),
        "WARN" | "WARNING" => warn!(target: SCRIPT_LOG_TARGET, "{message}"),
        "ERROR" => error!(target: SCRIPT_LOG_TARGET, "{message}"),
        other => info!(target: SCRIPT_LOG_TARGET, level = other, "{message}"),
    }
}

/// A tag operation recorded by [`MemoryHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCall {
    /// Messages that were tagged.
    pub ids: Vec<MessageId>,
    /// Tag operations applied.
    pub tags: Vec<String>,
}

/// In-memory host for testing and embedding.
///
/// Serves a fixed message listing and records everything scripts do to it.
#[derive(Debug, Default)]
pub struct MemoryHost {
    status: RefCell<String>,
    messages: RefCell<Vec<Message>>,
    marked: RefCell<Vec<usize>>,
    selected: RefCell<Option<usize>>,
    tag_calls: RefCell<Vec<TagCall>>,
    theme: RefCell<Option<Theme>>,
    logs: RefCell<Vec<(String, String)>>,
    errors: RefCell<Vec<String>>,
}

impl MemoryHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the listing. The first message is selected and nothing is marked.
    #[must_use]
    pub fn with_messages(self, messages: Vec<Message>) -> Self {
        *self.selected.borrow_mut() = if messages.is_empty() { None } else { Some(0) };
        *self.messages.borrow_mut() = messages;
        self.marked.borrow_mut().clear();
        self
    }

    /// Marks the messages at the given rows.
    #[must_use]
    pub fn with_marked(self, rows: &[usize]) -> Self {
        self.marked.borrow_mut().extend_from_slice(rows);
        self
    }

    /// Sets the status text.
    pub fn set_status(&self, status: impl Into<String>) {
        *self.status.borrow_mut() = status.into();
    }

    /// Tag operations received so far.
    #[must_use]
    pub fn tag_calls(&self) -> Vec<TagCall> {
        self.tag_calls.borrow().clone()
    }

    /// The last theme installed by the script.
    #[must_use]
    pub fn theme(&self) -> Option<Theme> {
        self.theme.borrow().clone()
    }

    /// `(level, message)` pairs logged by the script.
    #[must_use]
    pub fn logs(&self) -> Vec<(String, String)> {
        self.logs.borrow().clone()
    }

    /// Errors reported by the runtime, rendered as text.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }
}

impl Host for MemoryHost {
    fn status(&self) -> String {
        self.status.borrow().clone()
    }

    fn all_messages(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    fn marked_messages(&self) -> Vec<Message> {
        let messages = self.messages.borrow();
        let mut rows = self.marked.borrow().clone();
        rows.sort_unstable();
        rows.dedup();
        rows.into_iter()
            .filter_map(|row| messages.get(row).cloned())
            .collect()
    }

    fn selected_message(&self) -> Option<Message> {
        let row = (*self.selected.borrow())?;
        self.messages.borrow().get(row).cloned()
    }

    fn tag(&self, ids: &[MessageId], tags: &[String]) -> Result<()> {
        let mut messages = self.messages.borrow_mut();
        for message in messages.iter_mut().filter(|m| ids.contains(&m.id)) {
            message.apply_tags(tags);
        }
        self.tag_calls.borrow_mut().push(TagCall {
            ids: ids.to_vec(),
            tags: tags.to_vec(),
        });
        Ok(())
    }

    fn set_theme(&self, theme: Theme) {
        *self.theme.borrow_mut() = Some(theme);
    }

    fn log(&self, level: &str, message: &str) {
        log_script_message(level, message);
        self.logs
            .borrow_mut()
            .push((level.to_string(), message.to_string()));
    }

    fn report(&self, error: &Error) {
        warn!(%error, "script error");
        self.errors.borrow_mut().push(error.to_string());
    }
}
