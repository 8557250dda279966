//! Per-prompt history of submitted input.

use std::collections::HashMap;

/// History of values submitted to each prompt.
///
/// Each prompt has its own list and a cursor. The cursor sits one past the
/// end when nothing is selected.
#[derive(Debug, Default)]
pub struct InputHistory {
    histories: HashMap<String, Vec<String>>,
    cursors: HashMap<String, usize>,
}

impl InputHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries for a prompt.
    #[must_use]
    pub fn count(&self, prompt: &str) -> usize {
        self.histories.get(prompt).map_or(0, Vec::len)
    }

    /// Records a submitted value. Empty values are ignored and a value that
    /// is already present moves to the end. Resets the cursor.
    pub fn add(&mut self, prompt: &str, input: &str) {
        if input.is_empty() {
            return;
        }
        let history = self.histories.entry(prompt.to_string()).or_default();
        history.retain(|entry| entry != input);
        history.push(input.to_string());
        self.reset(prompt);
    }

    /// Moves the cursor to the end (no entry selected).
    pub fn reset(&mut self, prompt: &str) {
        let count = self.count(prompt);
        self.cursors.insert(prompt.to_string(), count);
    }

    fn cursor(&self, prompt: &str) -> usize {
        self.cursors
            .get(prompt)
            .copied()
            .unwrap_or_else(|| self.count(prompt))
    }

    /// Moves the cursor to an older entry and returns it.
    pub fn previous(&mut self, prompt: &str) -> Option<&str> {
        let cursor = self.cursor(prompt).checked_sub(1)?;
        self.cursors.insert(prompt.to_string(), cursor);
        self.get(prompt)
    }

    /// Moves the cursor to a newer entry and returns it, or `None` once the
    /// cursor moves past the newest entry.
    pub fn next(&mut self, prompt: &str) -> Option<&str> {
        let cursor = (self.cursor(prompt) + 1).min(self.count(prompt));
        self.cursors.insert(prompt.to_string(), cursor);
        self.get(prompt)
    }

    /// Returns the entry under the cursor.
    #[must_use]
    pub fn get(&self, prompt: &str) -> Option<&str> {
        self.histories
            .get(prompt)?
            .get(self.cursor(prompt))
            .map(String::as_str)
    }

    /// Returns the most recent entry.
    #[must_use]
    pub fn last(&self, prompt: &str) -> Option<&str> {
        self.histories.get(prompt)?.last().map(String::as_str)
    }
}
