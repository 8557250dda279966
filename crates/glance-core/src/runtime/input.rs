//! Stack of open input prompts.

use super::Handle;

/// A prompt shown to the user, waiting for a line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInput {
    /// Label shown before the text field.
    pub prompt: String,
    /// Hint shown in the empty field.
    pub placeholder: String,
    /// Callback resolved with the submitted text.
    pub handle: Handle,
}

/// Open prompts, most recent on top.
///
/// Only the top prompt is shown. Submitting or cancelling it uncovers the
/// one below.
#[derive(Debug, Default)]
pub struct InputPrompts {
    stack: Vec<PendingInput>,
}

impl InputPrompts {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a new prompt on top.
    pub fn open(&mut self, pending: PendingInput) {
        self.stack.push(pending);
    }

    /// Returns the prompt currently shown.
    #[must_use]
    pub fn current(&self) -> Option<&PendingInput> {
        self.stack.last()
    }

    /// Removes and returns the top prompt.
    pub fn pop(&mut self) -> Option<PendingInput> {
        self.stack.pop()
    }

    /// Number of open prompts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns true if no prompt is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
