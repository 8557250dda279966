//! Message types for application events.
//!
//! In the Elm architecture, Messages are events that trigger state changes.

use glance_core::{SpawnResult, Thread};

/// Application messages (events).
#[derive(Debug, Clone)]
pub enum Message {
    /// A key press, as its identifier (`"q"`, `"ctrl+r"`, `"tab"`).
    Key(String),
    /// Text submitted to the open prompt.
    SubmitInput(String),
    /// The open prompt was dismissed.
    CancelInput,
    /// Recall the previous history entry into the open prompt.
    HistoryPrevious,
    /// Recall the next history entry into the open prompt.
    HistoryNext,
    /// Standard input reached end of file.
    InputClosed,
    /// A search finished.
    SearchFinished {
        /// Query the search ran for.
        query: String,
        /// Matching threads, or the error text.
        result: Result<Vec<Thread>, String>,
        /// Row to select once loaded.
        row: usize,
    },
    /// A script-spawned program finished.
    SpawnFinished(SpawnResult),
}
