//! Error types for the core library.

use thiserror::Error;

use crate::runtime::Handle;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A capability was called with malformed arguments.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Something other than a function (or nil) was offered as a callback.
    #[error("Invalid closure for {handle}: expected a function or nil")]
    InvalidClosure {
        /// Handle the callback was meant to be registered under.
        handle: Handle,
    },

    /// Uncaught failure inside user script code.
    #[error("Script error: {0}")]
    Script(#[from] mlua::Error),

    /// The startup script failed to load or run.
    #[error("Error executing {chunk}: {source}")]
    ScriptLoad {
        /// Name of the chunk that failed (usually the script path).
        chunk: String,
        /// Underlying Lua error, carrying the failing location.
        source: mlua::Error,
    },

    /// The notmuch command line tool failed.
    #[error("notmuch error: {0}")]
    Notmuch(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
