//! Host-side services.
//!
//! These hold the state the script reads and the commands it returns act on:
//! the message list with its marks, the saved queries, the status line and
//! the per-prompt input history.

pub mod input_history;
pub mod messages;
pub mod queries;
pub mod status;

pub use input_history::InputHistory;
pub use messages::Messages;
pub use queries::{QUERY_NAME_LENGTH, Queries};
pub use status::{Notification, Severity, Status};
