//! Domain models shared by the host and the script runtime.

mod message;
mod query;
mod thread;

pub use message::{Message, MessageFlags, MessageId};
pub use query::SearchQuery;
pub use thread::Thread;
