//! # glance-core
//!
//! Core logic for the `glance` mail triage tool.
//!
//! This crate provides:
//! - Domain models (messages, threads, saved queries)
//! - Host-side services (message list, queries, input history, status)
//! - A notmuch adapter built on the `notmuch` command line tool
//! - **Extension runtime** - Lua scripts bind keys, run commands and tag mail

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod model;
pub mod notmuch;
pub mod runtime;
pub mod service;

pub use error::{Error, Result};
pub use model::{Message, MessageFlags, MessageId, SearchQuery, Thread};
pub use notmuch::Notmuch;
pub use runtime::{Command, Host, KeyDispatch, Runtime, Script, SpawnExecutor, SpawnResult, Theme};
pub use service::{InputHistory, Messages, Notification, Queries, Severity, Status};
