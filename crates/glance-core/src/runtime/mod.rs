//! The extension runtime.
//!
//! A Lua script decides what keys do. The host forwards key presses, prompt
//! submissions and finished processes to the [`Runtime`], which runs the
//! script and hands back [`Command`]s for the host to execute.
//!
//! # Example
//!
//! ```no_run
//! use std::rc::Rc;
//!
//! use glance_core::runtime::{Command, KeyDispatch, MemoryHost, Runtime, Script};
//!
//! let host = Rc::new(MemoryHost::new());
//! let script = Script::from_source("init.lua", "key.q = glance.quit");
//! let runtime = Runtime::new(host, &script)?;
//!
//! assert_eq!(runtime.on_key("q"), KeyDispatch::Handled(vec![Command::Quit]));
//! # Ok::<(), glance_core::Error>(())
//! ```

mod bridge;
mod callbacks;
mod capabilities;
mod command;
mod handle;
mod host;
mod input;
mod message_handle;
mod script;
mod spawn;
mod theme;

pub use bridge::{KeyDispatch, MAX_UNWRAP_DEPTH, Runtime};
pub use callbacks::CallbackRegistry;
pub use command::Command;
pub use handle::{Handle, HandleGenerator};
pub use host::{Host, MemoryHost, SCRIPT_LOG_TARGET, TagCall, log_script_message};
pub use input::{InputPrompts, PendingInput};
pub use message_handle::MessageHandle;
pub use script::{DEFAULT_SCRIPT, Script};
pub use spawn::{FAILED_EXIT_CODE, SpawnExecutor, SpawnOutcome, SpawnRequest, SpawnResult, run};
pub use theme::Theme;
