//! The interpreter bridge.
//!
//! [`Runtime`] owns the Lua state. It loads the user's script, routes key
//! presses to it, resolves callbacks and turns whatever the script returns
//! into [`Command`]s for the host.

use std::cell::RefCell;
use std::rc::Rc;

use mlua::{Function, IntoLuaMulti, Lua, MultiValue, Table, Value};
use tracing::{debug, info};

use super::callbacks::CallbackRegistry;
use super::capabilities;
use super::input::{InputPrompts, PendingInput};
use super::spawn::{SpawnOutcome, SpawnRequest, SpawnResult};
use super::{Command, Handle, HandleGenerator, Host, Script};
use crate::error::{Error, Result};

/// Levels of functions and tables unwrapped while materializing a command.
/// A command found this deep or deeper (or a cyclic table) yields nothing.
pub const MAX_UNWRAP_DEPTH: usize = 32;

pub(super) const NAMESPACE: &str = "glance";
pub(super) const NAMESPACE_ALIAS: &str = "event";
pub(super) const KEY_TABLE: &str = "key";
const STARTUP_HOOK: &str = "on_startup";

/// Outcome of routing a key press to the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDispatch {
    /// The script has no binding for the key.
    Unhandled,
    /// The script handled the key, producing these commands (possibly none).
    Handled(Vec<Command>),
}

/// State shared between the runtime and the capability closures.
#[derive(Debug)]
pub(super) struct BridgeState {
    pub input_handles: HandleGenerator,
    pub spawn_handles: HandleGenerator,
    /// Spawn requests queued by the script during the current dispatch.
    pub outbox: RefCell<Vec<SpawnRequest>>,
}

impl BridgeState {
    fn new() -> Self {
        Self {
            input_handles: HandleGenerator::new("glance.input_callback"),
            spawn_handles: HandleGenerator::new("glance.spawn_callback"),
            outbox: RefCell::new(Vec::new()),
        }
    }
}

/// A loaded script and its interpreter.
///
/// Not thread-safe: the runtime lives on the event loop thread.
pub struct Runtime {
    lua: Lua,
    host: Rc<dyn Host>,
    state: Rc<BridgeState>,
    prompts: RefCell<InputPrompts>,
}

impl Runtime {
    /// Creates an interpreter, installs the capabilities and runs `script`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScriptLoad`] if the script fails to compile or raises
    /// while running. The host cannot continue without a script.
    pub fn new(host: Rc<dyn Host>, script: &Script) -> Result<Self> {
        let lua = Lua::new();
        let state = Rc::new(BridgeState::new());
        capabilities::install(&lua, &host, &state)?;

        lua.load(script.source.as_str())
            .set_name(script.chunk_name())
            .exec()
            .map_err(|source| Error::ScriptLoad {
                chunk: script.name.clone(),
                source,
            })?;
        info!(script = %script.name, "script loaded");

        Ok(Self {
            lua,
            host,
            state,
            prompts: RefCell::new(InputPrompts::new()),
        })
    }

    /// Runs the script's `on_startup` hook, if it defines one.
    pub fn on_startup(&self) -> Vec<Command> {
        match self.lua.globals().get::<Value>(STARTUP_HOOK) {
            Ok(hook @ Value::Function(_)) => {
                debug!("running startup hook");
                let command = self.materialize(hook, 0);
                self.finish(command)
            }
            Ok(_) => self.finish(None),
            Err(e) => {
                self.host.report(&e.into());
                self.finish(None)
            }
        }
    }

    /// Routes a key press to the script's `key` table.
    pub fn on_key(&self, key: &str) -> KeyDispatch {
        let binding = match self.key_binding(key) {
            Ok(binding) => binding,
            Err(e) => {
                self.host.report(&e);
                return KeyDispatch::Unhandled;
            }
        };
        if binding.is_nil() {
            return KeyDispatch::Unhandled;
        }

        debug!(key, "key bound by script");
        let command = self.materialize(binding, 0);
        KeyDispatch::Handled(self.finish(command))
    }

    fn key_binding(&self, key: &str) -> Result<Value> {
        match self.lua.globals().get::<Value>(KEY_TABLE)? {
            Value::Table(keys) => Ok(keys.get::<Value>(key)?),
            Value::Nil => Ok(Value::Nil),
            other => Err(Error::Config(format!(
                "global `{KEY_TABLE}` must be a table, found {}",
                other.type_name()
            ))),
        }
    }

    /// Takes the callback under `handle` and calls it with `args`.
    ///
    /// Unknown or already resolved handles yield nothing. Errors raised by the
    /// callback are reported to the host and yield nothing.
    pub fn resolve(&self, handle: &Handle, args: impl IntoLuaMulti) -> Vec<Command> {
        match CallbackRegistry::new(&self.lua).take(handle) {
            Ok(Some(callback)) => self.invoke(&callback, args),
            Ok(None) => {
                debug!(%handle, "no callback registered");
                Vec::new()
            }
            Err(e) => {
                self.host.report(&e);
                Vec::new()
            }
        }
    }

    /// Resolves the callback of a finished spawn request.
    pub fn on_spawn_result(&self, result: &SpawnResult) -> Vec<Command> {
        let callback = match CallbackRegistry::new(&self.lua).take(&result.handle) {
            Ok(Some(callback)) => callback,
            Ok(None) => {
                debug!(handle = %result.handle, "spawn finished without callback");
                return Vec::new();
            }
            Err(e) => {
                self.host.report(&e);
                return Vec::new();
            }
        };

        match self.spawn_payload(result) {
            Ok(payload) => self.invoke(&callback, payload),
            Err(e) => {
                self.host.report(&e.into());
                Vec::new()
            }
        }
    }

    fn spawn_payload(&self, result: &SpawnResult) -> mlua::Result<Table> {
        let payload = self.lua.create_table()?;
        payload.set("argv", self.lua.create_sequence_from(result.argv.iter().cloned())?)?;
        payload.set("stdout", result.stdout.as_str())?;
        payload.set("stderr", result.stderr.as_str())?;
        payload.set("timeout", result.timed_out())?;
        if let SpawnOutcome::Completed { exit_code } = result.outcome {
            payload.set("exit_code", exit_code)?;
        }
        Ok(payload)
    }

    /// The prompt currently shown, if any.
    #[must_use]
    pub fn pending_input(&self) -> Option<PendingInput> {
        self.prompts.borrow().current().cloned()
    }

    /// Number of open prompts.
    #[must_use]
    pub fn pending_input_count(&self) -> usize {
        self.prompts.borrow().len()
    }

    /// Submits `text` to the top prompt and runs its callback.
    ///
    /// Does nothing if no prompt is open.
    pub fn submit_input(&self, text: &str) -> Vec<Command> {
        let Some(pending) = self.prompts.borrow_mut().pop() else {
            debug!("input submitted with no prompt open");
            return Vec::new();
        };
        debug!(prompt = %pending.prompt, "input submitted");
        self.resolve(&pending.handle, text.to_string())
    }

    /// Closes the top prompt without running its callback.
    pub fn cancel_input(&self) -> Option<PendingInput> {
        let pending = self.prompts.borrow_mut().pop()?;
        if let Err(e) = CallbackRegistry::new(&self.lua).discard(&pending.handle) {
            self.host.report(&e);
        }
        debug!(prompt = %pending.prompt, "input cancelled");
        Some(pending)
    }

    fn invoke(&self, callback: &Function, args: impl IntoLuaMulti) -> Vec<Command> {
        match callback.call::<MultiValue>(args) {
            Ok(values) => {
                let command = self.materialize_all(values, 0);
                self.finish(command)
            }
            Err(e) => {
                self.host.report(&Error::Script(e));
                self.finish(None)
            }
        }
    }

    /// Turns a script value into a command.
    ///
    /// Functions are called and their results unwrapped, tables become
    /// batches of whatever their elements yield, command objects are taken
    /// as-is. Anything else yields nothing.
    fn materialize(&self, value: Value, depth: usize) -> Option<Command> {
        if depth >= MAX_UNWRAP_DEPTH {
            self.host.report(&Error::Script(mlua::Error::runtime(format!(
                "command nested deeper than {MAX_UNWRAP_DEPTH} levels"
            ))));
            return None;
        }

        match value {
            Value::Function(function) => match function.call::<MultiValue>(()) {
                Ok(values) => self.materialize_all(values, depth + 1),
                Err(e) => {
                    self.host.report(&Error::Script(e));
                    None
                }
            },
            Value::UserData(data) => {
                let command = Command::clone(&*data.borrow::<Command>().ok()?);
                if let Command::OpenInput {
                    prompt,
                    placeholder,
                    handle,
                } = &command
                {
                    self.prompts.borrow_mut().open(PendingInput {
                        prompt: prompt.clone(),
                        placeholder: placeholder.clone(),
                        handle: handle.clone(),
                    });
                }
                Some(command)
            }
            Value::Table(items) => {
                let values: Vec<Value> = items
                    .sequence_values::<Value>()
                    .filter_map(std::result::Result::ok)
                    .collect();
                batch(values.into_iter().filter_map(|v| self.materialize(v, depth + 1)))
            }
            _ => None,
        }
    }

    fn materialize_all(&self, values: MultiValue, depth: usize) -> Option<Command> {
        batch(values.into_iter().filter_map(|v| self.materialize(v, depth)))
    }

    /// Prepends spawn requests queued by the script to its command.
    fn finish(&self, command: Option<Command>) -> Vec<Command> {
        let mut commands: Vec<Command> = self
            .state
            .outbox
            .borrow_mut()
            .drain(..)
            .map(Command::Spawn)
            .collect();
        commands.extend(command);
        commands
    }
}

/// Zero commands is nothing, one is itself, more is a batch.
fn batch(commands: impl Iterator<Item = Command>) -> Option<Command> {
    let mut commands: Vec<Command> = commands.collect();
    match commands.len() {
        0 => None,
        1 => commands.pop(),
        _ => Some(Command::Batch(commands)),
    }
}
