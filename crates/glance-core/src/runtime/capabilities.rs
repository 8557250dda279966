//! The `glance` table: everything a script may ask of the host.

use std::rc::Rc;

use mlua::{Function, Lua, Table, Value, Variadic};
use tracing::debug;

use super::bridge::{BridgeState, KEY_TABLE, NAMESPACE, NAMESPACE_ALIAS};
use super::callbacks::CallbackRegistry;
use super::spawn::SpawnRequest;
use super::{Command, Host, MessageHandle, Theme};
use crate::error::{Error, Result};
use crate::model::{Message, MessageId};

/// Installs the capability namespace and an empty key table into `lua`.
pub(super) fn install(lua: &Lua, host: &Rc<dyn Host>, state: &Rc<BridgeState>) -> mlua::Result<()> {
    let globals = lua.globals();
    globals.set(KEY_TABLE, lua.create_table()?)?;

    let glance = lua.create_table()?;
    glance.set("quit", command_fn(lua, Command::Quit)?)?;
    glance.set("refresh", command_fn(lua, Command::Refresh)?)?;
    glance.set("tag", tag_fn(lua, host)?)?;
    glance.set("input", input_fn(lua, host, state)?)?;
    glance.set("spawn", spawn_fn(lua, host, state)?)?;
    glance.set("set_theme", set_theme_fn(lua, host)?)?;
    glance.set("status", status_table(lua, host)?)?;
    glance.set("messages", messages_table(lua, host)?)?;
    glance.set("query", query_table(lua, host)?)?;
    glance.set("marks", marks_table(lua)?)?;
    glance.set("log", log_table(lua, host)?)?;

    globals.set(NAMESPACE, glance.clone())?;
    globals.set(NAMESPACE_ALIAS, glance)?;
    Ok(())
}

/// Reports a rejected capability call to the host. The call returns nil.
fn reject(host: &dyn Host, capability: &str, error: &Error) {
    debug!(capability, "capability call rejected");
    host.report(error);
}

fn command_fn(lua: &Lua, command: Command) -> mlua::Result<Function> {
    lua.create_function(move |_, ()| Ok(command.clone()))
}

/// Converts any value to text the way `tostring` does.
fn display(lua: &Lua, value: Value) -> String {
    if let Value::String(s) = &value {
        return s.to_string_lossy();
    }
    lua.globals()
        .get::<Function>("tostring")
        .and_then(|tostring| tostring.call::<String>(value))
        .unwrap_or_else(|e| format!("<{e}>"))
}

fn status_table(lua: &Lua, host: &Rc<dyn Host>) -> mlua::Result<Table> {
    let status = lua.create_table()?;
    status.set(
        "set",
        lua.create_function(|lua, message: Value| {
            let text = if message.is_nil() {
                String::new()
            } else {
                display(lua, message)
            };
            Ok(Command::SetStatus(text))
        })?,
    )?;

    let host = Rc::clone(host);
    status.set("get", lua.create_function(move |_, ()| Ok(host.status()))?)?;
    Ok(status)
}

fn handles(lua: &Lua, messages: Vec<Message>) -> mlua::Result<Table> {
    lua.create_sequence_from(messages.into_iter().map(MessageHandle::from))
}

fn messages_table(lua: &Lua, host: &Rc<dyn Host>) -> mlua::Result<Table> {
    let messages = lua.create_table()?;

    let h = Rc::clone(host);
    messages.set("all", lua.create_function(move |lua, ()| handles(lua, h.all_messages()))?)?;

    let h = Rc::clone(host);
    messages.set(
        "marked",
        lua.create_function(move |lua, ()| handles(lua, h.marked_messages()))?,
    )?;

    let h = Rc::clone(host);
    messages.set(
        "selected",
        lua.create_function(move |_, ()| Ok(h.selected_message().map(MessageHandle::from)))?,
    )?;
    Ok(messages)
}

fn query_table(lua: &Lua, host: &Rc<dyn Host>) -> mlua::Result<Table> {
    let query = lua.create_table()?;
    let host = Rc::clone(host);
    query.set(
        "new",
        lua.create_function(move |_, text: Value| match text {
            Value::String(text) => Ok(Some(Command::NewQuery(text.to_string_lossy()))),
            other => {
                let error = Error::InvalidArguments(format!(
                    "query.new expects a string, got {}",
                    other.type_name()
                ));
                reject(host.as_ref(), "query.new", &error);
                Ok(None)
            }
        })?,
    )?;
    query.set("next", command_fn(lua, Command::NextQuery)?)?;
    query.set("prev", command_fn(lua, Command::PreviousQuery)?)?;
    Ok(query)
}

fn marks_table(lua: &Lua) -> mlua::Result<Table> {
    let marks = lua.create_table()?;
    marks.set("toggle", command_fn(lua, Command::ToggleMarks)?)?;
    marks.set("invert", command_fn(lua, Command::InvertMarks)?)?;
    marks.set("clear", command_fn(lua, Command::ClearMarks)?)?;
    Ok(marks)
}

/// `glance.log.<level>(message)`. Any field name is a level.
fn log_table(lua: &Lua, host: &Rc<dyn Host>) -> mlua::Result<Table> {
    let log = lua.create_table()?;
    let meta = lua.create_table()?;
    let host = Rc::clone(host);

    meta.set(
        "__index",
        lua.create_function(move |lua, (_, level): (Value, Value)| {
            let Value::String(level) = level else {
                let error = Error::InvalidArguments("log level must be a name".to_string());
                reject(host.as_ref(), "log", &error);
                return Ok(None);
            };
            let level = level.to_string_lossy().to_uppercase();
            let host = Rc::clone(&host);
            lua.create_function(move |lua, message: Value| {
                host.log(&level, &display(lua, message));
                Ok(())
            })
            .map(Some)
        })?,
    )?;
    log.set_metatable(Some(meta));
    Ok(log)
}

fn message_id(value: &Value) -> Option<MessageId> {
    let Value::UserData(data) = value else {
        return None;
    };
    data.borrow::<MessageHandle>().ok().map(|m| m.id().clone())
}

fn tag_fn(lua: &Lua, host: &Rc<dyn Host>) -> mlua::Result<Function> {
    let host = Rc::clone(host);
    lua.create_function(move |lua, (target, tags): (Value, Variadic<Value>)| {
        if let Err(error) = tag(lua, host.as_ref(), &target, &tags) {
            reject(host.as_ref(), "tag", &error);
        }
        Ok(())
    })
}

fn tag(lua: &Lua, host: &dyn Host, target: &Value, tags: &[Value]) -> Result<()> {
    let ids: Vec<MessageId> = match target {
        Value::UserData(_) => message_id(target).into_iter().collect(),
        Value::Table(list) => list
            .sequence_values::<Value>()
            .filter_map(std::result::Result::ok)
            .filter_map(|value| message_id(&value))
            .collect(),
        other => {
            return Err(Error::InvalidArguments(format!(
                "tag expects a message or a list of messages, got {}",
                other.type_name()
            )));
        }
    };
    if ids.is_empty() {
        return Err(Error::InvalidArguments("tag: no messages given".to_string()));
    }

    let mut operations = Vec::with_capacity(tags.len());
    for value in tags {
        if let Some(tag) = lua.coerce_string(value.clone())? {
            operations.push(tag.to_string_lossy());
        }
    }
    if operations.is_empty() {
        return Err(Error::InvalidArguments("tag: no tags given".to_string()));
    }

    host.tag(&ids, &operations)
}

fn input_fn(lua: &Lua, host: &Rc<dyn Host>, state: &Rc<BridgeState>) -> mlua::Result<Function> {
    let host = Rc::clone(host);
    let state = Rc::clone(state);
    lua.create_function(move |lua, options: Value| {
        Ok(input(lua, &state, options)
            .map_err(|error| reject(host.as_ref(), "input", &error))
            .ok())
    })
}

fn input(lua: &Lua, state: &BridgeState, options: Value) -> Result<Command> {
    let Value::Table(options) = options else {
        return Err(Error::InvalidArguments(format!(
            "input expects an options table, got {}",
            options.type_name()
        )));
    };
    let prompt = optional_string(&options, "prompt")?;
    let placeholder = optional_string(&options, "placeholder")?;
    let callback: Value = options.get("with_input")?;
    if !matches!(callback, Value::Function(_) | Value::Nil) {
        return Err(Error::InvalidArguments(format!(
            "input: with_input must be a function or nil, got {}",
            callback.type_name()
        )));
    }

    let handle = state.input_handles.next();
    CallbackRegistry::new(lua).register(&handle, callback)?;
    Ok(Command::OpenInput {
        prompt: prompt.unwrap_or_default(),
        placeholder: placeholder.unwrap_or_default(),
        handle,
    })
}

fn optional_string(options: &Table, field: &str) -> Result<Option<String>> {
    match options.get::<Value>(field)? {
        Value::Nil => Ok(None),
        Value::String(s) => Ok(Some(s.to_string_lossy())),
        other => Err(Error::InvalidArguments(format!(
            "{field} must be a string or nil, got {}",
            other.type_name()
        ))),
    }
}

fn spawn_fn(lua: &Lua, host: &Rc<dyn Host>, state: &Rc<BridgeState>) -> mlua::Result<Function> {
    let host = Rc::clone(host);
    let state = Rc::clone(state);
    lua.create_function(move |lua, options: Value| {
        match spawn(lua, host.as_ref(), &state, options) {
            Ok(request) => state.outbox.borrow_mut().push(request),
            Err(error) => reject(host.as_ref(), "spawn", &error),
        }
        Ok(())
    })
}

fn spawn(lua: &Lua, host: &dyn Host, state: &BridgeState, options: Value) -> Result<SpawnRequest> {
    let Value::Table(options) = options else {
        return Err(Error::InvalidArguments(format!(
            "spawn expects an options table, got {}",
            options.type_name()
        )));
    };
    let argv_table = match options.get::<Value>("argv")? {
        Value::Table(argv) => argv,
        Value::Nil => options.clone(),
        other => {
            return Err(Error::InvalidArguments(format!(
                "spawn: argv must be a list of strings, got {}",
                other.type_name()
            )));
        }
    };

    let mut argv = Vec::new();
    for value in argv_table.sequence_values::<Value>() {
        match value? {
            Value::String(arg) => argv.push(arg.to_string_lossy()),
            other => {
                return Err(Error::InvalidArguments(format!(
                    "spawn: all command arguments must be strings, got {}",
                    other.type_name()
                )));
            }
        }
    }
    if argv.is_empty() {
        return Err(Error::InvalidArguments(
            "spawn requires at least one command argument".to_string(),
        ));
    }

    let timeout_millis = match options.get::<Value>("timeout")? {
        Value::Nil => None,
        Value::Integer(seconds) => u64::try_from(seconds)
            .ok()
            .filter(|&s| s > 0)
            .map(|s| s.saturating_mul(1000)),
        Value::Number(seconds) => seconds_to_millis(seconds),
        other => {
            return Err(Error::InvalidArguments(format!(
                "spawn: timeout must be a number of seconds, got {}",
                other.type_name()
            )));
        }
    };

    let handle = state.spawn_handles.next();
    if let Err(error) = CallbackRegistry::new(lua).register(&handle, options.get("next")?) {
        reject(host, "spawn", &error);
    }

    Ok(SpawnRequest {
        argv,
        timeout_millis,
        handle,
    })
}

/// Whole milliseconds for a timeout in seconds; non-positive means none.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn seconds_to_millis(seconds: f64) -> Option<u64> {
    if seconds.is_finite() && seconds > 0.0 {
        Some(((seconds * 1000.0).round() as u64).max(1))
    } else {
        None
    }
}

fn set_theme_fn(lua: &Lua, host: &Rc<dyn Host>) -> mlua::Result<Function> {
    let host = Rc::clone(host);
    lua.create_function(move |lua, fields: Value| {
        let theme = match &fields {
            Value::Table(fields) => Theme::from_table(lua, fields).map_err(Error::from),
            other => Err(Error::InvalidArguments(format!(
                "set_theme expects a table, got {}",
                other.type_name()
            ))),
        };
        match theme {
            Ok(theme) => host.set_theme(theme),
            Err(error) => reject(host.as_ref(), "set_theme", &error),
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_millis() {
        assert_eq!(seconds_to_millis(0.01), Some(10));
        assert_eq!(seconds_to_millis(2.5), Some(2500));
        assert_eq!(seconds_to_millis(0.000_1), Some(1));
        assert_eq!(seconds_to_millis(0.0), None);
        assert_eq!(seconds_to_millis(-1.0), None);
        assert_eq!(seconds_to_millis(f64::NAN), None);
    }
}
