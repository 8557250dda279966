//! Script closures parked in the interpreter's registry until resolved.

use mlua::{Function, Lua, Value};
use tracing::debug;

use super::Handle;
use crate::error::{Error, Result};

/// View of the callbacks stored in an interpreter's named registry.
///
/// Closures live inside the interpreter itself, so the collector sees them as
/// reachable until they are taken. An entry is removed before its closure
/// runs, which makes every handle single-use.
#[derive(Debug, Clone, Copy)]
pub struct CallbackRegistry<'lua> {
    lua: &'lua Lua,
}

impl<'lua> CallbackRegistry<'lua> {
    /// Creates a view over `lua`'s registry.
    #[must_use]
    pub const fn new(lua: &'lua Lua) -> Self {
        Self { lua }
    }

    /// Stores `callback` under `handle`.
    ///
    /// `nil` means "no callback" and stores nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidClosure`] if `callback` is neither a function
    /// nor `nil`, or a script error if the registry cannot be written.
    pub fn register(&self, handle: &Handle, callback: Value) -> Result<()> {
        match callback {
            Value::Nil => Ok(()),
            Value::Function(function) => {
                self.lua.set_named_registry_value(handle.as_str(), function)?;
                debug!(%handle, "callback registered");
                Ok(())
            }
            _ => Err(Error::InvalidClosure {
                handle: handle.clone(),
            }),
        }
    }

    /// Removes the callback under `handle` and returns it.
    ///
    /// Returns `None` if nothing is registered, including handles that were
    /// already taken.
    ///
    /// # Errors
    ///
    /// Returns a script error if the registry cannot be accessed.
    pub fn take(&self, handle: &Handle) -> Result<Option<Function>> {
        let value: Value = self.lua.named_registry_value(handle.as_str())?;
        let Value::Function(function) = value else {
            return Ok(None);
        };
        self.lua.unset_named_registry_value(handle.as_str())?;
        Ok(Some(function))
    }

    /// Drops the callback under `handle` without calling it.
    ///
    /// # Errors
    ///
    /// Returns a script error if the registry cannot be accessed.
    pub fn discard(&self, handle: &Handle) -> Result<()> {
        self.lua.unset_named_registry_value(handle.as_str())?;
        Ok(())
    }

    /// Returns true if a callback is registered under `handle`.
    #[must_use]
    pub fn contains(&self, handle: &Handle) -> bool {
        matches!(
            self.lua.named_registry_value::<Value>(handle.as_str()),
            Ok(Value::Function(_))
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::runtime::HandleGenerator;

    #[test]
    fn test_register_and_take_once() {
        let lua = Lua::new();
        let handles = HandleGenerator::new("test");
        let handle = handles.next();
        let registry = CallbackRegistry::new(&lua);

        let function: Function = lua.load("return function(x) return x * 2 end").eval().unwrap();
        registry.register(&handle, Value::Function(function)).unwrap();
        assert!(registry.contains(&handle));

        let taken = registry.take(&handle).unwrap().unwrap();
        assert_eq!(taken.call::<i64>(21).unwrap(), 42);
        assert!(!registry.contains(&handle));
        assert!(registry.take(&handle).unwrap().is_none());
    }

    #[test]
    fn test_nil_registers_nothing() {
        let lua = Lua::new();
        let handle = HandleGenerator::new("test").next();
        let registry = CallbackRegistry::new(&lua);

        registry.register(&handle, Value::Nil).unwrap();
        assert!(!registry.contains(&handle));
    }

    #[test]
    fn test_non_function_is_rejected() {
        let lua = Lua::new();
        let handle = HandleGenerator::new("test").next();
        let registry = CallbackRegistry::new(&lua);

        let result = registry.register(&handle, Value::Integer(3));
        assert!(matches!(result, Err(Error::InvalidClosure { .. })));
        assert!(!registry.contains(&handle));
    }

    #[test]
    fn test_discard() {
        let lua = Lua::new();
        let handle = HandleGenerator::new("test").next();
        let registry = CallbackRegistry::new(&lua);

        let function: Function = lua.load("return function() end").eval().unwrap();
        registry.register(&handle, Value::Function(function)).unwrap();
        registry.discard(&handle).unwrap();
        assert!(!registry.contains(&handle));
    }
}
