//! Callback handles.
//!
//! Handles name script closures stashed for later invocation. Each call site
//! mints its own handles from a dedicated generator, so input and spawn
//! handles never collide.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque, single-use token identifying a pending callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(String);

impl Handle {
    /// Returns the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle generator for one category of callbacks.
///
/// Generates sequential handles in the format `"<prefix>_1"`, `"<prefix>_2"`, etc.
#[derive(Debug)]
pub struct HandleGenerator {
    counter: AtomicU64,
    prefix: &'static str,
}

impl HandleGenerator {
    /// Creates a new generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: &'static str) -> Self {
        Self {
            counter: AtomicU64::new(0),
            prefix,
        }
    }

    /// Generates the next handle.
    #[must_use]
    pub fn next(&self) -> Handle {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Handle(format!("{}_{n}", self.prefix))
    }

    /// Returns the number of handles generated so far.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_generation() {
        let generator = HandleGenerator::new("glance.input_callback");
        assert_eq!(generator.next().as_str(), "glance.input_callback_1");
        assert_eq!(generator.next().as_str(), "glance.input_callback_2");
        assert_eq!(generator.current(), 2);
    }

    #[test]
    fn test_generators_do_not_collide() {
        let input = HandleGenerator::new("glance.input_callback");
        let spawn = HandleGenerator::new("glance.spawn_callback");
        assert_ne!(input.next(), spawn.next());
    }

    #[test]
    fn test_uniqueness() {
        let generator = HandleGenerator::new("h");
        let mut seen = std::collections::HashSet::new();

        for _ in 0..10000 {
            let handle = generator.next();
            assert!(seen.insert(handle), "duplicate handle generated");
        }
    }
}
