//! Locating the user's startup script.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Script used when the user has none.
pub const DEFAULT_SCRIPT: &str = include_str!("default_config.lua");

const APP_DIR: &str = "glance";
const SCRIPT_FILE: &str = "init.lua";

/// Source text of a startup script and the name it is known by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    /// Path of the script, or `"<builtin>"`.
    pub name: String,
    /// Lua source.
    pub source: String,
    builtin: bool,
}

impl Script {
    /// The compiled-in default script.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            name: "<builtin>".to_string(),
            source: DEFAULT_SCRIPT.to_string(),
            builtin: true,
        }
    }

    /// A script given as source text, e.g. in tests.
    #[must_use]
    pub fn from_source(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            builtin: false,
        }
    }

    /// Reads a script from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read script {}: {e}", path.display()))
        })?;
        Ok(Self::from_source(path.display().to_string(), source))
    }

    /// Finds the script to run.
    ///
    /// An explicit path must exist. Otherwise the first existing file on
    /// [`Script::search_paths`] wins, falling back to the builtin script.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        for path in Self::search_paths() {
            if path.is_file() {
                debug!(path = %path.display(), "found script");
                return Self::from_file(&path);
            }
        }
        debug!("no script found, using builtin");
        Ok(Self::builtin())
    }

    /// Candidate script locations, in priority order.
    #[must_use]
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
            paths.push(PathBuf::from(dir).join(APP_DIR).join(SCRIPT_FILE));
        }
        if let Some(dir) = dirs::config_dir() {
            let path = dir.join(APP_DIR).join(SCRIPT_FILE);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    /// Returns true for the compiled-in default script.
    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// Chunk name handed to the interpreter, so error locations point at the file.
    #[must_use]
    pub fn chunk_name(&self) -> String {
        if self.builtin {
            format!("={}", self.name)
        } else {
            format!("@{}", self.name)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_chunk_name() {
        let script = Script::builtin();
        assert!(script.is_builtin());
        assert_eq!(script.chunk_name(), "=<builtin>");
        assert!(script.source.contains("key"));
    }

    #[test]
    fn test_file_chunk_name() {
        let script = Script::from_source("/home/u/.config/glance/init.lua", "");
        assert_eq!(script.chunk_name(), "@/home/u/.config/glance/init.lua");
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let result = Script::locate(Some(Path::new("/nonexistent/glance/init.lua")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_explicit_file_is_read() {
        let path = std::env::temp_dir().join(format!("glance-script-{}.lua", std::process::id()));
        std::fs::write(&path, "key.q = glance.quit").unwrap();

        let script = Script::locate(Some(&path)).unwrap();
        assert_eq!(script.source, "key.q = glance.quit");
        assert!(!script.is_builtin());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_search_paths_end_with_init_lua() {
        for path in Script::search_paths() {
            assert!(path.ends_with("glance/init.lua"));
        }
    }
}
