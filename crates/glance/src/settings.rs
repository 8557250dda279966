//! Host settings that persist across sessions.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

/// Settings read from `settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// notmuch executable to run.
    pub notmuch_binary: String,
    /// Maximum number of script-spawned programs running at once.
    pub max_concurrent_spawns: Option<usize>,
    /// Number of message rows rendered.
    pub list_rows: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notmuch_binary: "notmuch".to_string(),
            max_concurrent_spawns: None,
            list_rows: 20,
        }
    }
}

impl Settings {
    /// Default location: `<config dir>/glance/settings.json`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("glance")
            .join("settings.json")
    }

    /// Loads settings from `path`, or from [`Settings::default_path`].
    ///
    /// A missing default file yields the defaults. An explicit path must
    /// exist, and a malformed file is an error either way.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let settings_path = match path {
            Some(path) => {
                if !path.exists() {
                    bail!("settings file {} does not exist", path.display());
                }
                path.to_path_buf()
            }
            None => {
                let path = Self::default_path();
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let contents = tokio::fs::read_to_string(&settings_path)
            .await
            .with_context(|| format!("cannot read {}", settings_path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid settings in {}", settings_path.display()))
    }

    fn parse(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str(contents)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings = Settings::parse(r#"{ "max_concurrent_spawns": 2 }"#).unwrap();
        assert_eq!(settings.max_concurrent_spawns, Some(2));
        assert_eq!(settings.notmuch_binary, "notmuch");
        assert_eq!(settings.list_rows, 20);
    }

    #[test]
    fn test_malformed_settings() {
        assert!(Settings::parse("{ not json").is_err());
        assert!(Settings::parse(r#"{ "list_rows": "many" }"#).is_err());
    }

    #[tokio::test]
    async fn test_explicit_missing_file() {
        assert!(Settings::load(Some(Path::new("/nonexistent/settings.json"))).await.is_err());
    }

    #[tokio::test]
    async fn test_load_file() {
        let path = std::env::temp_dir().join(format!("glance-settings-{}.json", std::process::id()));
        tokio::fs::write(&path, r#"{ "notmuch_binary": "/opt/notmuch", "list_rows": 5 }"#)
            .await
            .unwrap();

        let settings = Settings::load(Some(&path)).await.unwrap();
        assert_eq!(settings.notmuch_binary, "/opt/notmuch");
        assert_eq!(settings.list_rows, 5);

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
