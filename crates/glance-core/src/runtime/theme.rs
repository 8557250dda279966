//! Colors chosen by the script.

use mlua::{Lua, Table, Value};

/// Color palette used by the host to draw the message list.
///
/// Colors are terminal color names or numbers, kept as the script wrote them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Background color.
    pub background: String,
    /// Color for de-emphasized text (dates, counters).
    pub muted: String,
    /// Regular text color.
    pub foreground: String,
    /// Color of the selected row.
    pub highlight: String,
    /// Primary accent.
    pub accent: String,
    /// Secondary accent.
    pub secondary: String,
    /// Tertiary accent.
    pub tertiary: String,
    /// Bright primary accent.
    pub accent_bright: String,
    /// Bright secondary accent.
    pub secondary_bright: String,
    /// Bright tertiary accent.
    pub tertiary_bright: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: "0".to_string(),
            muted: "8".to_string(),
            foreground: "7".to_string(),
            highlight: "15".to_string(),
            accent: "3".to_string(),
            secondary: "4".to_string(),
            tertiary: "6".to_string(),
            accent_bright: "11".to_string(),
            secondary_bright: "12".to_string(),
            tertiary_bright: "14".to_string(),
        }
    }
}

impl Theme {
    /// Builds a theme from a script table. Missing fields keep their default;
    /// numbers are accepted as well as strings.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the table fails (e.g. a raising `__index`).
    pub fn from_table(lua: &Lua, fields: &Table) -> mlua::Result<Self> {
        let defaults = Self::default();
        let color = |name: &str, default: String| -> mlua::Result<String> {
            let value: Value = fields.get(name)?;
            Ok(lua
                .coerce_string(value)?
                .map_or(default, |s| s.to_string_lossy()))
        };

        Ok(Self {
            background: color("background", defaults.background)?,
            muted: color("muted", defaults.muted)?,
            foreground: color("foreground", defaults.foreground)?,
            highlight: color("highlight", defaults.highlight)?,
            accent: color("accent", defaults.accent)?,
            secondary: color("secondary", defaults.secondary)?,
            tertiary: color("tertiary", defaults.tertiary)?,
            accent_bright: color("accent_bright", defaults.accent_bright)?,
            secondary_bright: color("secondary_bright", defaults.secondary_bright)?,
            tertiary_bright: color("tertiary_bright", defaults.tertiary_bright)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_table_overrides_and_defaults() {
        let lua = Lua::new();
        let fields: Table = lua
            .load(r#"return { accent = "208", highlight = 231, unknown = "x" }"#)
            .eval()
            .unwrap();

        let theme = Theme::from_table(&lua, &fields).unwrap();
        assert_eq!(theme.accent, "208");
        assert_eq!(theme.highlight, "231");
        assert_eq!(theme.muted, "8");
        assert_eq!(theme.tertiary_bright, "14");
    }

    #[test]
    fn test_non_color_values_fall_back() {
        let lua = Lua::new();
        let fields: Table = lua.load("return { muted = true }").eval().unwrap();
        assert_eq!(Theme::from_table(&lua, &fields).unwrap().muted, "8");
    }
}
