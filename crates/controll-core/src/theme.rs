// ── Theme definitions ──
//
// A theme is a named YAML fragment stored as `themes/<name>.yaml` and
// picked up by `frontend: themes: !include_dir_merge_named themes`.

use crate::error::CoreError;

/// File extension of theme files inside the themes directory.
pub const THEME_EXTENSION: &str = "yaml";

/// Name of the vendor theme installed at startup.
pub const DEFAULT_THEME_NAME: &str = "controll";

/// Light theme with the controll.it orange accent.
pub const DEFAULT_THEME_CONTENT: &str = r##"controll:
  # Primary orange from controll.it
  primary-color: "#f97316"
  accent-color: "#ea580c"

  # Header
  app-header-background-color: "#ffffff"
  app-header-text-color: "#1f2937"

  # Sidebar
  sidebar-background-color: "#f8fafc"
  sidebar-text-color: "#374151"
  sidebar-selected-background-color: "#f97316"
  sidebar-selected-icon-color: "#ffffff"
  sidebar-selected-text-color: "#ffffff"
  sidebar-icon-color: "#6b7280"

  # Cards
  card-background-color: "#ffffff"
  ha-card-background: "#ffffff"
  ha-card-border-radius: "8px"
  ha-card-box-shadow: "0 1px 3px rgba(0, 0, 0, 0.1)"

  # Text
  primary-text-color: "#1f2937"
  secondary-text-color: "#6b7280"
  text-primary-color: "#1f2937"

  # Background
  background-color: "#f3f4f6"
  primary-background-color: "#f3f4f6"
  secondary-background-color: "#ffffff"

  # UI elements
  divider-color: "#e5e7eb"
  state-icon-color: "#374151"
  state-on-color: "#f97316"
  state-off-color: "#9ca3af"

  # Switches
  switch-checked-color: "#f97316"
  switch-unchecked-button-color: "#9ca3af"
  switch-unchecked-track-color: "#d1d5db"

  # Material
  mdc-theme-primary: "#f97316"

  # Inputs
  input-fill-color: "#f9fafb"
  input-ink-color: "#1f2937"
  input-label-ink-color: "#6b7280"
"##;

/// A theme file to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeDefinition {
    name: String,
    content: String,
}

impl ThemeDefinition {
    /// Validate `name` and build a definition.
    ///
    /// The name becomes a file name, so it must be non-empty and free of
    /// path separators and `..`.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            content: content.into(),
        })
    }

    /// The vendor theme installed by startup reconciliation.
    pub fn vendor_default() -> Self {
        Self {
            name: DEFAULT_THEME_NAME.into(),
            content: DEFAULT_THEME_CONTENT.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// `<name>.yaml`
    pub fn file_name(&self) -> String {
        format!("{}.{THEME_EXTENSION}", self.name)
    }
}

fn validate_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::validation("theme name must not be empty"));
    }
    if name.contains(['/', '\\', '\0']) || name.contains("..") {
        return Err(CoreError::validation(format!(
            "theme name '{name}' must not contain path separators or '..'"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn file_name_appends_extension() {
        let theme = ThemeDefinition::new("controll", "x").unwrap();
        assert_eq!(theme.file_name(), "controll.yaml");
    }

    #[test]
    fn rejects_path_like_names() {
        for name in ["", "  ", "../secrets", "a/b", "a\\b", "x..y"] {
            assert!(
                matches!(ThemeDefinition::new(name, "x"), Err(CoreError::Validation { .. })),
                "accepted {name:?}"
            );
        }
    }

    #[test]
    fn vendor_default_is_keyed_by_its_name() {
        let theme = ThemeDefinition::vendor_default();
        assert!(theme.content().starts_with("controll:\n"));
        assert_eq!(theme.file_name(), "controll.yaml");
    }
}
