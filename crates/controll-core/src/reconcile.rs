// ── Configuration reconciliation ──
//
// Idempotent "ensure present" steps over a `ConfigDocument`. Each step
// looks for its marker first and only mutates when the marker is absent,
// so running a step twice yields the same text as running it once.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use crate::document::{ConfigDocument, SectionInsert};
use crate::error::CoreError;
use crate::store::{ConfigStore, write_atomic};
use crate::theme::ThemeDefinition;

/// Top-level section carrying the hub's display name.
pub const BRANDING_SECTION: &str = "homeassistant";
/// Key of the display name inside [`BRANDING_SECTION`].
pub const BRANDING_KEY: &str = "name";
/// Top-level section that owns the theme registry.
pub const FRONTEND_SECTION: &str = "frontend";
/// Marker key of the theme registry directive.
pub const THEMES_KEY: &str = "themes";
/// Directive loading every file in `themes/` as a named theme.
pub const THEME_REGISTRY_ENTRY: &str = "themes: !include_dir_merge_named themes";
/// Display name installed at startup.
pub const DEFAULT_BRAND_NAME: &str = "Controll";

/// What a reconciliation step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The directive was added.
    Changed,
    /// The marker was already present; nothing was written.
    AlreadyConfigured,
    /// The directive is missing but the document's shape prevents a
    /// safe append; an operator has to edit it by hand.
    ManualUpdateRequired,
}

impl Outcome {
    pub fn is_changed(self) -> bool {
        self == Self::Changed
    }
}

/// Ensure a `homeassistant:` section with a display name exists.
///
/// Ensure-present only: an existing section is never rewritten, even if
/// it carries a different name.
pub fn ensure_branding(doc: &mut ConfigDocument, name: &str) -> Result<Outcome, CoreError> {
    if doc.has_key(BRANDING_SECTION) {
        if !doc.has_child_value(BRANDING_SECTION, BRANDING_KEY, name) {
            warn!(
                name,
                "homeassistant: section exists with another name, manual update needed"
            );
        }
        debug!("branding already configured");
        return Ok(Outcome::AlreadyConfigured);
    }

    doc.append_block(&branding_block(name)?);
    info!(name, "added branding section");
    Ok(Outcome::Changed)
}

/// `homeassistant:\n  name: <name>\n`, quoted wherever YAML needs it.
fn branding_block(name: &str) -> Result<String, CoreError> {
    let mut section = Mapping::new();
    section.insert(BRANDING_KEY.into(), name.into());
    let mut root = Mapping::new();
    root.insert(BRANDING_SECTION.into(), Value::Mapping(section));

    serde_yaml::to_string(&root)
        .map_err(|e| CoreError::validation(format!("Display name cannot be written as YAML: {e}")))
}

/// Ensure the theme registry directive exists under `frontend:`.
pub fn ensure_theme_registry(doc: &mut ConfigDocument) -> Outcome {
    if doc.has_key(THEMES_KEY) {
        debug!("theme registry already configured");
        return Outcome::AlreadyConfigured;
    }

    match doc.insert_under_section(FRONTEND_SECTION, THEME_REGISTRY_ENTRY) {
        SectionInsert::Inserted => {
            info!("added theme registry to existing frontend section");
            Outcome::Changed
        }
        SectionInsert::Missing => {
            doc.append_block(&format!("{FRONTEND_SECTION}:\n  {THEME_REGISTRY_ENTRY}\n"));
            info!("added frontend section with theme registry");
            Outcome::Changed
        }
        SectionInsert::InlineValue => {
            warn!("frontend: section has an inline value, add the theme registry manually");
            Outcome::ManualUpdateRequired
        }
    }
}

/// Write `theme` to `<themes_dir>/<name>.yaml`, replacing any previous
/// file of that name. Creates `themes_dir` if needed.
///
/// Takes no lock; [`ConfigStore::install_theme`] is the locked entry point.
pub async fn install_theme(themes_dir: &Path, theme: &ThemeDefinition) -> Result<PathBuf, CoreError> {
    tokio::fs::create_dir_all(themes_dir)
        .await
        .map_err(|e| CoreError::persistence("create", themes_dir, e))?;

    let path = themes_dir.join(theme.file_name());
    write_atomic(&path, theme.content())
        .await
        .map_err(|e| CoreError::persistence("write", &path, e))?;

    info!(theme = theme.name(), "installed theme");
    Ok(path)
}

/// Summary of [`run_startup_reconciliation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupReport {
    pub theme_path: PathBuf,
    pub branding: Outcome,
    pub theme_registry: Outcome,
    /// Whether `configuration.yaml` was rewritten.
    pub persisted: bool,
}

/// Install the vendor theme, then ensure branding and the theme registry
/// in a single locked read-modify-write of the configuration document.
pub async fn run_startup_reconciliation(
    store: &ConfigStore,
    theme: &ThemeDefinition,
    brand_name: &str,
) -> Result<StartupReport, CoreError> {
    info!(brand = brand_name, "running startup reconciliation");

    let theme_path = store.install_theme(theme).await?;

    let update = store
        .update_document(|doc| {
            let branding = ensure_branding(doc, brand_name)?;
            let theme_registry = ensure_theme_registry(doc);
            Ok::<_, CoreError>((branding, theme_registry))
        })
        .await?;
    let (branding, theme_registry) = update.result?;

    if update.persisted {
        info!("configuration updated, restart Home Assistant to apply");
    }

    Ok(StartupReport {
        theme_path,
        branding,
        theme_registry,
        persisted: update.persisted,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLES: &[&str] = &[
        "",
        "default_config:\n",
        "default_config:",
        "# Loads default set of integrations\ndefault_config:\n\nfrontend:\n  extra_module_url: []\n",
        "homeassistant:\n  name: Home\n  unit_system: metric\n",
        "automation: !include automations.yaml\nscript: !include scripts.yaml\n",
        "frontend:\r\n  javascript_version: latest\r\n",
        "sensor:\n  - platform: template\n    sensors:\n      x:\n        value_template: '{{ 1 }}'",
    ];

    fn apply_branding(text: &str, name: &str) -> ConfigDocument {
        let mut doc = ConfigDocument::new(text);
        ensure_branding(&mut doc, name).unwrap();
        doc
    }

    fn apply_registry(text: &str) -> ConfigDocument {
        let mut doc = ConfigDocument::new(text);
        ensure_theme_registry(&mut doc);
        doc
    }

    #[test]
    fn branding_is_idempotent() {
        for sample in SAMPLES {
            let once = apply_branding(sample, "Acme");
            let twice = apply_branding(once.as_str(), "Acme");
            assert_eq!(once, twice, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn branding_only_appends() {
        for sample in SAMPLES {
            let out = apply_branding(sample, "Acme");
            assert!(
                out.as_str().starts_with(sample),
                "existing bytes not preserved for {sample:?}"
            );
        }
    }

    #[test]
    fn branding_appends_section_after_blank_line() {
        let mut doc = ConfigDocument::new("default_config:\n");
        assert_eq!(ensure_branding(&mut doc, "Acme").unwrap(), Outcome::Changed);
        assert_eq!(
            doc.as_str(),
            "default_config:\n\nhomeassistant:\n  name: Acme\n"
        );
    }

    #[test]
    fn branding_existing_section_is_left_alone() {
        let mut doc = ConfigDocument::new("homeassistant:\n  name: Home\n");
        assert_eq!(ensure_branding(&mut doc, "Acme").unwrap(), Outcome::AlreadyConfigured);
        assert_eq!(doc.as_str(), "homeassistant:\n  name: Home\n");
    }

    #[test]
    fn branding_commented_section_does_not_count() {
        let mut doc = ConfigDocument::new("# homeassistant:\n#   name: Old\n");
        assert_eq!(ensure_branding(&mut doc, "Acme").unwrap(), Outcome::Changed);
        assert!(doc.has_section(BRANDING_SECTION));
    }

    #[test]
    fn branding_name_in_another_section_does_not_count() {
        let text = "sensor:\n  - platform: template\n    name: Acme\n";
        let mut doc = ConfigDocument::new(text);
        assert_eq!(ensure_branding(&mut doc, "Acme").unwrap(), Outcome::Changed);
        assert!(doc.has_child_value(BRANDING_SECTION, BRANDING_KEY, "Acme"));
    }

    #[test]
    fn branding_with_bom_keeps_single_section() {
        let text = "\u{feff}homeassistant:\n  name: Home\n  unit_system: metric\nfrontend:\n  extra_module_url: []\n";
        let mut doc = ConfigDocument::new(text);
        assert_eq!(ensure_branding(&mut doc, "Acme").unwrap(), Outcome::AlreadyConfigured);
        assert_eq!(doc.as_str(), text);
    }

    #[test]
    fn branding_names_read_back_as_strings() {
        for name in ["Acme", "Home: Main", "#1 \"Hub\"", "yes", "2024", "0x1F", "0o17", ".inf", "~", "- hub", "two\nlines"] {
            let mut doc = ConfigDocument::default();
            ensure_branding(&mut doc, name).unwrap();

            let parsed: serde_yaml::Value = serde_yaml::from_str(doc.as_str()).unwrap();
            assert_eq!(
                parsed["homeassistant"]["name"].as_str(),
                Some(name),
                "name {name:?} rendered as {:?}",
                doc.as_str()
            );
        }
    }

    #[test]
    fn theme_registry_is_idempotent() {
        for sample in SAMPLES {
            let once = apply_registry(sample);
            let twice = apply_registry(once.as_str());
            assert_eq!(once, twice, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn theme_registry_inserts_into_existing_frontend() {
        let mut doc = ConfigDocument::new("default_config:\n\nfrontend:\n  extra_module_url: []\n");
        assert_eq!(ensure_theme_registry(&mut doc), Outcome::Changed);
        assert_eq!(
            doc.as_str(),
            "default_config:\n\nfrontend:\n  themes: !include_dir_merge_named themes\n  extra_module_url: []\n"
        );
    }

    #[test]
    fn theme_registry_appends_frontend_when_missing() {
        let mut doc = ConfigDocument::new("default_config:\n");
        assert_eq!(ensure_theme_registry(&mut doc), Outcome::Changed);
        assert_eq!(
            doc.as_str(),
            "default_config:\n\nfrontend:\n  themes: !include_dir_merge_named themes\n"
        );
    }

    #[test]
    fn theme_registry_recognises_existing_marker() {
        let text = "frontend:\n  themes: !include_dir_merge_named custom_themes\n";
        let mut doc = ConfigDocument::new(text);
        assert_eq!(ensure_theme_registry(&mut doc), Outcome::AlreadyConfigured);
        assert_eq!(doc.as_str(), text);
    }

    #[test]
    fn theme_registry_leaves_inline_frontend_untouched() {
        let text = "frontend: !include frontend.yaml\n";
        let mut doc = ConfigDocument::new(text);
        assert_eq!(ensure_theme_registry(&mut doc), Outcome::ManualUpdateRequired);
        assert_eq!(doc.as_str(), text);
    }

    #[test]
    fn theme_registry_with_bom_extends_existing_frontend() {
        let mut doc = ConfigDocument::new("\u{feff}frontend:\n  extra_module_url: []\n");
        assert_eq!(ensure_theme_registry(&mut doc), Outcome::Changed);
        assert_eq!(
            doc.as_str(),
            "\u{feff}frontend:\n  themes: !include_dir_merge_named themes\n  extra_module_url: []\n"
        );
    }

    #[test]
    fn steps_commute_on_empty_document() {
        let mut a = ConfigDocument::default();
        ensure_branding(&mut a, DEFAULT_BRAND_NAME).unwrap();
        ensure_theme_registry(&mut a);

        let mut b = ConfigDocument::default();
        ensure_theme_registry(&mut b);
        ensure_branding(&mut b, DEFAULT_BRAND_NAME).unwrap();

        for doc in [&a, &b] {
            assert!(doc.has_section(BRANDING_SECTION));
            assert!(doc.has_child_value(BRANDING_SECTION, BRANDING_KEY, DEFAULT_BRAND_NAME));
            assert!(doc.has_key(THEMES_KEY));
        }
    }
}
