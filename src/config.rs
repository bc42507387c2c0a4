use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{InvoiceError, Result};
use crate::export::ExportOptions;
use crate::identity::NumberPattern;
use crate::model::{ContactInfo, Currency, Template};

const CONTRACTOR_FILE: &str = "contractor.toml";
const DEFAULT_CONTRACTOR_TEMPLATE: &str = include_str!("../contractor.toml");

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub data_root: String,
    pub currency: Currency,
    pub template: Template,
    pub number_pattern: NumberPattern,
    /// Quiet window before an edit is written to the draft file.
    pub autosave_ms: u64,
    pub export: ExportOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_root: "~/Documents/Invoices".to_string(),
            currency: Currency::default(),
            template: Template::default(),
            number_pattern: NumberPattern::default(),
            autosave_ms: 1000,
            export: ExportOptions::default(),
        }
    }
}

impl Settings {
    pub fn root(&self) -> PathBuf {
        PathBuf::from(expand_home_dir(&self.data_root))
    }

    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.autosave_ms)
    }
}

pub fn config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "invoice-builder", "app") {
        let config_dir = proj_dirs.config_dir();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir).ok();
        }
        return config_dir.join("settings.toml");
    }
    PathBuf::from("settings.toml")
}

/// `None` when no settings file exists yet (first run) or it cannot be parsed.
pub fn load_settings_from(path: &Path) -> Option<Settings> {
    let content = fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed settings");
            None
        }
    }
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    let toml_str = toml::to_string_pretty(settings)?;
    fs::write(path, toml_str)?;
    info!(path = %path.display(), "settings saved");
    Ok(())
}

pub fn expand_home_dir(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}

/// Contractor profile used to pre-fill new invoices. Written from the
/// embedded default on first use.
pub fn load_contractor(root: &Path) -> Result<ContactInfo> {
    let path = root.join(CONTRACTOR_FILE);
    if path.exists() {
        let content = fs::read_to_string(&path)?;
        return toml::from_str(&content).map_err(|source| InvoiceError::TomlRead { path, source });
    }

    println!("✨ Initializing default contractor profile...");
    fs::create_dir_all(root)?;
    fs::write(&path, DEFAULT_CONTRACTOR_TEMPLATE)?;
    toml::from_str(DEFAULT_CONTRACTOR_TEMPLATE).map_err(|source| InvoiceError::TomlRead { path, source })
}

pub fn save_contractor(root: &Path, contractor: &ContactInfo) -> Result<()> {
    fs::create_dir_all(root)?;
    let toml_str = toml::to_string_pretty(contractor)?;
    fs::write(root.join(CONTRACTOR_FILE), toml_str)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{Orientation, Paper};

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            data_root = "/tmp/invoices"
            currency = "GBP"
            number_pattern = "yearly"

            [export]
            paper = "a4"
            "#,
        )
        .unwrap();
        assert_eq!(settings.root(), PathBuf::from("/tmp/invoices"));
        assert_eq!(settings.currency, Currency::GBP);
        assert_eq!(settings.template, Template::Modern);
        assert_eq!(settings.number_pattern, NumberPattern::Yearly);
        assert_eq!(settings.quiet_window(), Duration::from_secs(1));
        assert_eq!(settings.export.paper, Paper::A4);
        assert_eq!(settings.export.orientation, Orientation::Portrait);
    }

    #[test]
    fn test_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        assert_eq!(load_settings_from(&path), None);

        let settings = Settings { autosave_ms: 250, template: Template::Classic, ..Settings::default() };
        save_settings_to(&path, &settings).unwrap();
        assert_eq!(load_settings_from(&path), Some(settings));

        fs::write(&path, "autosave_ms = \"soon\"").unwrap();
        assert_eq!(load_settings_from(&path), None);
    }

    #[test]
    fn test_expand_home_dir_leaves_absolute_paths() {
        assert_eq!(expand_home_dir("/srv/data"), "/srv/data");
        if BaseDirs::new().is_some() {
            assert!(!expand_home_dir("~/Invoices").starts_with('~'));
        }
    }

    #[test]
    fn test_contractor_profile_initialised_then_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        let first = load_contractor(&root).unwrap();
        assert!(root.join(CONTRACTOR_FILE).exists());

        let mut edited = first.clone();
        edited.company = "Doe Consulting LLC".into();
        save_contractor(&root, &edited).unwrap();
        assert_eq!(load_contractor(&root).unwrap(), edited);
    }
}
