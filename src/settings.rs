//! Company profile store and application settings.
//!
//! Both live as flat files in the platform config directory. Files ending in
//! `.json` are read and written as JSON so an old `company_details.json` can
//! be pointed at directly; everything else is TOML.

use std::fs;
use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::SettingsError;
use crate::model::CompanyProfile;
use crate::render::{CollisionPolicy, OutputFormat};

const COMPANY_FILE: &str = "company.toml";
const SETTINGS_FILE: &str = "settings.toml";

pub fn config_dir() -> PathBuf {
    ProjectDirs::from("com", "quotation-maker", "app")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_company_path() -> PathBuf {
    config_dir().join(COMPANY_FILE)
}

pub fn default_settings_path() -> PathBuf {
    config_dir().join(SETTINGS_FILE)
}

/// Whole-file store for the [`CompanyProfile`].
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strict read: `Ok(None)` when the file does not exist.
    pub fn try_load(&self) -> Result<Option<CompanyProfile>, SettingsError> {
        read_file(&self.path)
    }

    /// Never fails. A missing file yields defaults silently, a broken one
    /// yields defaults with a warning.
    pub fn load(&self) -> CompanyProfile {
        match self.try_load() {
            Ok(Some(profile)) => {
                debug!(path = %self.path.display(), "loaded company profile");
                profile
            }
            Ok(None) => CompanyProfile::default(),
            Err(e) => {
                warn!(error = %e, "falling back to default company profile");
                CompanyProfile::default()
            }
        }
    }

    pub fn save(&self, profile: &CompanyProfile) -> Result<(), SettingsError> {
        write_file(&self.path, profile)?;
        info!(path = %self.path.display(), "company profile saved");
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppSettings {
    pub output_dir: String,
    pub format: OutputFormat,
    pub on_collision: CollisionPolicy,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            output_dir: "~/Documents/Quotations".into(),
            format: OutputFormat::default(),
            on_collision: CollisionPolicy::default(),
        }
    }
}

impl AppSettings {
    pub fn load(path: &Path) -> Self {
        match read_file(path) {
            Ok(Some(settings)) => settings,
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(error = %e, "falling back to default application settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        write_file(path, self)
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(expand_home_dir(&self.output_dir))
    }
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

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn read_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SettingsError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(SettingsError::Read { path: path.to_path_buf(), source }),
    };

    let parsed = if is_json(path) {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        toml::from_str(&content).map_err(|e| e.to_string())
    };
    parsed
        .map(Some)
        .map_err(|message| SettingsError::Parse { path: path.to_path_buf(), message })
}

fn write_file<T: Serialize>(path: &Path, value: &T) -> Result<(), SettingsError> {
    let content = if is_json(path) {
        serde_json::to_string_pretty(value).map_err(|e| SettingsError::Serialize(e.to_string()))?
    } else {
        toml::to_string_pretty(value).map_err(|e| SettingsError::Serialize(e.to_string()))?
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|source| SettingsError::Write { path: parent.to_path_buf(), source })?;
    }
    fs::write(path, content).map_err(|source| SettingsError::Write { path: path.to_path_buf(), source })
}
