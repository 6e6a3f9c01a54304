//! Persisted application settings (last-used credentials path).
//!
//! Stored as JSON in the platform config directory:
//!
//! - **Linux**: `~/.config/pdf2docx/settings.json`
//! - **macOS**: `~/Library/Application Support/pdf2docx/settings.json`
//! - **Windows**: `%APPDATA%\pdf2docx\settings.json`
//!
//! Override the directory by setting `PDF2DOCX_CONFIG_DIR`.

use crate::error::Pdf2DocxError;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Credentials file chosen on a previous run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,
}

const CONFIG_DIR_ENV: &str = "PDF2DOCX_CONFIG_DIR";

/// Directory holding `settings.json`.
pub fn settings_dir() -> PathBuf {
    settings_dir_from(std::env::var_os(CONFIG_DIR_ENV))
}

/// `override_dir` when set and non-empty, else `<config dir>/pdf2docx`.
fn settings_dir_from(override_dir: Option<OsString>) -> PathBuf {
    if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }

    let base = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(std::env::temp_dir);

    base.join("pdf2docx")
}

impl Settings {
    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, Pdf2DocxError> {
        Self::load_from(&settings_dir())
    }

    /// Load `settings.json` from `dir`. A missing file yields defaults.
    pub fn load_from(dir: &Path) -> Result<Self, Pdf2DocxError> {
        let path = dir.join(SETTINGS_FILE);
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(Pdf2DocxError::SettingsError {
                    path,
                    detail: e.to_string(),
                })
            }
        };
        serde_json::from_str(&text).map_err(|e| Pdf2DocxError::SettingsError {
            path,
            detail: e.to_string(),
        })
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), Pdf2DocxError> {
        self.save_to(&settings_dir())
    }

    /// Write `settings.json` into `dir`, creating it if needed.
    pub fn save_to(&self, dir: &Path) -> Result<(), Pdf2DocxError> {
        let path = dir.join(SETTINGS_FILE);
        let err = |detail: String| Pdf2DocxError::SettingsError {
            path: path.clone(),
            detail,
        };
        std::fs::create_dir_all(dir).map_err(|e| err(e.to_string()))?;
        let json = serde_json::to_string_pretty(self).map_err(|e| err(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| err(e.to_string()))?;
        debug!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Remember `path` as the credentials file. Returns `true` when it changed.
    pub fn remember_credentials(&mut self, path: &Path) -> bool {
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if self.credentials_path.as_deref() == Some(path.as_path()) {
            return false;
        }
        self.credentials_path = Some(path);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load_from(dir.path()).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        let s = Settings {
            credentials_path: Some(PathBuf::from("/keys/pdfservices.json")),
        };
        s.save_to(&nested).unwrap();
        assert_eq!(Settings::load_from(&nested).unwrap(), s);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "not json").unwrap();
        let err = Settings::load_from(dir.path()).unwrap_err();
        assert!(matches!(err, Pdf2DocxError::SettingsError { .. }));
    }

    #[test]
    fn remember_reports_changes() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("key.json");
        std::fs::write(&key, "{}").unwrap();

        let mut s = Settings::default();
        assert!(s.remember_credentials(&key));
        assert!(!s.remember_credentials(&key));
        assert!(s.credentials_path.is_some());
    }

    #[test]
    fn override_dir_wins() {
        let d = settings_dir_from(Some(OsString::from("/tmp/pdf2docx_override")));
        assert_eq!(d, PathBuf::from("/tmp/pdf2docx_override"));
    }

    #[test]
    fn platform_dir_without_override() {
        assert!(settings_dir_from(None).ends_with("pdf2docx"));
        assert!(settings_dir_from(Some(OsString::new())).ends_with("pdf2docx"));
    }
}
