//! Persisted choice of the escalation provider to try first.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, PreferenceStore, Result};

/// Provider names accepted as a preference.
pub const KNOWN_PROVIDERS: &[&str] = &["chatgpt", "gemini"];

/// On-disk shape of the preferences file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PreferenceFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_provider: Option<String>,
}

/// Preferred provider stored in a JSON file.
///
/// Reads go to disk each time so that another process (or the settings UI) can change
/// the preference while the dispatcher is running.
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    /// Store backed by the JSON file at `path`; the file need not exist yet.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Preferences file in the default config directory (`~/.lingo/preferences.json`).
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(
            crate::AssistantConfig::config_dir()?.join("preferences.json"),
        ))
    }

    /// Location of the preferences file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> PreferenceFile {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return PreferenceFile::default();
        };
        serde_json::from_str(&contents).unwrap_or_else(|error| {
            tracing::debug!("Ignoring unreadable preferences {:?}: {error}", self.path);
            PreferenceFile::default()
        })
    }

    /// Stores (or clears, with `None`) the preferred provider.
    ///
    /// # Errors
    /// Returns an error for an unknown provider name or if the file cannot be written
    pub fn set_preferred(&self, provider: Option<&str>) -> Result<()> {
        let mut file = self.read();
        file.default_provider = match provider {
            None => None,
            Some(name) => {
                let name = name.trim().to_lowercase();
                if !KNOWN_PROVIDERS.contains(&name.as_str()) {
                    return Err(Error::Config(format!("Unknown provider: {name}")));
                }
                Some(name)
            }
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }
}

impl PreferenceStore for FilePreferences {
    fn preferred(&self) -> Option<String> {
        self.read()
            .default_provider
            .map(|name| name.to_lowercase())
            .filter(|name| KNOWN_PROVIDERS.contains(&name.as_str()))
    }
}

/// Fixed preference, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticPreference(pub Option<String>);

impl PreferenceStore for StaticPreference {
    fn preferred(&self) -> Option<String> {
        self.0.clone()
    }
}
