//! User preferences persisted to a local JSON file: UI theme and the list of
//! selectable models. Loaded once at startup and injected where needed.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{ClientError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Theme {
    #[default]
    #[serde(rename = "lara-light-blue")]
    Light,
    #[serde(rename = "lara-dark-blue")]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "lara-light-blue",
            Theme::Dark => "lara-dark-blue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOption {
    pub id: String,
    pub label: String,
    pub value: String,
}

impl ModelOption {
    fn new(id: &str, label: &str, value: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

pub fn default_models() -> Vec<ModelOption> {
    vec![
        ModelOption::new("1", "Gemma 3.4B (Default)", "gemma-3-4b-it"),
        ModelOption::new("2", "GPT-4 Turbo", "gpt-4-turbo"),
        ModelOption::new("3", "Claude 3 Opus", "claude-3-opus"),
        ModelOption::new("4", "Llama 2 Chat", "llama-2-chat"),
        ModelOption::new("5", "Mistral", "mistral"),
    ]
}

/// On-disk layout. Keys match the ones the web client kept in local storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredSettings {
    #[serde(rename = "app-theme", default)]
    theme: Theme,
    #[serde(rename = "java-resumes-models", default = "default_models")]
    models: Vec<ModelOption>,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            models: default_models(),
        }
    }
}

#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: StoredSettings,
}

impl SettingsStore {
    /// Reads the settings file. A missing file yields defaults; an unreadable
    /// or corrupt one is logged and also yields defaults.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let settings = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<StoredSettings>(&raw) {
                Ok(mut stored) => {
                    if stored.models.is_empty() {
                        stored.models = default_models();
                    }
                    stored
                }
                Err(e) => {
                    warn!("Ignoring corrupt settings file {}: {}", path.display(), e);
                    StoredSettings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredSettings::default(),
            Err(e) => {
                warn!("Could not read settings file {}: {}", path.display(), e);
                StoredSettings::default()
            }
        };

        Self { path, settings }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.settings)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn theme(&self) -> Theme {
        self.settings.theme
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<Theme> {
        self.settings.theme = theme;
        self.save()?;
        info!("Theme set to {}", theme.as_str());
        Ok(theme)
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        self.set_theme(self.settings.theme.toggled())
    }

    pub fn models(&self) -> &[ModelOption] {
        &self.settings.models
    }

    /// First configured model, used when a request names none.
    pub fn default_model(&self) -> &str {
        self.settings
            .models
            .first()
            .map(|m| m.value.as_str())
            .unwrap_or(crate::api_client::requests::DEFAULT_MODEL)
    }

    pub fn add_model(&mut self, label: &str, value: &str) -> Result<ModelOption> {
        let (label, value) = (label.trim(), value.trim());
        if label.is_empty() || value.is_empty() {
            return Err(ClientError::Settings(
                "Label and value are required".to_string(),
            ));
        }

        let model = ModelOption::new(&Uuid::new_v4().to_string(), label, value);
        self.settings.models.push(model.clone());
        self.save()?;
        info!("Added model {} ({})", model.label, model.value);
        Ok(model)
    }

    pub fn remove_model(&mut self, id: &str) -> Result<ModelOption> {
        let index = self
            .settings
            .models
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| ClientError::Settings("Model not found".to_string()))?;

        if self.settings.models.len() == 1 {
            return Err(ClientError::Settings(
                "At least one model is required".to_string(),
            ));
        }

        let removed = self.settings.models.remove(index);
        self.save()?;
        info!("Removed model {}", removed.label);
        Ok(removed)
    }

    pub fn reset_to_defaults(&mut self) -> Result<()> {
        self.settings.models = default_models();
        self.save()?;
        info!("Models reset to defaults");
        Ok(())
    }
}
