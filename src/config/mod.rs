mod keystore;
mod theme;
mod watcher;

pub use keystore::{
    prompt_master_password, prompt_new_password, KeyStore, KeyStoreBackend, SecretString,
};
pub use theme::{HexColor, Theme};
pub use watcher::{ConfigEvent, ConfigWatcherMode};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::adapter::AdapterConfig;
use crate::error::{Result, SettingsError};
use crate::settings::UiSettings;

const CONFIG_DIR: &str = "chat-settings";
const MAIN_CONFIG_FILE: &str = "config.toml";
const SETTINGS_FILE: &str = "settings.toml";
const UI_FILE: &str = "ui.toml";
const THEME_FILE: &str = "theme.toml";
const KEYS_DIR: &str = "keys";
const LOGS_DIR: &str = "logs";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub server: ServerConfig,
    pub endpoints: EndpointsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub tick_interval_ms: u64,
    pub log_level: String,
    /// Directory for the TUI log file; defaults to `<config dir>/logs`
    pub log_dir: Option<PathBuf>,
    pub watch_config: bool,
    pub config_watch_debounce_ms: u64,
    /// Force a keystore backend; detected when unset
    pub keystore: Option<KeyStoreBackend>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            log_level: "info".to_string(),
            log_dir: None,
            watch_config: true,
            config_watch_debounce_ms: 1000,
            keystore: None,
        }
    }
}

/// What the chat server exposes to this client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Enabled adapters, in the server's order
    pub adapters: AdapterConfig,
    /// Authenticated profile name; absent for guests
    pub profile: Option<String>,
}

impl ServerConfig {
    pub fn logged_in(&self) -> bool {
        self.profile.as_deref().is_some_and(|p| !p.trim().is_empty())
    }
}

/// Base URLs for provider lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub horde_url: String,
    pub novel_url: String,
    pub openai_url: String,
    pub timeout_secs: u64,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            horde_url: "https://aihorde.net/api/v2".to_string(),
            novel_url: "https://api.novelai.net".to_string(),
            openai_url: "https://api.openai.com".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Which file a reload touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadedFile {
    Main,
    Ui,
    Theme,
}

pub struct ConfigManager {
    config_dir: PathBuf,
    app_config: AppConfig,
    ui_settings: UiSettings,
    /// Contents of theme.toml, if the user has one
    custom_theme: Option<Theme>,
    theme: Theme,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Ok(Self::with_dir(Self::get_config_dir()?))
    }

    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        let app_config = Self::load_toml_file(&config_dir.join(MAIN_CONFIG_FILE)).unwrap_or_default();
        let ui_settings: UiSettings =
            Self::load_toml_file(&config_dir.join(UI_FILE)).unwrap_or_default();
        let custom_theme = Self::load_toml_file(&config_dir.join(THEME_FILE));
        let theme = Theme::for_choice(ui_settings.theme, custom_theme.as_ref());

        Self {
            config_dir,
            app_config,
            ui_settings,
            custom_theme,
            theme,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn app_config(&self) -> &AppConfig {
        &self.app_config
    }

    pub fn ui_settings(&self) -> &UiSettings {
        &self.ui_settings
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    pub fn keys_dir(&self) -> PathBuf {
        self.config_dir.join(KEYS_DIR)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.app_config
            .general
            .log_dir
            .clone()
            .unwrap_or_else(|| self.config_dir.join(LOGS_DIR))
    }

    /// Apply and persist UI preferences
    pub fn set_ui_settings(&mut self, ui_settings: UiSettings) -> Result<()> {
        self.theme = Theme::for_choice(ui_settings.theme, self.custom_theme.as_ref());
        self.ui_settings = ui_settings;
        self.ensure_config_dir()?;
        let content = toml::to_string_pretty(&self.ui_settings)
            .map_err(|e| SettingsError::Config(format!("Failed to serialize UI settings: {}", e)))?;
        std::fs::write(self.config_dir.join(UI_FILE), content)
            .map_err(|e| SettingsError::Config(format!("Failed to write UI settings: {}", e)))
    }

    /// Re-read the file behind a watcher event
    pub fn reload_file(&mut self, path: &Path) -> Option<ReloadedFile> {
        match path.file_name().and_then(|n| n.to_str()) {
            Some(MAIN_CONFIG_FILE) => {
                self.app_config =
                    Self::load_toml_file(&self.config_dir.join(MAIN_CONFIG_FILE)).unwrap_or_default();
                Some(ReloadedFile::Main)
            }
            Some(UI_FILE) => {
                self.ui_settings =
                    Self::load_toml_file(&self.config_dir.join(UI_FILE)).unwrap_or_default();
                self.theme = Theme::for_choice(self.ui_settings.theme, self.custom_theme.as_ref());
                Some(ReloadedFile::Ui)
            }
            Some(THEME_FILE) => {
                self.custom_theme = Self::load_toml_file(&self.config_dir.join(THEME_FILE));
                self.theme = Theme::for_choice(self.ui_settings.theme, self.custom_theme.as_ref());
                Some(ReloadedFile::Theme)
            }
            _ => None,
        }
    }

    fn get_config_dir() -> Result<PathBuf> {
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join(CONFIG_DIR))
            .ok_or_else(|| SettingsError::Config("Could not determine config directory".to_string()))
    }

    fn load_toml_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
        if !path.exists() {
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)
                .map_err(|e| SettingsError::Config(format!("Failed to create config dir: {}", e)))?;
        }
        Ok(())
    }

    /// Write a default config.toml if none exists
    pub fn write_default_config(&self) -> Result<()> {
        self.ensure_config_dir()?;

        let main_path = self.config_dir.join(MAIN_CONFIG_FILE);
        if !main_path.exists() {
            let content = toml::to_string_pretty(&AppConfig::default())
                .map_err(|e| SettingsError::Config(format!("Failed to serialize config: {}", e)))?;
            std::fs::write(&main_path, content)
                .map_err(|e| SettingsError::Config(format!("Failed to write config: {}", e)))?;
        }
        Ok(())
    }
}
