//! Configuration management for chatline.
//!
//! Loads configuration from ${CHATLINE_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default config template with comments, embedded at compile time.
const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("default_config.toml");

pub mod paths {
    //! Path resolution for chatline configuration and data directories.
    //!
    //! CHATLINE_HOME resolution order:
    //! 1. CHATLINE_HOME environment variable (if set)
    //! 2. ~/.config/chatline (default)

    use std::path::PathBuf;

    /// Returns the chatline home directory.
    ///
    /// Checks CHATLINE_HOME env var first, falls back to ~/.config/chatline.
    /// Without a resolvable home directory, a relative `.chatline` is used.
    pub fn chatline_home() -> PathBuf {
        if let Ok(home) = std::env::var("CHATLINE_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".chatline"),
            |h| h.join(".config").join("chatline"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        chatline_home().join("config.toml")
    }

    /// Returns the directory holding rolling log files.
    pub fn logs_dir() -> PathBuf {
        chatline_home().join("logs")
    }
}

/// Terminal color theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKind {
    #[default]
    Dark,
    Light,
}

impl ThemeKind {
    pub fn toggled(self) -> Self {
        match self {
            ThemeKind::Dark => ThemeKind::Light,
            ThemeKind::Light => ThemeKind::Dark,
        }
    }

    /// Parses a theme name (case-insensitive).
    ///
    /// # Errors
    /// Returns an error for names other than `dark` and `light`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(ThemeKind::Dark),
            "light" => Ok(ThemeKind::Light),
            other => anyhow::bail!("Invalid theme '{other}'. Valid options: dark, light"),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat backend
    pub base_url: String,

    /// Model used for new conversations
    pub model: String,

    /// Models offered for selection
    pub models: Vec<String>,

    /// Sampling temperature in [0, 1]
    pub temperature: f64,

    /// Terminal color theme
    pub theme: ThemeKind,

    /// Request timeout in seconds (0 disables)
    pub request_timeout_secs: u32,

    /// Log filter directive for the file log
    pub log_level: Option<String>,
}

impl Config {
    pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
    pub const DEFAULT_MODEL: &str = "mistral";
    pub const DEFAULT_TEMPERATURE: f64 = 0.3;
    const DEFAULT_MODELS: [&str; 2] = ["mistral", "tinyllama"];

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Saves only the model field to the config file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or written.
    pub fn save_model(model: &str) -> Result<()> {
        Self::save_model_to(&paths::config_path(), model)
    }

    /// Saves only the model field to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// Preserves existing fields and comments using `toml_edit`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or written.
    pub fn save_model_to(path: &Path, model: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let contents = if path.exists() {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?
        } else {
            DEFAULT_CONFIG_TEMPLATE.to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        doc["model"] = value(model);

        Self::write_config(path, &doc.to_string())
    }

    /// Returns the request timeout, `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.request_timeout_secs)))
        }
    }

    /// Returns the effective backend base URL.
    ///
    /// `CHATLINE_BASE_URL` wins over the config value; empty strings are
    /// treated as unset.
    pub fn effective_base_url(&self) -> String {
        if let Ok(env_url) = std::env::var("CHATLINE_BASE_URL") {
            let trimmed = env_url.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }

        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            Self::DEFAULT_BASE_URL.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Returns the configured model list, always containing the active model.
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<String> = self
            .models
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if !models.iter().any(|m| m == &self.model) {
            models.push(self.model.clone());
        }
        models
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, DEFAULT_CONFIG_TEMPLATE)
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            models: Self::DEFAULT_MODELS.iter().map(ToString::to_string).collect(),
            temperature: Self::DEFAULT_TEMPERATURE,
            theme: ThemeKind::Dark,
            request_timeout_secs: 0,
            log_level: None,
        }
    }
}
