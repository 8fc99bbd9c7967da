use crate::error::InitError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod sections;

pub use sections::{
    BehaviorConfig, DisplayBackend, DisplayConfig, InputBackend, InputConfig, LoggingConfig,
    PlayerBackend, PlayerConfig,
};

/// Everything the daemon reads from `config.toml`.
///
/// Every key is optional; a missing file means "all defaults".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub player: PlayerConfig,
    pub display: DisplayConfig,
    pub input: InputConfig,
    pub behavior: BehaviorConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn get_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("moode-oled")
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    /// Where the rolling log lands unless `[logging] directory` says otherwise.
    pub fn default_log_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::cache_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join("moode-oled")
    }

    /// Load from `path`, or the default location when `None`.
    ///
    /// A missing file yields defaults; an unreadable or invalid one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, InitError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::get_config_path);

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| InitError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
            .map_err(|e| InitError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.player.effective_port(), 80);
        assert_eq!(config.input.button_line, 22);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [player]
            backend = "mpd"
            host = "moode.local"

            [display]
            backend = "terminal"
            contrast_idle = 10

            [behavior]
            idle_debounce_ms = 5000
            "#,
        )
        .unwrap();

        assert_eq!(config.player.backend, PlayerBackend::Mpd);
        assert_eq!(config.player.effective_port(), 6600);
        assert_eq!(config.player.poll_interval_ms, 1000);
        assert_eq!(config.display.backend, DisplayBackend::Terminal);
        assert_eq!(config.display.contrast_idle, 10);
        assert_eq!(config.display.contrast_playing, 180);
        assert_eq!(config.behavior.idle_debounce_ms, 5000);
        assert_eq!(config.behavior.volume_step, 5);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(AppConfig::from_toml("[player]\nbackend = \"winamp\"").is_err());
        assert!(AppConfig::from_toml("[display]\naddress = 300").is_err());
    }

    #[test]
    fn test_printed_config_reloads() {
        let printed = AppConfig::default().to_toml_string();
        assert_eq!(AppConfig::from_toml(&printed).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("moode-oled-does-not-exist/config.toml");
        assert_eq!(AppConfig::load(Some(path.as_path())).unwrap(), AppConfig::default());
    }
}
