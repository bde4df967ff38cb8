//! Host configuration file
//!
//! TOML, by default at `~/.config/camelpad/config.toml`. A missing file is
//! not an error: everything has a default.

use camelpad_gesture::{ButtonId, Gesture, TimingConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid timing: {0}")]
    Timing(#[from] camelpad_gesture::GestureError),

    #[error("Duplicate button index: {0}")]
    DuplicateButton(ButtonId),
}

/// Display label for one pad button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonConfig {
    pub index: ButtonId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub buttons: Vec<ButtonConfig>,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            buttons: (0..4)
                .map(|index| ButtonConfig {
                    index,
                    name: Some(format!("btn_{index}")),
                })
                .collect(),
        }
    }
}

impl PadConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("camelpad")
            .join("config.toml")
    }

    /// Load and validate config from a file, or return default if not found
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PadConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_err)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing.validate()?;

        let mut seen = HashSet::new();
        for button in &self.buttons {
            if !seen.insert(button.index) {
                return Err(ConfigError::DuplicateButton(button.index));
            }
        }
        Ok(())
    }

    /// Configured name for a button, falling back to its index.
    pub fn button_name(&self, index: ButtonId) -> String {
        self.buttons
            .iter()
            .find(|b| b.index == index)
            .and_then(|b| b.name.clone())
            .unwrap_or_else(|| index.to_string())
    }

    /// Human-readable gesture, e.g. `chord(approve+reject)`.
    pub fn describe(&self, gesture: &Gesture) -> String {
        let names = gesture
            .buttons()
            .iter()
            .map(|&b| self.button_name(b))
            .collect::<Vec<_>>()
            .join("+");
        format!("{}({})", gesture.kind(), names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = PadConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[timing]"));
        assert!(toml_str.contains("double_press_window_ms = 300"));
        assert!(toml_str.contains("name = \"btn_0\""));
    }

    #[test]
    fn test_missing_tables_take_defaults() {
        let config: PadConfig = toml::from_str("").unwrap();
        assert_eq!(config.timing, TimingConfig::default());
        assert!(config.buttons.is_empty());

        let config: PadConfig =
            toml::from_str("[timing]\nlong_press_threshold_ms = 800\n").unwrap();
        assert_eq!(config.timing.long_press_threshold_ms, 800);
        assert_eq!(config.timing.chord_window_ms, 50);
    }

    #[test]
    fn test_duplicate_button_rejected() {
        let config: PadConfig = toml::from_str(
            r#"
[[buttons]]
index = 1
name = "a"

[[buttons]]
index = 1
name = "b"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateButton(1))
        ));
    }

    #[test]
    fn test_zero_timing_rejected() {
        let mut config = PadConfig::default();
        config.timing.chord_window_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Timing(_))));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = PadConfig::default();
        config.timing.chord_window_ms = 70;
        config.save(&path).unwrap();

        let loaded = PadConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = PadConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, PadConfig::default());
    }

    #[test]
    fn test_describe_uses_names() {
        let config = PadConfig {
            timing: TimingConfig::default(),
            buttons: vec![
                ButtonConfig {
                    index: 0,
                    name: Some("approve".into()),
                },
                ButtonConfig {
                    index: 2,
                    name: None,
                },
            ],
        };
        let chord = Gesture::chord([2, 0]).unwrap();
        assert_eq!(config.describe(&chord), "chord(approve+2)");
        assert_eq!(config.describe(&Gesture::LongPress(9)), "long_press(9)");
    }
}
