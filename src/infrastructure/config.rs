use crate::domain::{config::SerialRwConfig, error::{SerialRwError, SerialRwResult}};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings file manager
pub struct ConfigManager {
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Manager for the user's settings file under the platform config dir
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Manager for an explicit settings file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// `<config dir>/serialrw/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("serialrw").join("config.toml"))
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Load settings; defaults when the file does not exist
    pub fn load_config(&self) -> SerialRwResult<SerialRwConfig> {
        match &self.config_path {
            Some(path) if path.exists() => self.load_config_from_path(path),
            Some(path) => {
                debug!("No settings file at {}, using defaults", path.display());
                Ok(SerialRwConfig::default())
            }
            None => Ok(SerialRwConfig::default()),
        }
    }

    /// Load settings from a specific path
    pub fn load_config_from_path(&self, path: &Path) -> SerialRwResult<SerialRwConfig> {
        let content = fs::read_to_string(path).map_err(|e| SerialRwError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: SerialRwConfig = toml::from_str(&content).map_err(|e| SerialRwError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save settings to a specific path, creating its directory
    pub fn save_config_to_path(&self, path: &Path, config: &SerialRwConfig) -> SerialRwResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| SerialRwError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SerialRwError::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }

        fs::write(path, content).map_err(|e| SerialRwError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Write a default settings file; refuses to overwrite
    pub fn init_config(&self, path: &Path) -> SerialRwResult<()> {
        if path.exists() {
            return Err(SerialRwError::Config {
                message: format!("Configuration already exists at {}", path.display()),
            });
        }
        self.save_config_to_path(path, &SerialRwConfig::default())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("absent.toml"));
        let config = manager.load_config().unwrap();

        assert_eq!(config.global.log_level, "info");
        assert_eq!(config.serial.baud_rate, 9600);
    }

    #[test]
    fn test_init_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("serialrw").join("config.toml");
        let manager = ConfigManager::with_path(&path);

        manager.init_config(&path).unwrap();
        assert!(path.exists());
        assert!(manager.init_config(&path).is_err());

        let config = manager.load_config().unwrap();
        assert_eq!(config.output.default_file, PathBuf::from("serial_output.txt"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[serial\nbaud_rate = ").unwrap();

        let err = ConfigManager::with_path(&path).load_config().unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_infinite_timeout_rejected_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[serial]\ntimeout_secs = inf\n").unwrap();

        let err = ConfigManager::with_path(&path).load_config().unwrap_err();
        assert!(matches!(err, SerialRwError::Config { .. }));
        assert!(err.to_string().contains("timeout_secs"));
    }
}
