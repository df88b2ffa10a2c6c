use crate::domain::error::{SerialRwError, SerialRwResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// SerialRW settings file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerialRwConfig {
    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,
    /// Serial connection defaults
    #[serde(default)]
    pub serial: SerialDefaults,
    /// Output file settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Global settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory holding the persisted record and snapshot, relative to the
    /// working directory unless absolute
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Serial connection defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialDefaults {
    /// Baud rate used when none is given
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Port timeout and settle delay in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
    /// Sleep between console polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Output file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File used when `--output` is given without a value
    #[serde(default = "default_output_file")]
    pub default_file: PathBuf,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_timeout_secs() -> f64 {
    1.0
}

fn default_poll_interval_ms() -> u64 {
    1
}

fn default_output_file() -> PathBuf {
    PathBuf::from("serial_output.txt")
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for SerialDefaults {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_file: default_output_file(),
        }
    }
}

impl SerialRwConfig {
    /// Reject values that parse as TOML but cannot be used
    pub fn validate(&self) -> SerialRwResult<()> {
        self.serial.timeout()?;
        Ok(())
    }
}

impl SerialDefaults {
    /// Negative values clamp to zero; values too large for a `Duration` are
    /// a `Config` error.
    pub fn timeout(&self) -> SerialRwResult<Duration> {
        Duration::try_from_secs_f64(self.timeout_secs.max(0.0)).map_err(|_| SerialRwError::Config {
            message: format!("serial.timeout_secs = {} is out of range", self.timeout_secs),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
