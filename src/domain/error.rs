use std::path::PathBuf;
use thiserror::Error;

/// SerialRW unified error type
#[derive(Error, Debug)]
pub enum SerialRwError {
    #[error("Could not open serial port {port}: {message}")]
    Connection { port: String, message: String },

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No port given and no saved connection found at {}; pass --port <PORT>", path.display())]
    ConfigMissing { path: PathBuf },

    #[error("Failed to write output file {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("arduino-cli helper error: {message}")]
    Tool { message: String },

    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

/// Output formatting errors
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML serialization error: {0}")]
    TomlError(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type SerialRwResult<T> = Result<T, SerialRwError>;
