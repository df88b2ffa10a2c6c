use crate::domain::error::{SerialRwError, SerialRwResult};
use chrono::{DateTime, Utc};
use std::time::Duration;

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// How to open and behave toward one serial device
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionDescriptor {
    port: String,
    pub baud_rate: u32,
    /// Port read timeout, also the settle delay after opening
    pub timeout: Duration,
    /// Echo received lines to the console while connected
    pub display_to_console: bool,
    /// Set on successful connect
    pub last_connected: Option<DateTime<Utc>>,
}

impl ConnectionDescriptor {
    /// Create a descriptor with default baud rate and timeout.
    ///
    /// Fails with `InvalidInput` when `port` is empty or whitespace.
    pub fn new(port: impl Into<String>) -> SerialRwResult<Self> {
        let port = port.into();
        if port.trim().is_empty() {
            return Err(SerialRwError::InvalidInput(
                "serial port must not be empty".to_string(),
            ));
        }

        Ok(Self {
            port,
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
            display_to_console: false,
            last_connected: None,
        })
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_display(mut self, display_to_console: bool) -> Self {
        self.display_to_console = display_to_console;
        self
    }

    pub fn port(&self) -> &str {
        &self.port
    }
}

impl std::fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {} baud", self.port, self.baud_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let descriptor = ConnectionDescriptor::new("/dev/ttyACM0").unwrap();
        assert_eq!(descriptor.port(), "/dev/ttyACM0");
        assert_eq!(descriptor.baud_rate, 9600);
        assert_eq!(descriptor.timeout, Duration::from_secs(1));
        assert!(!descriptor.display_to_console);
        assert!(descriptor.last_connected.is_none());
    }

    #[test]
    fn test_empty_port_rejected() {
        assert!(matches!(
            ConnectionDescriptor::new(""),
            Err(SerialRwError::InvalidInput(_))
        ));
        assert!(ConnectionDescriptor::new("   ").is_err());
    }

    #[test]
    fn test_builder_and_display() {
        let descriptor = ConnectionDescriptor::new("COM3")
            .unwrap()
            .with_baud_rate(115200)
            .with_display(true);
        assert!(descriptor.display_to_console);
        assert_eq!(descriptor.to_string(), "COM3 @ 115200 baud");
    }
}
