use crate::cli::args::OutputFormat;
pub use crate::domain::error::OutputError;
use crate::domain::{config::SerialRwConfig, descriptor::ConnectionDescriptor};
use crate::infrastructure::serial::PortListing;
use crate::infrastructure::toolchain::InstallOutcome;
use serde::Serialize;
use std::path::Path;
use tabled::Table;

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_ports(&self, ports: &[PortListing]) -> Result<(), OutputError>;
    fn write_last_connection(
        &self,
        descriptor: Option<&ConnectionDescriptor>,
        record_path: &Path,
    ) -> Result<(), OutputError>;
    fn write_config(&self, config: &SerialRwConfig, path: Option<&Path>) -> Result<(), OutputError>;
    fn write_install_outcome(&self, outcome: &InstallOutcome) -> Result<(), OutputError>;
}

/// JSON view of a saved connection
#[derive(Debug, Serialize)]
struct LastConnectionView<'a> {
    port: &'a str,
    baud_rate: u32,
    last_connected: Option<String>,
    record: String,
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "message": message }));
            }
        }
        Ok(())
    }

    fn write_ports(&self, ports: &[PortListing]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                if ports.is_empty() {
                    println!("No serial ports found");
                } else {
                    println!("{}", Table::new(ports));
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(ports)?);
            }
        }
        Ok(())
    }

    fn write_last_connection(
        &self,
        descriptor: Option<&ConnectionDescriptor>,
        record_path: &Path,
    ) -> Result<(), OutputError> {
        match (self.format, descriptor) {
            (OutputFormat::Text, None) => {
                println!("No saved connection (looked in {})", record_path.display());
            }
            (OutputFormat::Text, Some(descriptor)) => {
                println!("Last connection:");
                println!("  Port: {}", descriptor.port());
                println!("  Baud rate: {}", descriptor.baud_rate);
                match descriptor.last_connected {
                    Some(at) => println!("  Connected: {}", at.to_rfc3339()),
                    None => println!("  Connected: unknown"),
                }
                println!("  Record: {}", record_path.display());
            }
            (OutputFormat::Json, None) => println!("null"),
            (OutputFormat::Json, Some(descriptor)) => {
                let view = LastConnectionView {
                    port: descriptor.port(),
                    baud_rate: descriptor.baud_rate,
                    last_connected: descriptor.last_connected.map(|at| at.to_rfc3339()),
                    record: record_path.display().to_string(),
                };
                println!("{}", serde_json::to_string_pretty(&view)?);
            }
        }
        Ok(())
    }

    fn write_config(&self, config: &SerialRwConfig, path: Option<&Path>) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                match path {
                    Some(path) => println!("# {}", path.display()),
                    None => println!("# defaults"),
                }
                print!("{}", toml::to_string_pretty(config)?);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(config)?);
            }
        }
        Ok(())
    }

    fn write_install_outcome(&self, outcome: &InstallOutcome) -> Result<(), OutputError> {
        let (summary, recommendation) = match outcome {
            InstallOutcome::AlreadyInstalled { version } => {
                (format!("arduino-cli is already installed and ready to use ({})", version), None)
            }
            InstallOutcome::Installed { manager } => {
                (format!("Successfully installed arduino-cli using {}", manager), None)
            }
            InstallOutcome::Skipped { recommendation } => {
                ("Skipped automatic installation of arduino-cli".to_string(), recommendation.as_deref())
            }
            InstallOutcome::NoPackageManager { expected, recommendation } => {
                let summary = match expected {
                    Some(manager) => format!("Package manager '{}' not found; install arduino-cli manually", manager),
                    None => "No supported package manager for this system; install arduino-cli manually".to_string(),
                };
                (summary, recommendation.as_deref())
            }
            InstallOutcome::Declined { manager, recommendation } => {
                (format!("Skipping installation via {}; install arduino-cli manually", manager), recommendation.as_deref())
            }
        };

        match self.format {
            OutputFormat::Text => {
                println!("{}", summary);
                if let Some(text) = recommendation {
                    println!();
                    println!("{}", text);
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({ "message": summary, "recommendation": recommendation })
                );
            }
        }
        Ok(())
    }
}
