// Toolchain module - arduino-cli detection and installation
pub mod arduino_cli;
pub mod prompt;
pub mod runner;

pub use arduino_cli::{ArduinoCli, HostOs, InstallOutcome, PackageManager};
pub use prompt::{FixedAnswer, Prompter, StdinPrompter};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
