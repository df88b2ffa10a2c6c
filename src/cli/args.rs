use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;

/// Command line arguments for SerialRW
#[derive(Parser, Debug)]
#[command(
    name = "serialrw",
    version = env!("CARGO_PKG_VERSION"),
    about = "Serial read/write console for Arduino boards",
    long_about = "Connect to an Arduino-class board over a serial port, stream its output to the console, optionally save it to a file, and remember the last connection."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for informational commands
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub output_format: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a board and remember the connection
    Connect(ConnectArgs),
    /// Stream a board's serial output to the console
    Read(ReadArgs),
    /// Capture serial output to a file for a fixed time
    Log(LogArgs),
    /// List available serial ports
    List,
    /// Show the last saved connection
    Last,
    /// Check for arduino-cli and offer to install it
    Setup(SetupArgs),
    /// Settings file management
    Config(ConfigArgs),
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Arguments for `connect`
#[derive(ClapArgs, Debug)]
pub struct ConnectArgs {
    /// Serial port (e.g. /dev/tty.* or COM3)
    #[arg(short, long)]
    pub port: String,

    /// Baud rate [default: 9600]
    #[arg(short = 'b', long = "baud_rate", visible_alias = "baud-rate")]
    pub baud_rate: Option<u32>,

    /// Show the serial output in the console
    #[arg(short, long)]
    pub show: bool,

    /// Port timeout and settle delay in seconds [default: 1]
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Append received lines to FILE [default: serial_output.txt]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<Option<PathBuf>>,
}

/// Arguments for `read`
#[derive(ClapArgs, Debug)]
pub struct ReadArgs {
    /// Serial port; the last saved connection is used when omitted
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate [default: saved value or 9600]
    #[arg(short = 'b', long = "baud_rate", visible_alias = "baud-rate")]
    pub baud_rate: Option<u32>,

    /// Port timeout and settle delay in seconds [default: 1]
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Append received lines to FILE [default: serial_output.txt]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<Option<PathBuf>>,
}

/// Arguments for `log`
#[derive(ClapArgs, Debug)]
pub struct LogArgs {
    /// Serial port (e.g. /dev/tty.* or COM3)
    #[arg(short, long)]
    pub port: String,

    /// Baud rate [default: 9600]
    #[arg(short = 'b', long = "baud_rate", visible_alias = "baud-rate")]
    pub baud_rate: Option<u32>,

    /// Capture duration in seconds
    #[arg(short, long, default_value = "5")]
    pub duration: f64,

    /// File the lines are appended to [default: serial_output.txt]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for `setup`
#[derive(ClapArgs, Debug)]
pub struct SetupArgs {
    /// Answer yes to every question
    #[arg(short, long, conflicts_with = "no_prompt")]
    pub yes: bool,

    /// Only check; answer no to every question
    #[arg(long)]
    pub no_prompt: bool,
}

/// Settings file arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Settings file subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective settings
    Show,
    /// Write a default settings file
    Init {
        /// Output file path [default: user config directory]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Rewrite the two-letter short flag `-br` to `--baud_rate`, which clap
/// cannot express as a short option.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| match arg.to_str() {
            Some("-br") => OsString::from("--baud_rate"),
            Some(s) if s.starts_with("-br=") => OsString::from(format!("--baud_rate={}", &s[4..])),
            Some(s) if s.len() > 3 && s.starts_with("-br") && s[3..].bytes().all(|b| b.is_ascii_digit()) => {
                OsString::from(format!("--baud_rate={}", &s[3..]))
            }
            _ => arg,
        })
        .collect()
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(normalize_args(args.iter().copied()))
    }

    #[test]
    fn test_connect_with_legacy_baud_flag() {
        let args = parse(&["serialrw", "connect", "-p", "/dev/ttyACM0", "-br", "115200", "-s"]).unwrap();
        match args.command {
            Some(Command::Connect(connect)) => {
                assert_eq!(connect.port, "/dev/ttyACM0");
                assert_eq!(connect.baud_rate, Some(115200));
                assert!(connect.show);
                assert!(connect.output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_connect_requires_port() {
        assert!(parse(&["serialrw", "connect"]).is_err());
    }

    #[test]
    fn test_read_port_optional() {
        let args = parse(&["serialrw", "read", "--baud_rate", "57600"]).unwrap();
        match args.command {
            Some(Command::Read(read)) => {
                assert!(read.port.is_none());
                assert_eq!(read.baud_rate, Some(57600));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_output_flag_without_value() {
        let args = parse(&["serialrw", "read", "-p", "COM3", "-o"]).unwrap();
        match args.command {
            Some(Command::Read(read)) => assert_eq!(read.output, Some(None)),
            other => panic!("unexpected command: {other:?}"),
        }

        let args = parse(&["serialrw", "read", "-p", "COM3", "-o", "log.txt"]).unwrap();
        match args.command {
            Some(Command::Read(read)) => assert_eq!(read.output, Some(Some(PathBuf::from("log.txt")))),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_no_subcommand_is_allowed() {
        let args = parse(&["serialrw"]).unwrap();
        assert!(args.command.is_none());
    }

    #[test]
    fn test_help_subcommand_displays_help() {
        let err = parse(&["serialrw", "help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_normalize_args() {
        let normalized = normalize_args(["serialrw", "-br", "9600", "-br=300", "-br4800", "-bright"]);
        assert_eq!(
            normalized,
            vec![
                OsString::from("serialrw"),
                OsString::from("--baud_rate"),
                OsString::from("9600"),
                OsString::from("--baud_rate=300"),
                OsString::from("--baud_rate=4800"),
                OsString::from("-bright"),
            ]
        );
    }
}
