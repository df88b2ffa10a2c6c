use crate::cli::args::{
    Args, Command, ConfigArgs, ConfigCommand, ConnectArgs, LogArgs, ReadArgs, SetupArgs,
};
use crate::cli::output::{ConsoleWriter, OutputWriter};
use crate::core::session::{ConsoleStreamer, SerialSession, StopReason, StreamSummary};
use crate::core::signal::ShutdownSignal;
use crate::domain::{
    config::SerialRwConfig,
    descriptor::ConnectionDescriptor,
    error::{SerialRwError, SerialRwResult},
};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::serial::{available_ports, Connector, SerialPortConnector};
use crate::infrastructure::store::ConfigStore;
use crate::infrastructure::toolchain::{
    ArduinoCli, FixedAnswer, Prompter, StdinPrompter, SystemRunner,
};
use clap::CommandFactory;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Everything a command needs besides its own arguments
pub struct CommandContext {
    pub config: SerialRwConfig,
    pub writer: ConsoleWriter,
    pub shutdown: ShutdownSignal,
    pub connector: Arc<dyn Connector>,
}

impl CommandContext {
    fn store(&self) -> ConfigStore {
        ConfigStore::new(self.config.global.data_dir.clone())
    }

    fn session(&self, descriptor: ConnectionDescriptor) -> SerialSession {
        SerialSession::new(descriptor, Box::new(self.connector.clone()), self.store())
    }

    fn timeout(&self, seconds: Option<f64>) -> SerialRwResult<Duration> {
        match seconds {
            Some(seconds) => seconds_arg("--timeout", seconds),
            None => self.config.serial.timeout(),
        }
    }

    fn output_file(&self, output: Option<Option<PathBuf>>) -> Option<PathBuf> {
        output.map(|path| path.unwrap_or_else(|| self.config.output.default_file.clone()))
    }

    fn streamer(&self, echo: bool, output_file: Option<PathBuf>) -> ConsoleStreamer<std::io::Stdout> {
        ConsoleStreamer::new(std::io::stdout(), self.shutdown.clone())
            .with_echo(echo)
            .with_output_file(output_file)
            .with_poll_interval(self.config.serial.poll_interval())
    }
}

/// Execute CLI command
pub async fn execute_command(args: Args) -> SerialRwResult<()> {
    let config_manager = match &args.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };
    let config = config_manager.load_config()?;

    if !args.quiet {
        init_logging(&config.global.log_level, args.verbose)?;
    }

    let ctx = CommandContext {
        config,
        writer: ConsoleWriter::new(args.output_format),
        shutdown: ShutdownSignal::new(),
        connector: Arc::new(SerialPortConnector),
    };

    match args.command {
        Some(Command::Connect(_)) | Some(Command::Read(_)) | Some(Command::Log(_)) => {
            ctx.shutdown.listen_for_ctrl_c();
        }
        _ => {}
    }

    dispatch(args.command, ctx, &config_manager).await
}

/// Run one parsed command against a prepared context
pub async fn dispatch(
    command: Option<Command>,
    ctx: CommandContext,
    config_manager: &ConfigManager,
) -> SerialRwResult<()> {
    match command {
        None => {
            Args::command().print_help()?;
            println!();
            Ok(())
        }
        Some(Command::Connect(connect_args)) => run_blocking(move || execute_connect(connect_args, &ctx)).await,
        Some(Command::Read(read_args)) => run_blocking(move || execute_read(read_args, &ctx)).await,
        Some(Command::Log(log_args)) => run_blocking(move || execute_log(log_args, &ctx)).await,
        Some(Command::List) => {
            let ports = available_ports()?;
            ctx.writer.write_ports(&ports)?;
            Ok(())
        }
        Some(Command::Last) => {
            let store = ctx.store();
            let last = store.load_last()?;
            ctx.writer.write_last_connection(last.as_ref(), store.record_path()?)?;
            Ok(())
        }
        Some(Command::Setup(setup_args)) => execute_setup(setup_args, &ctx).await,
        Some(Command::Config(config_args)) => execute_config(config_args, &ctx, config_manager),
    }
}

fn seconds_arg(flag: &str, seconds: f64) -> SerialRwResult<Duration> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| SerialRwError::InvalidInput(format!("{} must be a non-negative number of seconds, got {}", flag, seconds)))
}

async fn run_blocking<F>(work: F) -> SerialRwResult<()>
where
    F: FnOnce() -> SerialRwResult<()> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| SerialRwError::Session {
            message: format!("Session task failed: {}", e),
        })?
}

pub fn execute_connect(args: ConnectArgs, ctx: &CommandContext) -> SerialRwResult<()> {
    let descriptor = ConnectionDescriptor::new(args.port)?
        .with_baud_rate(args.baud_rate.unwrap_or(ctx.config.serial.baud_rate))
        .with_timeout(ctx.timeout(args.timeout)?)
        .with_display(args.show);

    let output_file = ctx.output_file(args.output);
    let mut streamer = ctx.streamer(args.show, output_file.clone());
    let mut session = ctx.session(descriptor);

    let summary = session.connect(&mut streamer)?;
    finish(&mut session, summary, output_file, ctx)
}

pub fn execute_read(args: ReadArgs, ctx: &CommandContext) -> SerialRwResult<()> {
    let descriptor = match args.port {
        Some(port) => ConnectionDescriptor::new(port)?
            .with_baud_rate(args.baud_rate.unwrap_or(ctx.config.serial.baud_rate)),
        None => {
            let store = ctx.store();
            let Some(saved) = store.load_last()? else {
                return Err(SerialRwError::ConfigMissing {
                    path: store.record_path()?.to_path_buf(),
                });
            };
            info!("Using saved connection {}", saved);
            match args.baud_rate {
                Some(baud_rate) => saved.with_baud_rate(baud_rate),
                None => saved,
            }
        }
    }
    .with_timeout(ctx.timeout(args.timeout)?)
    .with_display(true);

    let output_file = ctx.output_file(args.output);
    let mut streamer = ctx.streamer(true, output_file.clone());
    let mut session = ctx.session(descriptor);

    let summary = session.connect(&mut streamer)?;
    finish(&mut session, summary, output_file, ctx)
}

pub fn execute_log(args: LogArgs, ctx: &CommandContext) -> SerialRwResult<()> {
    let descriptor = ConnectionDescriptor::new(args.port)?
        .with_baud_rate(args.baud_rate.unwrap_or(ctx.config.serial.baud_rate))
        .with_timeout(ctx.config.serial.timeout()?);
    let output_file = args
        .output
        .unwrap_or_else(|| ctx.config.output.default_file.clone());
    let duration = seconds_arg("--duration", args.duration)?;

    let mut session = ctx.session(descriptor);
    session.open()?;
    ctx.writer.write_message(&format!(
        "Logging {} for {:.1}s to {}",
        session.descriptor().port(),
        duration.as_secs_f64(),
        output_file.display()
    ))?;

    let lines = session.capture_for(duration, &output_file, ctx.shutdown.clone())?;
    session.close();
    ctx.writer
        .write_message(&format!("Data written to {} ({} lines)", output_file.display(), lines))?;
    Ok(())
}

fn finish(
    session: &mut SerialSession,
    summary: Option<StreamSummary>,
    output_file: Option<PathBuf>,
    ctx: &CommandContext,
) -> SerialRwResult<()> {
    let port = session.descriptor().port().to_string();
    session.close();

    match summary {
        None => {
            ctx.writer.write_message(&format!("Connected to Arduino on port {}", port))?;
            if let Ok(path) = session.store().record_path() {
                ctx.writer
                    .write_message(&format!("Connection saved to {}", path.display()))?;
            }
        }
        Some(summary) => {
            if summary.reason == StopReason::Interrupted {
                ctx.writer.write_message("Interrupted! Closing the connection.")?;
            }
            if let Some(path) = output_file {
                ctx.writer.write_message(&format!(
                    "Data written to {} ({} lines)",
                    path.display(),
                    summary.lines
                ))?;
            }
            ctx.writer
                .write_message(&format!("Closed serial connection on port {}", port))?;
        }
    }
    Ok(())
}

async fn execute_setup(args: SetupArgs, ctx: &CommandContext) -> SerialRwResult<()> {
    let prompter: Box<dyn Prompter> = if args.yes {
        Box::new(FixedAnswer(true))
    } else if args.no_prompt {
        Box::new(FixedAnswer(false))
    } else {
        Box::new(StdinPrompter::new())
    };

    let mut helper = ArduinoCli::new(SystemRunner, prompter);
    let outcome = helper.ensure_installed().await?;
    ctx.writer.write_install_outcome(&outcome)?;
    Ok(())
}

fn execute_config(
    args: ConfigArgs,
    ctx: &CommandContext,
    config_manager: &ConfigManager,
) -> SerialRwResult<()> {
    match args.command {
        ConfigCommand::Show => {
            let path = config_manager.config_path().filter(|path| path.exists());
            ctx.writer.write_config(&ctx.config, path)?;
            Ok(())
        }
        ConfigCommand::Init { output } => {
            let path = match output.or_else(|| config_manager.config_path().map(PathBuf::from)) {
                Some(path) => path,
                None => {
                    return Err(SerialRwError::Config {
                        message: "Could not determine config directory; pass --output".to_string(),
                    })
                }
            };
            config_manager.init_config(&path)?;
            ctx.writer
                .write_message(&format!("Configuration initialized at '{}'", path.display()))?;
            Ok(())
        }
    }
}
