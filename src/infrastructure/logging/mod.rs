// Logging module - Logging infrastructure
use crate::domain::error::{SerialRwError, SerialRwResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(log_level: &str, verbose: bool) -> String {
    let level = if verbose {
        "debug"
    } else {
        match log_level {
            "error" | "warn" | "info" | "debug" | "trace" => log_level,
            _ => "info",
        }
    };
    format!("serialrw={},warn", level)
}

/// Initialize logging to stderr so device output on stdout stays clean
pub fn init_logging(log_level: &str, verbose: bool) -> SerialRwResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level, verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .try_init()
        .map_err(|e| SerialRwError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("SerialRW logging system initialized");
    Ok(())
}
