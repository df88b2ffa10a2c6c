//! SerialRW Library
//!
//! Serial port sessions for Arduino-class boards: open a port, stream its
//! lines to the console or a file, and remember the last connection.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use core::session::{ConsoleStreamer, SerialSession, SessionStatus, StopReason};
pub use core::signal::ShutdownSignal;
pub use domain::config::SerialRwConfig;
pub use domain::descriptor::ConnectionDescriptor;
pub use domain::error::{SerialRwError, SerialRwResult};
pub use infrastructure::store::ConfigStore;
