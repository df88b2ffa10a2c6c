// Core module - Session lifecycle
pub mod session;
pub mod signal;

pub use session::{ConsoleStreamer, SerialSession};
pub use signal::ShutdownSignal;
