// Session module - Serial session lifecycle and console streaming
pub mod session;
pub mod state;
pub mod streamer;

pub use session::SerialSession;
pub use state::{SessionStatus, StopReason, StreamSummary};
pub use streamer::ConsoleStreamer;
