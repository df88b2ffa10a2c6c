use crate::core::session::session::SerialSession;
use crate::core::session::state::{StopReason, StreamSummary};
use crate::core::signal::ShutdownSignal;
use crate::domain::error::SerialRwResult;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Blocking loop that polls a session and prints what arrives.
///
/// Holds no transport of its own; it only observes the session it is given.
pub struct ConsoleStreamer<W: Write> {
    out: W,
    echo: bool,
    output_file: Option<PathBuf>,
    poll_interval: Duration,
    deadline: Option<Instant>,
    shutdown: ShutdownSignal,
}

impl<W: Write> ConsoleStreamer<W> {
    pub fn new(out: W, shutdown: ShutdownSignal) -> Self {
        Self {
            out,
            echo: true,
            output_file: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
            shutdown,
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_output_file(mut self, output_file: Option<PathBuf>) -> Self {
        self.output_file = output_file;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// One poll cycle. Returns the line handled, if any.
    pub fn poll_once(&mut self, session: &mut SerialSession) -> SerialRwResult<Option<String>> {
        let Some(line) = session.read_line()? else {
            return Ok(None);
        };

        if self.echo {
            writeln!(self.out, "{line}")?;
            self.out.flush()?;
        }
        if let Some(path) = &self.output_file {
            session.append_to_file(path, &line)?;
        }
        Ok(Some(line))
    }

    /// Poll until interrupted, the session closes, or the deadline passes
    pub fn run(&mut self, session: &mut SerialSession) -> SerialRwResult<StreamSummary> {
        if self.echo {
            writeln!(self.out, "Displaying serial output from {} (Ctrl+C to stop)...", session.descriptor().port())?;
            self.out.flush()?;
        }

        let mut lines = 0;
        let reason = loop {
            if self.shutdown.is_triggered() {
                break StopReason::Interrupted;
            }
            if !session.is_open() {
                break StopReason::SessionClosed;
            }
            if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                break StopReason::DeadlineReached;
            }

            if self.poll_once(session)?.is_some() {
                lines += 1;
            }
            std::thread::sleep(self.poll_interval);
        };

        debug!("Console loop stopped after {} lines: {:?}", lines, reason);
        Ok(StreamSummary { lines, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::descriptor::ConnectionDescriptor;
    use crate::infrastructure::serial::{MemoryConnector, MemoryDevice};
    use crate::infrastructure::store::ConfigStore;
    use tempfile::TempDir;

    fn open_session(device: &MemoryDevice, dir: &TempDir) -> SerialSession {
        let descriptor = ConnectionDescriptor::new("/dev/mem0")
            .unwrap()
            .with_timeout(Duration::ZERO);
        let mut session = SerialSession::new(
            descriptor,
            Box::new(MemoryConnector::new(device.clone())),
            ConfigStore::new(dir.path()),
        );
        session.open().unwrap();
        session
    }

    #[test]
    fn test_three_poll_cycles() {
        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();
        device.push_line("temp=21");
        device.push_idle();
        device.push_line("temp=22");
        let mut session = open_session(&device, &dir);

        let mut streamer = ConsoleStreamer::new(Vec::new(), ShutdownSignal::new());

        assert_eq!(streamer.poll_once(&mut session).unwrap().as_deref(), Some("temp=21"));
        assert_eq!(String::from_utf8_lossy(&streamer.out), "temp=21\n");

        assert_eq!(streamer.poll_once(&mut session).unwrap(), None);
        assert_eq!(String::from_utf8_lossy(&streamer.out), "temp=21\n");

        assert_eq!(streamer.poll_once(&mut session).unwrap().as_deref(), Some("temp=22"));
        assert_eq!(String::from_utf8(streamer.into_inner()).unwrap(), "temp=21\ntemp=22\n");
    }

    #[test]
    fn test_run_stops_when_interrupted() {
        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();
        let mut session = open_session(&device, &dir);

        let shutdown = ShutdownSignal::new();
        shutdown.trigger();
        let mut streamer = ConsoleStreamer::new(Vec::new(), shutdown);

        let summary = streamer.run(&mut session).unwrap();
        assert_eq!(summary.reason, StopReason::Interrupted);
        assert_eq!(summary.lines, 0);
    }

    #[test]
    fn test_run_stops_when_session_closed() {
        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();
        let mut session = open_session(&device, &dir);
        session.close();

        let mut streamer = ConsoleStreamer::new(Vec::new(), ShutdownSignal::new()).with_echo(false);
        let summary = streamer.run(&mut session).unwrap();
        assert_eq!(summary.reason, StopReason::SessionClosed);
        assert!(streamer.into_inner().is_empty());
    }

    #[test]
    fn test_lines_are_appended_to_output_file() {
        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();
        device.push_line("x=1");
        device.push_line("x=2");
        let mut session = open_session(&device, &dir);

        let out = dir.path().join("out.txt");
        let mut streamer = ConsoleStreamer::new(Vec::new(), ShutdownSignal::new())
            .with_echo(false)
            .with_output_file(Some(out.clone()))
            .with_deadline(Instant::now() + Duration::from_millis(50));

        let summary = streamer.run(&mut session).unwrap();
        assert_eq!(summary.reason, StopReason::DeadlineReached);
        assert_eq!(summary.lines, 2);
        assert_eq!(std::fs::read_to_string(out).unwrap(), "x=1\nx=2\n");
    }

    #[test]
    fn test_unwritable_output_file_stops_loop() {
        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();
        device.push_line("x=1");
        let mut session = open_session(&device, &dir);

        let out = dir.path().join("missing-dir").join("out.txt");
        let mut streamer = ConsoleStreamer::new(Vec::new(), ShutdownSignal::new())
            .with_output_file(Some(out));

        let err = streamer.run(&mut session).unwrap_err();
        assert!(matches!(err, crate::domain::error::SerialRwError::OutputWrite { .. }));
    }
}
