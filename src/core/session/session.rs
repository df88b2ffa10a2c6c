use crate::core::session::state::{SessionStatus, StreamSummary};
use crate::core::session::streamer::ConsoleStreamer;
use crate::core::signal::ShutdownSignal;
use crate::domain::{
    descriptor::ConnectionDescriptor,
    error::{SerialRwError, SerialRwResult},
};
use crate::infrastructure::serial::{Connector, Transport};
use crate::infrastructure::store::{ConfigStore, SessionSnapshot};
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

const READ_CHUNK: usize = 1024;

/// One serial connection and line-oriented I/O against it
pub struct SerialSession {
    id: Uuid,
    descriptor: ConnectionDescriptor,
    connector: Box<dyn Connector>,
    store: ConfigStore,
    transport: Option<Box<dyn Transport>>,
    status: SessionStatus,
    pending: Vec<u8>,
    lines_received: u64,
    output_file: Option<PathBuf>,
}

impl SerialSession {
    pub fn new(descriptor: ConnectionDescriptor, connector: Box<dyn Connector>, store: ConfigStore) -> Self {
        Self {
            id: Uuid::new_v4(),
            descriptor,
            connector,
            store,
            transport: None,
            status: SessionStatus::Unconnected,
            pending: Vec::new(),
            lines_received: 0,
            output_file: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    pub fn lines_received(&self) -> u64 {
        self.lines_received
    }

    /// File received lines are appended to, recorded in the snapshot
    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    pub fn set_output_file(&mut self, output_file: Option<PathBuf>) {
        self.output_file = output_file;
    }

    /// Open the transport, wait for the line to settle, then persist the
    /// connection.
    pub fn open(&mut self) -> SerialRwResult<()> {
        if self.transport.is_some() {
            return Err(SerialRwError::Session {
                message: format!("Session on {} is already connected", self.descriptor.port()),
            });
        }

        info!("Opening {}", self.descriptor);
        let mut transport = self.connector.open(&self.descriptor)?;

        // Arduino boards reset when the port opens.
        if !self.descriptor.timeout.is_zero() {
            std::thread::sleep(self.descriptor.timeout);
        }
        if let Err(e) = transport.bytes_available() {
            return Err(SerialRwError::Connection {
                port: self.descriptor.port().to_string(),
                message: format!("connection did not settle: {}", e),
            });
        }

        self.transport = Some(transport);
        self.status = SessionStatus::Connected;
        self.pending.clear();
        self.descriptor.last_connected = Some(Utc::now());
        info!("Connected to Arduino on port {}", self.descriptor.port());

        if let Err(e) = self.store.save_record(&self.descriptor) {
            self.close();
            return Err(e);
        }
        self.save_snapshot();
        Ok(())
    }

    /// Open, then stream lines through `streamer` when the descriptor asks
    /// for console output or the streamer writes to a file.
    ///
    /// Returns `None` when no streaming was requested.
    pub fn connect<W: Write>(
        &mut self,
        streamer: &mut ConsoleStreamer<W>,
    ) -> SerialRwResult<Option<StreamSummary>> {
        self.output_file = streamer.output_file().map(Path::to_path_buf);
        self.open()?;

        if self.descriptor.display_to_console || streamer.output_file().is_some() {
            streamer.run(self).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Next complete line if one is already buffered by the transport.
    ///
    /// Never waits for data. Returns `Ok(None)` when nothing is available or
    /// only a partial line has arrived.
    pub fn read_line(&mut self) -> SerialRwResult<Option<String>> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }

        let Some(transport) = self.transport.as_mut() else {
            return Ok(None);
        };

        let available = transport.bytes_available()?;
        if available == 0 {
            return Ok(None);
        }

        let mut buf = vec![0u8; available.min(READ_CHUNK)];
        match transport.read(&mut buf) {
            Ok(n) => {
                debug!("Received {} bytes from {}", n, transport.port_name());
                self.pending.extend_from_slice(&buf[..n]);
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => return Err(e.into()),
        }

        Ok(self.take_line())
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=end).collect();

        let line = match std::str::from_utf8(&raw) {
            Ok(text) => text.trim_end().to_string(),
            Err(_) => {
                warn!("Received invalid UTF-8 from {}: {}", self.descriptor.port(), hex::encode(&raw));
                String::from_utf8_lossy(&raw).trim_end().to_string()
            }
        };

        self.lines_received += 1;
        Some(line)
    }

    /// Append `line` and a newline to `path`. The file is opened and closed
    /// on every call.
    pub fn append_to_file(&self, path: &Path, line: &str) -> SerialRwResult<()> {
        let write = || -> std::io::Result<()> {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            file.write_all(format!("{line}\n").as_bytes())?;
            file.flush()
        };

        write().map_err(|source| SerialRwError::OutputWrite {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Data written to {}", path.display());
        Ok(())
    }

    /// Append every received line to `path` while less than `duration` has
    /// elapsed. Returns the number of lines written.
    pub fn capture_for(
        &mut self,
        duration: Duration,
        path: &Path,
        shutdown: ShutdownSignal,
    ) -> SerialRwResult<u64> {
        self.output_file = Some(path.to_path_buf());
        let mut streamer = ConsoleStreamer::new(std::io::sink(), shutdown)
            .with_echo(false)
            .with_output_file(Some(path.to_path_buf()))
            .with_deadline(Instant::now() + duration);

        Ok(streamer.run(self)?.lines)
    }

    /// Release the transport. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(transport) = self.transport.take() {
            self.save_snapshot();
            drop(transport);
            self.status = SessionStatus::Closed;
            info!("Closed serial connection on port {}", self.descriptor.port());
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            port: self.descriptor.port().to_string(),
            baud_rate: self.descriptor.baud_rate,
            timeout_ms: self.descriptor.timeout.as_millis() as u64,
            display_to_console: self.descriptor.display_to_console,
            last_connected: self.descriptor.last_connected.unwrap_or_else(Utc::now),
            output_file: self.output_file.clone(),
            lines_received: self.lines_received,
        }
    }

    /// Best effort. When the save fails, the previous snapshot is removed
    /// so it cannot be mistaken for this session.
    fn save_snapshot(&self) {
        if let Err(e) = self.store.save_snapshot(&self.snapshot()) {
            warn!("Session snapshot not saved: {}", e);
            if let Err(e) = self.store.discard_snapshot() {
                warn!("Stale session snapshot left in place: {}", e);
            }
        }
    }
}

impl Drop for SerialSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::serial::{MemoryConnector, MemoryDevice, UnavailableConnector};
    use tempfile::TempDir;

    fn session_on(device: &MemoryDevice, dir: &TempDir) -> SerialSession {
        let descriptor = ConnectionDescriptor::new("/dev/mem0")
            .unwrap()
            .with_timeout(Duration::ZERO);
        SerialSession::new(
            descriptor,
            Box::new(MemoryConnector::new(device.clone())),
            ConfigStore::new(dir.path().join("data")),
        )
    }

    #[test]
    fn test_lifecycle_states() {
        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();
        let mut session = session_on(&device, &dir);

        assert_eq!(session.status(), SessionStatus::Unconnected);
        session.close();
        assert_eq!(session.status(), SessionStatus::Unconnected);

        session.open().unwrap();
        assert_eq!(session.status(), SessionStatus::Connected);
        assert!(session.open().is_err());
        assert_eq!(device.opens(), 1);

        session.close();
        assert_eq!(session.status(), SessionStatus::Closed);
        assert_eq!(device.open_handles(), 0);
    }

    #[test]
    fn test_failed_open_persists_nothing() {
        let dir = TempDir::new().unwrap();
        let descriptor = ConnectionDescriptor::new("/dev/fake0").unwrap().with_timeout(Duration::ZERO);
        let mut session = SerialSession::new(
            descriptor,
            Box::new(UnavailableConnector::new("no such device")),
            ConfigStore::new(dir.path().join("data")),
        );

        let err = session.open().unwrap_err();
        assert!(matches!(err, SerialRwError::Connection { .. }));
        assert!(!session.is_open());
        assert!(!dir.path().join("data").exists());
    }

    #[test]
    fn test_unsettled_transport_is_connection_error() {
        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();
        device.fail_with(ErrorKind::BrokenPipe);
        let mut session = session_on(&device, &dir);

        assert!(matches!(session.open(), Err(SerialRwError::Connection { .. })));
        assert_eq!(device.open_handles(), 0);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();
        let mut session = session_on(&device, &dir);
        session.open().unwrap();

        device.push_bytes(b"first\r\nsecond\n".to_vec());
        assert_eq!(session.read_line().unwrap().as_deref(), Some("first"));
        assert_eq!(session.read_line().unwrap().as_deref(), Some("second"));
        assert_eq!(session.read_line().unwrap(), None);
        assert_eq!(session.lines_received(), 2);
    }

    #[test]
    fn test_partial_line_waits_for_newline() {
        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();
        let mut session = session_on(&device, &dir);
        session.open().unwrap();

        device.push_bytes(b"tem".to_vec());
        assert_eq!(session.read_line().unwrap(), None);
        device.push_bytes(b"p=20\n".to_vec());
        assert_eq!(session.read_line().unwrap().as_deref(), Some("temp=20"));
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();
        let mut session = session_on(&device, &dir);
        session.open().unwrap();

        device.push_bytes(vec![b'o', b'k', 0xff, b'\n']);
        assert_eq!(session.read_line().unwrap().as_deref(), Some("ok\u{fffd}"));
    }

    #[test]
    fn test_unplugged_device_error_propagates() {
        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();
        let mut session = session_on(&device, &dir);
        session.open().unwrap();

        device.fail_with(ErrorKind::BrokenPipe);
        assert!(session.read_line().is_err());
    }

    #[test]
    fn test_read_on_closed_session_is_none() {
        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();
        device.push_line("ignored");
        let mut session = session_on(&device, &dir);
        assert_eq!(session.read_line().unwrap(), None);
    }

    #[test]
    fn test_snapshot_reflects_session() {
        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();
        let mut session = session_on(&device, &dir);
        session.open().unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.session_id, session.id());
        assert_eq!(snapshot.port, "/dev/mem0");
        assert_eq!(Some(snapshot.last_connected), session.descriptor().last_connected);
    }

    #[test]
    fn test_capture_for_stops_after_duration() {
        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();
        device.push_line("a");
        device.push_line("b");
        let mut session = session_on(&device, &dir);
        session.open().unwrap();

        let out = dir.path().join("capture.txt");
        let lines = session
            .capture_for(Duration::from_millis(50), &out, ShutdownSignal::new())
            .unwrap();

        assert_eq!(lines, 2);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_snapshot_records_output_file() {
        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();
        let mut session = session_on(&device, &dir);
        session.open().unwrap();
        assert_eq!(session.snapshot().output_file, None);

        let out = dir.path().join("capture.txt");
        session
            .capture_for(Duration::ZERO, &out, ShutdownSignal::new())
            .unwrap();
        session.close();

        match session.store().load_snapshot() {
            crate::infrastructure::store::SnapshotLoad::Loaded(snapshot) => {
                assert_eq!(snapshot.output_file, Some(out));
            }
            other => panic!("unexpected snapshot state: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_snapshot_save_removes_previous_snapshot() {
        use crate::infrastructure::store::SnapshotLoad;
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let device = MemoryDevice::new();

        let mut first = SerialSession::new(
            ConnectionDescriptor::new("COM4").unwrap().with_timeout(Duration::ZERO),
            Box::new(MemoryConnector::new(device.clone())),
            ConfigStore::new(dir.path().join("data")),
        );
        first.open().unwrap();
        first.close();

        // A non-UTF-8 output path cannot be encoded, so this snapshot save fails.
        let mut second = SerialSession::new(
            ConnectionDescriptor::new("COM7")
                .unwrap()
                .with_baud_rate(115200)
                .with_timeout(Duration::ZERO),
            Box::new(MemoryConnector::new(device.clone())),
            ConfigStore::new(dir.path().join("data")),
        );
        second.set_output_file(Some(PathBuf::from(OsStr::from_bytes(b"out-\xff.txt"))));
        second.open().unwrap();

        let store = ConfigStore::new(dir.path().join("data"));
        assert!(matches!(store.load_snapshot(), SnapshotLoad::Absent));
        let last = store.load_last().unwrap().unwrap();
        assert_eq!(last.port(), "COM7");
        assert_eq!(last.baud_rate, 115200);
    }
}
