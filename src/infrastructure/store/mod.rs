//! Persistence of the last connection.
//!
//! Two artifacts live in the data directory: the JSON record
//! (`config.json`), which is the durable contract, and the binary session
//! snapshot (`session.snapshot`), which is a best-effort cache.

pub mod record;
pub mod snapshot;

pub use record::ConnectionRecord;
pub use snapshot::{SessionSnapshot, SnapshotError};

use crate::domain::{
    descriptor::ConnectionDescriptor,
    error::{SerialRwError, SerialRwResult},
};
use std::cell::OnceCell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const RECORD_FILE: &str = "config.json";
pub const SNAPSHOT_FILE: &str = "session.snapshot";

/// Outcome of reading the snapshot
#[derive(Debug)]
pub enum SnapshotLoad {
    Loaded(SessionSnapshot),
    Absent,
    Corrupt(SnapshotError),
}

/// Reads and writes the persisted connection record and snapshot.
///
/// Paths are resolved against the working directory the first time they are
/// used and stay fixed for the lifetime of the store.
#[derive(Debug)]
pub struct ConfigStore {
    data_dir: PathBuf,
    record_path: OnceCell<PathBuf>,
    snapshot_path: OnceCell<PathBuf>,
}

impl ConfigStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            record_path: OnceCell::new(),
            snapshot_path: OnceCell::new(),
        }
    }

    /// Location of the JSON record
    pub fn record_path(&self) -> SerialRwResult<&Path> {
        resolve(&self.record_path, &self.data_dir, RECORD_FILE)
    }

    /// Location of the binary snapshot
    pub fn snapshot_path(&self) -> SerialRwResult<&Path> {
        resolve(&self.snapshot_path, &self.data_dir, SNAPSHOT_FILE)
    }

    /// Write the record for `descriptor`, replacing any previous one
    pub fn save_record(&self, descriptor: &ConnectionDescriptor) -> SerialRwResult<()> {
        let path = self.record_path()?;
        ensure_parent(path)?;

        let record = ConnectionRecord::from_descriptor(descriptor);
        let content = serde_json::to_string_pretty(&record).map_err(|e| SerialRwError::Config {
            message: format!("Failed to serialize connection record: {}", e),
        })?;

        fs::write(path, content).map_err(|e| SerialRwError::Config {
            message: format!("Failed to write connection record {}: {}", path.display(), e),
        })?;

        info!("Saved connection record to {}", path.display());
        Ok(())
    }

    /// Write the binary snapshot, replacing any previous one
    pub fn save_snapshot(&self, snapshot: &SessionSnapshot) -> SerialRwResult<()> {
        let path = self.snapshot_path()?;
        ensure_parent(path)?;

        let bytes = snapshot::encode(snapshot)?;
        fs::write(path, bytes).map_err(|e| SerialRwError::Config {
            message: format!("Failed to write session snapshot {}: {}", path.display(), e),
        })?;

        debug!("Saved session snapshot to {}", path.display());
        Ok(())
    }

    /// Read the snapshot. Never fails; problems come back as `Absent` or
    /// `Corrupt`.
    pub fn load_snapshot(&self) -> SnapshotLoad {
        let path = match self.snapshot_path() {
            Ok(path) => path,
            Err(e) => {
                warn!("Cannot locate session snapshot: {}", e);
                return SnapshotLoad::Absent;
            }
        };

        match fs::read(path) {
            Ok(bytes) => match snapshot::decode(&bytes) {
                Ok(snapshot) => SnapshotLoad::Loaded(snapshot),
                Err(e) => SnapshotLoad::Corrupt(e),
            },
            Err(e) if e.kind() == ErrorKind::NotFound => SnapshotLoad::Absent,
            Err(e) => {
                warn!("Cannot read session snapshot {}: {}", path.display(), e);
                SnapshotLoad::Absent
            }
        }
    }

    /// Read the JSON record, `None` if it was never written
    pub fn load_record(&self) -> SerialRwResult<Option<ConnectionRecord>> {
        let path = self.record_path()?;
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SerialRwError::Config {
                    message: format!("Failed to read connection record {}: {}", path.display(), e),
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| SerialRwError::Config {
                message: format!("Failed to parse connection record {}: {}", path.display(), e),
            })
    }

    /// Remove the snapshot so a stale one cannot outlive a failed save
    pub fn discard_snapshot(&self) -> SerialRwResult<()> {
        let path = self.snapshot_path()?;
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("Removed session snapshot {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SerialRwError::Config {
                message: format!("Failed to remove session snapshot {}: {}", path.display(), e),
            }),
        }
    }

    /// Recover the last connection: snapshot first, then the record.
    ///
    /// A snapshot is only used when it describes the same connection as the
    /// record (port, baud rate and connect time). From the record only port
    /// and baud rate are recovered.
    pub fn load_last(&self) -> SerialRwResult<Option<ConnectionDescriptor>> {
        let record = self.load_record()?;

        match self.load_snapshot() {
            SnapshotLoad::Loaded(snapshot) => match &record {
                Some(record) if !record.matches(&snapshot) => {
                    warn!(
                        "Ignoring stale session snapshot for {} @ {} baud; record is {} @ {} baud",
                        snapshot.port, snapshot.baud_rate, record.port, record.baud_rate
                    );
                }
                _ => match snapshot.to_descriptor() {
                    Ok(descriptor) => {
                        debug!("Restored last connection from snapshot");
                        return Ok(Some(descriptor));
                    }
                    Err(e) => warn!("Ignoring session snapshot: {}", e),
                },
            },
            SnapshotLoad::Corrupt(e) => warn!("Ignoring session snapshot: {}", e),
            SnapshotLoad::Absent => {}
        }

        match record {
            Some(record) => {
                debug!("Restored last connection from record");
                Ok(Some(
                    ConnectionDescriptor::new(record.port)?.with_baud_rate(record.baud_rate),
                ))
            }
            None => Ok(None),
        }
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

fn resolve<'a>(cell: &'a OnceCell<PathBuf>, data_dir: &Path, file: &str) -> SerialRwResult<&'a Path> {
    if let Some(path) = cell.get() {
        return Ok(path);
    }

    let dir = if data_dir.is_absolute() {
        data_dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| SerialRwError::Config {
                message: format!("Failed to get current directory: {}", e),
            })?
            .join(data_dir)
    };

    Ok(cell.get_or_init(|| dir.join(file)))
}

fn ensure_parent(path: &Path) -> SerialRwResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SerialRwError::Config {
            message: format!("Failed to create data directory {}: {}", parent.display(), e),
        })?;
    }
    Ok(())
}
