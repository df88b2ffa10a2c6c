//! Binary session snapshot.
//!
//! Layout:
//! - 4 bytes: magic `SRWS`
//! - 1 byte: format version
//! - 4 bytes: CRC32 of the payload (little-endian)
//! - N bytes: postcard-encoded [`SessionSnapshot`]
//!
//! The snapshot is a cache. Readers treat any decoding problem as "no
//! snapshot" and fall back to the JSON record.

use crate::domain::descriptor::ConnectionDescriptor;
use crate::domain::error::{SerialRwError, SerialRwResult};
use chrono::{DateTime, Utc};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

const MAGIC: &[u8; 4] = b"SRWS";
pub const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1 + 4;

/// Full state of a session at the time it was saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    pub display_to_console: bool,
    pub last_connected: DateTime<Utc>,
    pub output_file: Option<PathBuf>,
    pub lines_received: u64,
}

impl SessionSnapshot {
    pub fn to_descriptor(&self) -> SerialRwResult<ConnectionDescriptor> {
        let mut descriptor = ConnectionDescriptor::new(self.port.clone())?
            .with_baud_rate(self.baud_rate)
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_display(self.display_to_console);
        descriptor.last_connected = Some(self.last_connected);
        Ok(descriptor)
    }
}

/// Why a snapshot could not be read
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is {0} bytes, shorter than its header")]
    Truncated(usize),
    #[error("snapshot magic mismatch")]
    BadMagic,
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u8),
    #[error("snapshot checksum mismatch (expected {expected:08x}, found {actual:08x})")]
    Checksum { expected: u32, actual: u32 },
    #[error("snapshot payload could not be decoded: {0}")]
    Decode(#[from] postcard::Error),
}

pub fn encode(snapshot: &SessionSnapshot) -> SerialRwResult<Vec<u8>> {
    let payload = postcard::to_stdvec(snapshot).map_err(|e| SerialRwError::Config {
        message: format!("Failed to encode session snapshot: {}", e),
    })?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.push(FORMAT_VERSION);
    bytes.extend_from_slice(&checksum(&payload).to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

pub fn decode(bytes: &[u8]) -> Result<SessionSnapshot, SnapshotError> {
    if bytes.len() < HEADER_LEN {
        return Err(SnapshotError::Truncated(bytes.len()));
    }
    if &bytes[..4] != MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    if bytes[4] != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(bytes[4]));
    }

    let expected = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);
    let payload = &bytes[HEADER_LEN..];
    let actual = checksum(payload);
    if expected != actual {
        return Err(SnapshotError::Checksum { expected, actual });
    }

    Ok(postcard::from_bytes(payload)?)
}

fn checksum(payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}
