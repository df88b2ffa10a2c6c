//! In-memory transport for dry runs and tests.
//!
//! A [`MemoryDevice`] is a script of chunks. Each poll of
//! [`Transport::bytes_available`] looks at the front chunk: an empty chunk is
//! an idle cycle and is consumed by that poll, a non-empty chunk is handed out
//! by subsequent reads.

use crate::domain::{
    descriptor::ConnectionDescriptor,
    error::{SerialRwError, SerialRwResult},
};
use crate::infrastructure::serial::transport::{Connector, Transport};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct DeviceState {
    chunks: VecDeque<Vec<u8>>,
    failure: Option<io::ErrorKind>,
    open_handles: usize,
    opens: usize,
}

/// Handle to a simulated device; clones share the same script
#[derive(Clone, Default)]
pub struct MemoryDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MemoryDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue raw bytes delivered on one poll
    pub fn push_bytes(&self, bytes: impl Into<Vec<u8>>) {
        self.lock().chunks.push_back(bytes.into());
    }

    /// Queue a newline-terminated line
    pub fn push_line(&self, line: &str) {
        self.push_bytes(format!("{line}\n"));
    }

    /// Queue one poll cycle with no data
    pub fn push_idle(&self) {
        self.lock().chunks.push_back(Vec::new());
    }

    /// Make every following transport call fail, like an unplugged cable
    pub fn fail_with(&self, kind: io::ErrorKind) {
        self.lock().failure = Some(kind);
    }

    /// Transports currently open against this device
    pub fn open_handles(&self) -> usize {
        self.lock().open_handles
    }

    /// Total successful opens
    pub fn opens(&self) -> usize {
        self.lock().opens
    }
}

pub struct MemoryTransport {
    name: String,
    device: MemoryDevice,
}

impl Transport for MemoryTransport {
    fn port_name(&self) -> &str {
        &self.name
    }

    fn bytes_available(&mut self) -> SerialRwResult<usize> {
        let mut state = self.device.lock();
        if let Some(kind) = state.failure {
            return Err(io::Error::new(kind, "simulated device failure").into());
        }
        match state.chunks.front() {
            Some(chunk) if chunk.is_empty() => {
                state.chunks.pop_front();
                Ok(0)
            }
            Some(chunk) => Ok(chunk.len()),
            None => Ok(0),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.device.lock();
        if let Some(kind) = state.failure {
            return Err(io::Error::new(kind, "simulated device failure"));
        }
        let Some(chunk) = state.chunks.front_mut() else {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        };
        let n = buf.len().min(chunk.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        chunk.drain(..n);
        if chunk.is_empty() {
            state.chunks.pop_front();
        }
        Ok(n)
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        let mut state = self.device.lock();
        state.open_handles = state.open_handles.saturating_sub(1);
    }
}

/// Connector that hands out transports over one [`MemoryDevice`]
#[derive(Clone, Default)]
pub struct MemoryConnector {
    device: MemoryDevice,
}

impl MemoryConnector {
    pub fn new(device: MemoryDevice) -> Self {
        Self { device }
    }
}

impl Connector for MemoryConnector {
    fn open(&self, descriptor: &ConnectionDescriptor) -> SerialRwResult<Box<dyn Transport>> {
        {
            let mut state = self.device.lock();
            state.open_handles += 1;
            state.opens += 1;
        }
        Ok(Box::new(MemoryTransport {
            name: descriptor.port().to_string(),
            device: self.device.clone(),
        }))
    }
}

/// Connector whose open always fails
#[derive(Debug, Clone)]
pub struct UnavailableConnector {
    reason: String,
}

impl UnavailableConnector {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Connector for UnavailableConnector {
    fn open(&self, descriptor: &ConnectionDescriptor) -> SerialRwResult<Box<dyn Transport>> {
        Err(SerialRwError::Connection {
            port: descriptor.port().to_string(),
            message: self.reason.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_are_delivered_in_order() {
        let device = MemoryDevice::new();
        device.push_bytes(b"ab".to_vec());
        device.push_idle();
        device.push_bytes(b"c".to_vec());

        let descriptor = ConnectionDescriptor::new("mem0").unwrap();
        let mut transport = MemoryConnector::new(device.clone()).open(&descriptor).unwrap();
        let mut buf = [0u8; 8];

        assert_eq!(transport.bytes_available().unwrap(), 2);
        assert_eq!(transport.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ab");
        assert_eq!(transport.bytes_available().unwrap(), 0);
        assert_eq!(transport.bytes_available().unwrap(), 1);
        assert_eq!(transport.read(&mut buf).unwrap(), 1);
        assert_eq!(transport.bytes_available().unwrap(), 0);
    }

    #[test]
    fn test_open_handles_tracked() {
        let device = MemoryDevice::new();
        let connector = MemoryConnector::new(device.clone());
        let descriptor = ConnectionDescriptor::new("mem0").unwrap();

        let transport = connector.open(&descriptor).unwrap();
        assert_eq!(device.open_handles(), 1);
        drop(transport);
        assert_eq!(device.open_handles(), 0);
        assert_eq!(device.opens(), 1);
    }

    #[test]
    fn test_unavailable_connector_names_port() {
        let descriptor = ConnectionDescriptor::new("/dev/fake0").unwrap();
        let err = UnavailableConnector::new("busy").open(&descriptor).err().unwrap();
        assert!(err.to_string().contains("/dev/fake0"));
        assert!(err.to_string().contains("busy"));
    }
}
