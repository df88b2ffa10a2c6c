use crate::domain::{descriptor::ConnectionDescriptor, error::SerialRwResult};
use std::sync::Arc;

/// One open byte channel to a device.
///
/// Dropping the transport closes it.
pub trait Transport: Send {
    /// Name of the underlying port
    fn port_name(&self) -> &str;

    /// Number of bytes buffered and ready to read without blocking
    fn bytes_available(&mut self) -> SerialRwResult<usize>;

    /// Read up to `buf.len()` bytes
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// Opens transports for a descriptor
pub trait Connector: Send + Sync {
    fn open(&self, descriptor: &ConnectionDescriptor) -> SerialRwResult<Box<dyn Transport>>;
}

impl<C: Connector + ?Sized> Connector for Arc<C> {
    fn open(&self, descriptor: &ConnectionDescriptor) -> SerialRwResult<Box<dyn Transport>> {
        (**self).open(descriptor)
    }
}
