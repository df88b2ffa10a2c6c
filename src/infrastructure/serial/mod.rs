// Serial module - Serial transport implementation
pub mod client;
pub mod memory;
pub mod transport;

pub use client::{available_ports, PortListing, SerialClient, SerialPortConnector};
pub use memory::{MemoryConnector, MemoryDevice, UnavailableConnector};
pub use transport::{Connector, Transport};
