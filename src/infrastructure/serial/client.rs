use crate::domain::{
    descriptor::ConnectionDescriptor,
    error::{SerialRwError, SerialRwResult},
};
use crate::infrastructure::serial::transport::{Connector, Transport};
use serde::Serialize;
use serialport::{SerialPort, SerialPortType};
use std::io::Read;
use tracing::{debug, info};

/// Transport backed by a hardware serial port
pub struct SerialClient {
    name: String,
    port: Box<dyn SerialPort>,
}

impl SerialClient {
    pub fn open(descriptor: &ConnectionDescriptor) -> SerialRwResult<Self> {
        let port = serialport::new(descriptor.port(), descriptor.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .timeout(descriptor.timeout)
            .open()
            .map_err(|e| SerialRwError::Connection {
                port: descriptor.port().to_string(),
                message: e.to_string(),
            })?;

        info!("Serial port {} opened at {} baud", descriptor.port(), descriptor.baud_rate);

        Ok(Self {
            name: descriptor.port().to_string(),
            port,
        })
    }
}

impl Transport for SerialClient {
    fn port_name(&self) -> &str {
        &self.name
    }

    fn bytes_available(&mut self) -> SerialRwResult<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Drop for SerialClient {
    fn drop(&mut self) {
        debug!("Serial port {} released", self.name);
    }
}

/// Connector that opens real serial ports
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortConnector;

impl Connector for SerialPortConnector {
    fn open(&self, descriptor: &ConnectionDescriptor) -> SerialRwResult<Box<dyn Transport>> {
        Ok(Box::new(SerialClient::open(descriptor)?))
    }
}

/// A serial port discovered on this machine
#[derive(Debug, Clone, Serialize, tabled::Tabled)]
pub struct PortListing {
    #[tabled(rename = "Port")]
    pub port: String,
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "Details")]
    pub details: String,
}

/// List serial ports, USB devices first
pub fn available_ports() -> SerialRwResult<Vec<PortListing>> {
    let mut ports: Vec<PortListing> = serialport::available_ports()?
        .into_iter()
        .map(|info| {
            let (kind, details) = match info.port_type {
                SerialPortType::UsbPort(usb) => {
                    let product = usb.product.unwrap_or_default();
                    let manufacturer = usb.manufacturer.unwrap_or_default();
                    let details = format!(
                        "{:04x}:{:04x} {} {}",
                        usb.vid, usb.pid, manufacturer, product
                    );
                    ("usb", details.trim_end().to_string())
                }
                SerialPortType::BluetoothPort => ("bluetooth", String::new()),
                SerialPortType::PciPort => ("pci", String::new()),
                SerialPortType::Unknown => ("unknown", String::new()),
            };
            PortListing {
                port: info.port_name,
                kind: kind.to_string(),
                details,
            }
        })
        .collect();

    ports.sort_by(|a, b| (a.kind != "usb", &a.port).cmp(&(b.kind != "usb", &b.port)));
    Ok(ports)
}
