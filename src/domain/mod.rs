// Domain module - Core types shared across layers
pub mod config;
pub mod descriptor;
pub mod error;

pub use config::SerialRwConfig;
pub use descriptor::ConnectionDescriptor;
pub use error::{SerialRwError, SerialRwResult};
