use crate::domain::descriptor::ConnectionDescriptor;
use crate::infrastructure::store::snapshot::SessionSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Human-readable record of the last successful connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub port: String,
    pub baud_rate: u32,
    pub last_connected: DateTime<Utc>,
}

impl ConnectionRecord {
    pub fn from_descriptor(descriptor: &ConnectionDescriptor) -> Self {
        Self {
            port: descriptor.port().to_string(),
            baud_rate: descriptor.baud_rate,
            last_connected: descriptor.last_connected.unwrap_or_else(Utc::now),
        }
    }

    /// Whether `snapshot` was taken for the connection this record describes
    pub fn matches(&self, snapshot: &SessionSnapshot) -> bool {
        self.port == snapshot.port
            && self.baud_rate == snapshot.baud_rate
            && self.last_connected == snapshot.last_connected
    }
}
