//! Paired device registry entries.

use serde::{Deserialize, Serialize};

/// A node the client has paired with at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Stable identifier (derived from the API base URL).
    pub uuid: String,
    /// Display name (claim device id or moniker).
    pub name: String,
    /// API host.
    pub host: String,
    /// API port.
    pub port: u16,
}
