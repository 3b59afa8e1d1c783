//! Response shapes of the node management API (`/api/v1`).
//!
//! Every field the node may omit is optional and defaulted, so partially
//! installed nodes (no certificate yet, no wallet) still deserialize.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Tokens returned by a login or refresh exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    /// Bearer credential presented on authenticated requests.
    pub token: String,
    /// Long-lived refresh token, when the node issues one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry of `token` in milliseconds since the Unix epoch, when reported.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

// ---------------------------------------------------------------------------
// Node configuration (`GET /node/configuration`)
// ---------------------------------------------------------------------------

/// Node configuration as stored on the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeConfiguration {
    /// Public node name.
    pub moniker: Option<String>,
    /// Keyring backend.
    pub backend: Option<String>,
    /// Node type (e.g. `residential`, `datacenter`).
    pub node_type: Option<String>,
    /// Public IP of the node.
    pub node_ip: Option<String>,
    /// Node API port.
    pub node_port: Option<u16>,
    /// VPN protocol (`wireguard`, `v2ray`).
    pub vpn_type: Option<String>,
    /// VPN listening port.
    pub vpn_port: Option<u16>,
    /// Maximum number of concurrent peers.
    pub maximum_peers: Option<u32>,
    /// Docker image running the node.
    pub docker_image: Option<String>,
}

// ---------------------------------------------------------------------------
// Status (`GET /status`, `GET /node/status`)
// ---------------------------------------------------------------------------

/// Body of `GET /node/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeRunStatus {
    /// Container run status (`running`, `stopped`, ...).
    pub status: Option<String>,
}

/// Upload / download bandwidth as human-readable strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bandwidth {
    /// Download speed.
    pub download: Option<String>,
    /// Upload speed.
    pub upload: Option<String>,
}

/// Handshake DNS settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Handshake {
    /// Whether handshake is enabled.
    pub enable: Option<bool>,
    /// Handshake peer count.
    pub peers: Option<u32>,
}

/// Geographic location reported by the node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    /// City name.
    pub city: Option<String>,
    /// Country name.
    pub country: Option<String>,
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
}

/// Status of the VPN node process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStatus {
    /// Numeric node type.
    #[serde(rename = "type")]
    pub node_type: Option<i64>,
    /// Node software version.
    pub version: Option<String>,
    /// Current bandwidth.
    pub bandwidth: Option<Bandwidth>,
    /// Handshake settings.
    pub handshake: Option<Handshake>,
    /// Node location.
    pub location: Option<Location>,
    /// Connected peers.
    pub peers: Option<u32>,
    /// Peer limit.
    pub max_peers: Option<u32>,
}

/// TLS certificate of the node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificateInfo {
    /// Creation date.
    pub creation_date: Option<String>,
    /// Expiration date.
    pub expiration_date: Option<String>,
    /// Certificate issuer.
    pub issuer: Option<String>,
    /// Certificate subject.
    pub subject: Option<String>,
}

/// Body of `GET /status`: host system and node process information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkStatus {
    /// Casanode software version.
    pub version: Option<String>,
    /// Host uptime in seconds.
    pub uptime: Option<u64>,
    /// Human-readable node location.
    pub node_location: Option<String>,
    /// Host CPU architecture.
    pub system_arch: Option<String>,
    /// Host kernel version.
    pub system_kernel: Option<String>,
    /// Host operating system.
    pub system_os: Option<String>,
    /// Node process status; absent on fresh installs.
    pub status: Option<NodeStatus>,
    /// Node certificate; absent on fresh installs.
    pub certificate: Option<CertificateInfo>,
}

// ---------------------------------------------------------------------------
// Installation / passphrase
// ---------------------------------------------------------------------------

/// Body of `GET /check/installation`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstallationCheck {
    /// Docker image pulled.
    pub image: bool,
    /// Node container created.
    pub container_exists: bool,
    /// Node configuration written.
    pub node_config: bool,
    /// VPN configuration written.
    pub vpn_config: bool,
    /// Certificate key generated.
    pub certificate_key: bool,
    /// Wallet created or restored.
    pub wallet: bool,
}

impl InstallationCheck {
    /// Whether the node can be managed without going through onboarding.
    pub fn is_complete(&self) -> bool {
        self.image && self.wallet
    }
}

/// Body of `GET /node/passphrase`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassphraseStatus {
    /// The keyring is protected by a passphrase.
    pub required: bool,
    /// The passphrase has been supplied to the node.
    pub available: bool,
}

impl PassphraseStatus {
    /// A passphrase is required but has not been supplied yet.
    pub fn blocks_access(&self) -> bool {
        self.required && !self.available
    }
}
