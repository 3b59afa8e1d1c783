//! Cached descriptive state of the paired node.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api::{NetworkStatus, NodeConfiguration};
use crate::error::ModelError;

// ---------------------------------------------------------------------------
// NodeBalance
// ---------------------------------------------------------------------------

/// Wallet balance of the node.
///
/// # Examples
///
/// ```
/// use casanode_models::NodeBalance;
///
/// let balance: NodeBalance = "12.5 udvpn".parse().unwrap();
/// assert_eq!(balance.denom, "udvpn");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeBalance {
    /// Amount in `denom` units.
    pub amount: f64,
    /// Coin denomination.
    pub denom: String,
}

impl fmt::Display for NodeBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.denom)
    }
}

impl FromStr for NodeBalance {
    type Err = ModelError;

    /// Parse `"<amount> <denom>"`, ignoring anything after the denomination.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidBalance(s.to_string());

        let (number, rest) = s.split_once(char::is_whitespace).ok_or_else(invalid)?;

        let (int_part, frac_part) = match number.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (number, None),
        };
        let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || frac_part.is_some_and(|f| !all_digits(f)) {
            return Err(invalid());
        }

        let denom: String = rest.chars().take_while(char::is_ascii_alphabetic).collect();
        if denom.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            amount: number.parse().map_err(|_| invalid())?,
            denom,
        })
    }
}

// ---------------------------------------------------------------------------
// NodeSnapshot
// ---------------------------------------------------------------------------

/// Everything the client knows about the node after hydration.
///
/// Only [`is_hydrated`](Self::is_hydrated) is meaningful before a load has
/// completed; every other field may still hold its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Container run status, `unknown` until loaded.
    pub status: String,
    /// Connected peers.
    pub online_users: u32,

    /// Public IP of the node.
    pub node_ip: String,
    /// Human-readable location.
    pub node_location: String,
    /// Node API port.
    pub node_port: Option<u16>,
    /// VPN listening port.
    pub vpn_port: Option<u16>,
    /// Certificate expiration date.
    pub cert_expiry: String,
    /// Current upload speed.
    pub upload_speed: String,
    /// Current download speed.
    pub download_speed: String,

    /// Public node name.
    pub moniker: String,
    /// Node type.
    pub node_type: String,
    /// VPN protocol.
    pub vpn_type: String,
    /// Peer limit.
    pub maximum_peers: u32,

    /// Wallet balance.
    pub node_balance: NodeBalance,
    /// Wallet address.
    pub public_address: String,
    /// Node operator address.
    pub node_address: String,
    /// Recovery phrase, shown once after wallet creation.
    pub mnemonic: Vec<String>,

    /// Casanode software version.
    pub version: String,
    /// Host operating system.
    pub system_os: String,
    /// Host kernel version.
    pub system_kernel: String,
    /// Host CPU architecture.
    pub system_arch: String,
    /// Docker image running the node.
    pub docker_image: String,
    /// Host uptime in seconds.
    pub uptime: u64,
}

impl Default for NodeSnapshot {
    fn default() -> Self {
        Self {
            status: "unknown".to_string(),
            online_users: 0,
            node_ip: String::new(),
            node_location: String::new(),
            node_port: None,
            vpn_port: None,
            cert_expiry: String::new(),
            upload_speed: String::new(),
            download_speed: String::new(),
            moniker: String::new(),
            node_type: String::new(),
            vpn_type: String::new(),
            maximum_peers: 0,
            node_balance: NodeBalance::default(),
            public_address: String::new(),
            node_address: String::new(),
            mnemonic: Vec::new(),
            version: String::new(),
            system_os: String::new(),
            system_kernel: String::new(),
            system_arch: String::new(),
            docker_image: String::new(),
            uptime: 0,
        }
    }
}

impl NodeSnapshot {
    /// A snapshot counts as loaded once the node IP or moniker is known.
    pub fn is_hydrated(&self) -> bool {
        !self.node_ip.is_empty() || !self.moniker.is_empty()
    }

    /// Copy the configuration fields.
    pub fn apply_configuration(&mut self, config: &NodeConfiguration) {
        self.moniker = config.moniker.clone().unwrap_or_default();
        self.node_ip = config.node_ip.clone().unwrap_or_default();
        self.node_port = config.node_port;
        self.vpn_type = config.vpn_type.clone().unwrap_or_default();
        self.vpn_port = config.vpn_port;
        self.docker_image = config.docker_image.clone().unwrap_or_default();
        self.node_type = config.node_type.clone().unwrap_or_default();
        self.maximum_peers = config.maximum_peers.unwrap_or_default();
    }

    /// Copy the run status and the host/node status fields.
    pub fn apply_status(&mut self, run_status: Option<&str>, status: &NetworkStatus) {
        self.status = run_status.unwrap_or("unknown").to_string();
        self.node_location = status.node_location.clone().unwrap_or_default();
        self.cert_expiry = status
            .certificate
            .as_ref()
            .and_then(|c| c.expiration_date.clone())
            .unwrap_or_default();

        let node = status.status.as_ref();
        self.online_users = node.and_then(|s| s.peers).unwrap_or_default();
        let bandwidth = node.and_then(|s| s.bandwidth.as_ref());
        self.upload_speed = bandwidth
            .and_then(|b| b.upload.clone())
            .unwrap_or_default();
        self.download_speed = bandwidth
            .and_then(|b| b.download.clone())
            .unwrap_or_default();

        self.uptime = status.uptime.unwrap_or_default();
        self.version = status.version.clone().unwrap_or_default();
        self.system_os = status.system_os.clone().unwrap_or_default();
        self.system_arch = status.system_arch.clone().unwrap_or_default();
        self.system_kernel = status.system_kernel.clone().unwrap_or_default();
    }
}
