//! Ephemeral connection parameters.
//!
//! Host, port and pairing token of the current run only. Nothing here is
//! ever written to disk; a restarted client starts from the environment
//! defaults again.

use std::sync::{PoisonError, RwLock};

use crate::config::SdkConfig;

/// Where the client is (or is about to be) connected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionParameters {
    /// API host.
    pub host: Option<String>,
    /// API port.
    pub port: Option<u16>,
    /// Pre-shared token used for the login exchange.
    pub pairing_token: Option<String>,
}

/// Memory-only holder of the [`ConnectionParameters`].
#[derive(Debug, Default)]
pub struct ConnectionStore {
    params: RwLock<ConnectionParameters>,
}

impl ConnectionStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with the environment-provided pairing token.
    pub fn from_config(config: &SdkConfig) -> Self {
        Self {
            params: RwLock::new(ConnectionParameters {
                pairing_token: config.api_token.clone(),
                ..ConnectionParameters::default()
            }),
        }
    }

    /// Copy of the current parameters.
    pub fn get(&self) -> ConnectionParameters {
        self.params
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Merge new values. `None` keeps the existing host / port / token, and
    /// port 0 is treated as absent.
    pub fn set(&self, host: Option<&str>, port: Option<u16>, pairing_token: Option<&str>) {
        let mut params = self.params.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(host) = host.filter(|h| !h.is_empty()) {
            params.host = Some(host.to_string());
        }
        if let Some(port) = port.filter(|p| *p > 0) {
            params.port = Some(port);
        }
        if let Some(token) = pairing_token {
            params.pairing_token = Some(token.to_string());
        }
    }

    /// Forget everything.
    pub fn clear(&self) {
        *self.params.write().unwrap_or_else(PoisonError::into_inner) =
            ConnectionParameters::default();
    }
}
