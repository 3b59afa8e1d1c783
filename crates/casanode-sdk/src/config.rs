//! Client configuration.
//!
//! Built once at startup from environment variables and handed to
//! [`Session::open`](crate::Session::open).

use std::path::PathBuf;
use std::time::Duration;

/// Default API port of a Casanode device.
pub const DEFAULT_API_PORT: u16 = 8443;

/// Default proactive refresh margin (60 s before expiry).
pub const DEFAULT_REFRESH_MARGIN_MS: i64 = 60_000;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const APP_DIR: &str = "casanode";
const CREDENTIALS_FILE: &str = "auth.json";
const DEVICES_FILE: &str = "devices.json";

/// Global client configuration.
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Development base URL (e.g. `http://localhost:8443/api/v1`). The
    /// transport is configured with it but only counts as connected once a
    /// bearer token is set.
    pub api_base_url: Option<String>,
    /// Pre-shared login token used when a claim carries none.
    pub api_token: Option<String>,
    /// API port used when a claim carries none.
    pub api_port: u16,
    /// URL scheme of the node API (`https` on real devices).
    pub api_scheme: String,
    /// Refresh this many milliseconds before the bearer expires.
    pub refresh_margin_ms: i64,
    /// Directory for the durable stores; `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Accept the self-signed certificate of a LAN device.
    pub accept_invalid_certs: bool,
    /// Per-request timeout of the transport.
    pub http_timeout: Duration,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_token: None,
            api_port: DEFAULT_API_PORT,
            api_scheme: "https".to_string(),
            refresh_margin_ms: DEFAULT_REFRESH_MARGIN_MS,
            data_dir: None,
            accept_invalid_certs: false,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl SdkConfig {
    /// Build the configuration from environment variables.
    ///
    /// | Variable                        | Default                       | Description                          |
    /// |---------------------------------|-------------------------------|--------------------------------------|
    /// | `CASANODE_API_BASE_URL`         | unset                         | Development base URL                 |
    /// | `CASANODE_API_TOKEN`            | unset                         | Default pre-shared login token       |
    /// | `CASANODE_API_PORT`             | `8443`                        | API port when the claim has none     |
    /// | `CASANODE_API_SCHEME`           | `https`                       | URL scheme of the node API           |
    /// | `CASANODE_REFRESH_MARGIN_MS`    | `60000`                       | Proactive refresh margin             |
    /// | `CASANODE_DATA_DIR`             | `<config dir>/casanode`       | Durable store directory              |
    /// | `CASANODE_ACCEPT_INVALID_CERTS` | `false`                       | Accept self-signed certificates      |
    /// | `CASANODE_HTTP_TIMEOUT_SECS`    | `15`                          | Transport request timeout            |
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        Self {
            api_base_url: non_empty("CASANODE_API_BASE_URL"),
            api_token: non_empty("CASANODE_API_TOKEN"),
            api_port: non_empty("CASANODE_API_PORT")
                .and_then(|v| v.parse().ok())
                .filter(|p| *p > 0)
                .unwrap_or(defaults.api_port),
            api_scheme: non_empty("CASANODE_API_SCHEME").unwrap_or(defaults.api_scheme),
            refresh_margin_ms: non_empty("CASANODE_REFRESH_MARGIN_MS")
                .and_then(|v| v.parse().ok())
                .filter(|m| *m >= 0)
                .unwrap_or(defaults.refresh_margin_ms),
            data_dir: non_empty("CASANODE_DATA_DIR")
                .map(PathBuf::from)
                .or_else(|| dirs::config_dir().map(|d| d.join(APP_DIR))),
            accept_invalid_certs: non_empty("CASANODE_ACCEPT_INVALID_CERTS")
                .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
            http_timeout: non_empty("CASANODE_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map_or(defaults.http_timeout, Duration::from_secs),
        }
    }

    /// Location of the durable credential store.
    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|d| d.join(CREDENTIALS_FILE))
    }

    /// Location of the paired device registry.
    pub fn devices_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|d| d.join(DEVICES_FILE))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> SdkConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        SdkConfig::from_vars(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        let cfg = config_from(&[]);
        assert_eq!(cfg.api_port, 8443);
        assert_eq!(cfg.api_scheme, "https");
        assert_eq!(cfg.refresh_margin_ms, 60_000);
        assert!(cfg.api_base_url.is_none());
        assert!(!cfg.accept_invalid_certs);
        assert_eq!(cfg.http_timeout, Duration::from_secs(15));
    }

    #[test]
    fn variables_override_defaults() {
        let cfg = config_from(&[
            ("CASANODE_API_PORT", "9443"),
            ("CASANODE_API_SCHEME", "http"),
            ("CASANODE_REFRESH_MARGIN_MS", "5000"),
            ("CASANODE_DATA_DIR", "/tmp/casanode-test"),
            ("CASANODE_ACCEPT_INVALID_CERTS", "true"),
            ("CASANODE_API_TOKEN", "abc"),
        ]);
        assert_eq!(cfg.api_port, 9443);
        assert_eq!(cfg.api_scheme, "http");
        assert_eq!(cfg.refresh_margin_ms, 5000);
        assert!(cfg.accept_invalid_certs);
        assert_eq!(cfg.api_token.as_deref(), Some("abc"));
        assert_eq!(
            cfg.credentials_path(),
            Some(PathBuf::from("/tmp/casanode-test/auth.json"))
        );
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = config_from(&[
            ("CASANODE_API_PORT", "0"),
            ("CASANODE_REFRESH_MARGIN_MS", "-1"),
            ("CASANODE_API_BASE_URL", "  "),
        ]);
        assert_eq!(cfg.api_port, 8443);
        assert_eq!(cfg.refresh_margin_ms, 60_000);
        assert!(cfg.api_base_url.is_none());
    }

    #[test]
    fn in_memory_config_has_no_paths() {
        let cfg = SdkConfig::default();
        assert!(cfg.credentials_path().is_none());
        assert!(cfg.devices_path().is_none());
    }
}
