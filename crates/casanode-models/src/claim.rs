//! Pairing payload carried by a node's claim QR code.
//!
//! A claim deep link looks like
//! `https://casanode.app/claim?device=<id>&code=<code>&ap=<ssid>&pw=<pass>&host=<ip>&fp=<fp>`.
//! [`ClaimPayload::parse`] turns it into a structured value; nothing else
//! constructs one except the development fixture loader.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ModelError;

/// Host used when the claim link carries no `host` parameter.
pub const DEFAULT_CLAIM_HOST: &str = "192.168.50.1";

/// API port assumed by development fixtures that do not carry a usable one.
pub const DEFAULT_DEV_API_PORT: u16 = 8443;

/// Device identifier assumed by development fixtures without a `device` field.
const DEFAULT_DEV_DEVICE: &str = "dev-node";

/// Structured pairing intent extracted from a scanned or deep-linked URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPayload {
    /// Device identifier (`device`).
    pub device_id: String,
    /// One-time claim code (`code`).
    pub claim_code: String,
    /// Access point SSID broadcast by the node (`ap`).
    pub ap_ssid: String,
    /// Access point passphrase (`pw`).
    pub ap_passphrase: String,
    /// API host (`host`), [`DEFAULT_CLAIM_HOST`] when absent.
    pub host: String,
    /// TLS certificate fingerprint (`fp`).
    pub fingerprint: Option<String>,
    /// Pre-shared API token, only set by development fixtures.
    pub dev_auth_token: Option<String>,
    /// API port, only set by development fixtures.
    pub dev_api_port: Option<u16>,
}

impl ClaimPayload {
    /// Parse a claim deep link.
    ///
    /// Missing parameters become empty strings (`host` falls back to
    /// [`DEFAULT_CLAIM_HOST`]). The only failure is an input that is not a
    /// URL at all.
    ///
    /// # Examples
    ///
    /// ```
    /// use casanode_models::ClaimPayload;
    ///
    /// let claim = ClaimPayload::parse("https://x/?device=d1&code=c1&ap=A&pw=P").unwrap();
    /// assert_eq!(claim.device_id, "d1");
    /// assert_eq!(claim.host, "192.168.50.1");
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let url = Url::parse(raw).map_err(|e| ModelError::MalformedClaim {
            value: raw.to_string(),
            reason: e.to_string(),
        })?;

        let param = |key: &str| -> Option<String> {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            device_id: param("device").unwrap_or_default(),
            claim_code: param("code").unwrap_or_default(),
            ap_ssid: param("ap").unwrap_or_default(),
            ap_passphrase: param("pw").unwrap_or_default(),
            host: param("host").unwrap_or_else(|| DEFAULT_CLAIM_HOST.to_string()),
            fingerprint: param("fp"),
            dev_auth_token: None,
            dev_api_port: None,
        })
    }

    /// Build a payload from a development QR fixture.
    ///
    /// Accepted shapes:
    ///
    /// * a JSON string holding a claim URL,
    /// * `{ "raw": "<claim url>" }`,
    /// * `{ "ip": "...", "apiPort": 8443 | "8443", "authToken": "...", "device": "..." }`.
    pub fn from_dev_fixture(fixture: &serde_json::Value) -> Result<Self, ModelError> {
        if let Some(raw) = fixture.as_str() {
            return Self::parse(raw);
        }

        let Some(obj) = fixture.as_object() else {
            return Err(ModelError::UnrecognizedFixture(fixture.to_string()));
        };

        if let Some(raw) = obj.get("raw").and_then(|v| v.as_str()) {
            return Self::parse(raw);
        }

        let ip = obj.get("ip").and_then(|v| v.as_str());
        let port = match obj.get("apiPort") {
            Some(serde_json::Value::Number(n)) => Some(n.as_u64()),
            Some(serde_json::Value::String(s)) => Some(s.trim().parse::<u64>().ok()),
            _ => None,
        };

        match (ip, port) {
            (Some(ip), Some(port)) => Ok(Self {
                device_id: obj
                    .get("device")
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
                    .unwrap_or(DEFAULT_DEV_DEVICE)
                    .to_string(),
                claim_code: String::new(),
                ap_ssid: String::new(),
                ap_passphrase: String::new(),
                host: ip.to_string(),
                fingerprint: None,
                dev_auth_token: obj
                    .get("authToken")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                dev_api_port: Some(
                    port.and_then(|p| u16::try_from(p).ok())
                        .unwrap_or(DEFAULT_DEV_API_PORT),
                ),
            }),
            _ => Err(ModelError::UnrecognizedFixture(fixture.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_full_claim() {
        let claim =
            ClaimPayload::parse("https://x/?device=d1&code=c1&ap=A&pw=P&host=10.0.0.1").unwrap();
        assert_eq!(claim.device_id, "d1");
        assert_eq!(claim.claim_code, "c1");
        assert_eq!(claim.ap_ssid, "A");
        assert_eq!(claim.ap_passphrase, "P");
        assert_eq!(claim.host, "10.0.0.1");
        assert_eq!(claim.fingerprint, None);
        assert_eq!(claim.dev_auth_token, None);
        assert_eq!(claim.dev_api_port, None);
    }

    #[test]
    fn parse_defaults_host() {
        let claim = ClaimPayload::parse("https://x/?device=d1&code=c1&ap=A&pw=P").unwrap();
        assert_eq!(claim.host, DEFAULT_CLAIM_HOST);
    }

    #[test]
    fn parse_empty_host_falls_back_to_default() {
        let claim = ClaimPayload::parse("https://x/?device=d1&host=").unwrap();
        assert_eq!(claim.host, DEFAULT_CLAIM_HOST);
    }

    #[test]
    fn parse_keeps_fingerprint() {
        let claim = ClaimPayload::parse("https://x/?device=d1&fp=AB%3ACD").unwrap();
        assert_eq!(claim.fingerprint.as_deref(), Some("AB:CD"));
    }

    #[test]
    fn parse_missing_params_are_empty() {
        let claim = ClaimPayload::parse("casanode://claim").unwrap();
        assert!(claim.device_id.is_empty());
        assert!(claim.claim_code.is_empty());
        assert!(claim.ap_ssid.is_empty());
        assert!(claim.ap_passphrase.is_empty());
    }

    #[test]
    fn parse_rejects_non_url() {
        let err = ClaimPayload::parse("device=d1&code=c1").unwrap_err();
        assert!(matches!(err, ModelError::MalformedClaim { .. }));
    }

    #[test]
    fn fixture_string_is_parsed_as_url() {
        let claim = ClaimPayload::from_dev_fixture(&json!("https://x/?device=d9")).unwrap();
        assert_eq!(claim.device_id, "d9");
    }

    #[test]
    fn fixture_raw_object() {
        let claim =
            ClaimPayload::from_dev_fixture(&json!({ "raw": "https://x/?code=zz&host=1.2.3.4" }))
                .unwrap();
        assert_eq!(claim.claim_code, "zz");
        assert_eq!(claim.host, "1.2.3.4");
    }

    #[test]
    fn fixture_remote_api_object() {
        let claim = ClaimPayload::from_dev_fixture(
            &json!({ "ip": "10.1.1.1", "apiPort": "9443", "authToken": "secret" }),
        )
        .unwrap();
        assert_eq!(claim.device_id, "dev-node");
        assert_eq!(claim.host, "10.1.1.1");
        assert_eq!(claim.dev_api_port, Some(9443));
        assert_eq!(claim.dev_auth_token.as_deref(), Some("secret"));
    }

    #[test]
    fn fixture_bad_port_uses_default() {
        let claim =
            ClaimPayload::from_dev_fixture(&json!({ "ip": "10.1.1.1", "apiPort": "abc" })).unwrap();
        assert_eq!(claim.dev_api_port, Some(DEFAULT_DEV_API_PORT));
    }

    #[test]
    fn fixture_unrecognized_shape() {
        let err = ClaimPayload::from_dev_fixture(&json!({ "ip": "10.1.1.1" })).unwrap_err();
        assert!(matches!(err, ModelError::UnrecognizedFixture(_)));
        assert!(ClaimPayload::from_dev_fixture(&json!(42)).is_err());
    }
}
