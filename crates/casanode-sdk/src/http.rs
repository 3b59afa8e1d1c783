//! reqwest implementation of [`NodeTransport`].
//!
//! Requests go to `https://{host}:{port}/api/v1{endpoint}` with an
//! `Authorization: Bearer` header, except the login exchange which is sent
//! unauthenticated.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use casanode_models::{
    AuthTokens, InstallationCheck, NetworkStatus, NodeBalance, NodeConfiguration,
    NodeRunStatus, PassphraseStatus,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::SdkConfig;
use crate::error::SdkError;
use crate::transport::NodeTransport;

/// Mutable endpoint / bearer state of the transport.
#[derive(Debug, Default)]
struct Endpoint {
    base_url: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    auth_token: Option<String>,
    connected: bool,
}

/// HTTP client for a single Casanode device.
pub struct HttpTransport {
    http: reqwest::Client,
    scheme: String,
    dev_base_url: Option<String>,
    default_login_token: Option<String>,
    endpoint: RwLock<Endpoint>,
}

impl HttpTransport {
    /// Build the transport from the client configuration.
    pub fn new(config: &SdkConfig) -> Result<Self, SdkError> {
        if !matches!(config.api_scheme.as_str(), "http" | "https") {
            return Err(SdkError::Config(format!(
                "unsupported API scheme: {}",
                config.api_scheme
            )));
        }
        if let Some(base) = &config.api_base_url {
            reqwest::Url::parse(base)
                .map_err(|e| SdkError::Config(format!("invalid API base URL {base}: {e}")))?;
        }

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .user_agent(format!("casanode-sdk/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            scheme: config.api_scheme.clone(),
            dev_base_url: config.api_base_url.clone(),
            default_login_token: config.api_token.clone(),
            endpoint: RwLock::new(Endpoint::default()),
        })
    }

    /// Reconnect to the last host / port / bearer.
    pub fn reconnect(&self) -> bool {
        let (host, port, token) = {
            let ep = self.read();
            (
                ep.host.clone().unwrap_or_default(),
                ep.port.unwrap_or_default(),
                ep.auth_token.clone(),
            )
        };
        self.connect(&host, port, token.as_deref())
    }

    /// The base URL requests are currently sent to.
    pub fn base_url(&self) -> Option<String> {
        self.read().base_url.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Endpoint> {
        self.endpoint.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Endpoint> {
        self.endpoint.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Base URL and bearer, or an error when the transport is not initialised.
    fn authenticated_target(&self) -> Result<(String, String), SdkError> {
        let ep = self.read();
        match (&ep.base_url, &ep.auth_token) {
            (Some(base), Some(token)) => Ok((base.clone(), token.clone())),
            _ => Err(SdkError::Transport(
                "API is not initialized, set a token and an endpoint first".into(),
            )),
        }
    }

    fn require_base_url(&self) -> Result<String, SdkError> {
        self.read()
            .base_url
            .clone()
            .ok_or_else(|| SdkError::Transport("API base URL is not initialized".into()))
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, SdkError> {
        let (base, token) = self.authenticated_target()?;
        let res = self
            .http
            .get(format!("{base}{endpoint}"))
            .bearer_auth(token)
            .send()
            .await?;
        decode_response(res).await
    }
}

/// Turn a non-success status into [`SdkError::Server`], otherwise decode JSON.
async fn decode_response<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, SdkError> {
    let status = res.status();
    if !status.is_success() {
        let message = res.text().await.unwrap_or_default();
        return Err(SdkError::Server {
            status: status.as_u16(),
            message,
        });
    }
    Ok(res.json().await?)
}

/// Extract tokens from a login / refresh body, accepting the key spellings
/// different node firmware versions use.
fn parse_tokens(body: &Value, fallback_refresh: Option<&str>) -> Option<AuthTokens> {
    let first_str = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| body.get(*k).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    let token = first_str(&["token", "jwt", "accessToken", "access_token"])?;
    let refresh_token = first_str(&["refreshToken", "refresh_token"])
        .or_else(|| fallback_refresh.map(String::from));
    let expires_at = ["expiresAt", "expires_at"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_i64))
        .and_then(expiry_ms);

    Some(AuthTokens {
        token,
        refresh_token,
        expires_at,
    })
}

/// Reported expiries below this are Unix seconds, not milliseconds.
const SECONDS_EXPIRY_LIMIT: i64 = 100_000_000_000;

/// Normalise a reported expiry to milliseconds. Non-positive values are
/// dropped.
fn expiry_ms(raw: i64) -> Option<i64> {
    match raw {
        raw if raw <= 0 => None,
        secs if secs < SECONDS_EXPIRY_LIMIT => secs.checked_mul(1000),
        ms => Some(ms),
    }
}

#[derive(serde::Deserialize)]
struct AddressBody {
    address: Option<String>,
}

#[derive(serde::Deserialize)]
struct BalanceBody {
    balance: Option<String>,
}

#[async_trait]
impl NodeTransport for HttpTransport {
    fn connect(&self, host: &str, port: u16, token: Option<&str>) -> bool {
        let mut ep = self.write();

        if !host.is_empty() && port > 0 {
            ep.base_url = Some(format!("{}://{host}:{port}/api/v1", self.scheme));
            ep.host = Some(host.to_string());
            ep.port = Some(port);
            ep.auth_token = token.filter(|t| !t.is_empty()).map(String::from);
            ep.connected = true;
            info!(host = %host, port, "transport connected");
            return true;
        }

        if let Some(base) = &self.dev_base_url {
            // Login must still happen before requests are authorised.
            *ep = Endpoint {
                base_url: Some(base.clone()),
                ..Endpoint::default()
            };
            info!(base_url = %base, "transport configured from environment");
            return true;
        }

        *ep = Endpoint::default();
        debug!("no endpoint available, transport disconnected");
        false
    }

    async fn disconnect(&self) {
        *self.write() = Endpoint::default();
        info!("transport disconnected");
    }

    fn is_connected(&self) -> bool {
        self.read().connected
    }

    fn auth_token(&self) -> Option<String> {
        self.read().auth_token.clone()
    }

    fn set_auth_token(&self, token: Option<String>) {
        let mut ep = self.write();
        ep.auth_token = token;
        ep.connected = ep.base_url.is_some() && ep.auth_token.is_some();
    }

    fn device_uuid(&self) -> Option<String> {
        let ep = self.read();
        if !ep.connected {
            return None;
        }
        ep.base_url.as_ref().map(|base| STANDARD.encode(base))
    }

    async fn login(&self, pre_shared_token: Option<&str>) -> Result<Option<AuthTokens>, SdkError> {
        let base = self.require_base_url()?;
        let body_token = pre_shared_token.or(self.default_login_token.as_deref());

        let res = self
            .http
            .post(format!("{base}/auth/login"))
            .json(&json!({ "token": body_token }))
            .send()
            .await?;

        if !res.status().is_success() {
            warn!(status = %res.status(), "login exchange rejected");
            return Ok(None);
        }

        let body: Value = res.json().await?;
        Ok(parse_tokens(&body, None))
    }

    async fn refresh_auth(
        &self,
        refresh_token: Option<&str>,
    ) -> Result<Option<AuthTokens>, SdkError> {
        let base = self.require_base_url()?;
        let mut req = self.http.post(format!("{base}/auth/refresh"));

        req = match refresh_token {
            Some(rt) => req.json(&json!({ "token": rt })),
            None => {
                let bearer = self.auth_token().unwrap_or_default();
                req.bearer_auth(bearer).json(&json!({}))
            }
        };

        let res = req.send().await?;
        if !res.status().is_success() {
            warn!(status = %res.status(), "refresh exchange rejected");
            return Ok(None);
        }

        let body: Value = res.json().await?;
        Ok(parse_tokens(&body, refresh_token))
    }

    async fn node_configuration(&self) -> Result<NodeConfiguration, SdkError> {
        self.get_json("/node/configuration").await
    }

    async fn node_status(&self) -> Result<Option<String>, SdkError> {
        let body: NodeRunStatus = self.get_json("/node/status").await?;
        Ok(body.status)
    }

    async fn status(&self) -> Result<NetworkStatus, SdkError> {
        self.get_json("/status").await
    }

    async fn node_passphrase(&self) -> Result<PassphraseStatus, SdkError> {
        self.get_json("/node/passphrase").await
    }

    async fn check_installation(&self) -> Result<InstallationCheck, SdkError> {
        self.get_json("/check/installation").await
    }

    async fn node_address(&self) -> Result<Option<String>, SdkError> {
        let body: AddressBody = self.get_json("/node/address").await?;
        Ok(body.address)
    }

    async fn wallet_address(&self) -> Result<Option<String>, SdkError> {
        let body: AddressBody = self.get_json("/wallet/address").await?;
        Ok(body.address)
    }

    async fn node_balance(&self) -> Result<Option<NodeBalance>, SdkError> {
        let body: BalanceBody = self.get_json("/node/balance").await?;
        Ok(body.balance.and_then(|raw| match raw.parse() {
            Ok(balance) => Some(balance),
            Err(e) => {
                debug!(error = %e, "unparseable balance");
                None
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(dev_base_url: Option<&str>) -> HttpTransport {
        let config = SdkConfig {
            api_base_url: dev_base_url.map(String::from),
            ..SdkConfig::default()
        };
        HttpTransport::new(&config).unwrap()
    }

    #[test]
    fn parse_tokens_accepts_aliases() {
        let tokens = parse_tokens(
            &json!({ "access_token": "a", "refresh_token": "r", "expires_at": 42 }),
            None,
        )
        .unwrap();
        assert_eq!(tokens.token, "a");
        assert_eq!(tokens.refresh_token.as_deref(), Some("r"));
        assert_eq!(tokens.expires_at, Some(42));
    }

    #[test]
    fn parse_tokens_normalises_expiry() {
        let ms = parse_tokens(&json!({ "token": "t", "expiresAt": 1_900_000_000_000_i64 }), None);
        assert_eq!(ms.unwrap().expires_at, Some(1_900_000_000_000));

        let secs = parse_tokens(&json!({ "token": "t", "expiresAt": 1_900_000_000 }), None);
        assert_eq!(secs.unwrap().expires_at, Some(1_900_000_000_000));

        let negative = parse_tokens(&json!({ "token": "t", "expiresAt": -5 }), None);
        assert_eq!(negative.unwrap().expires_at, None);
    }

    #[test]
    fn parse_tokens_prefers_token_key() {
        let tokens = parse_tokens(&json!({ "jwt": "j", "token": "t" }), None).unwrap();
        assert_eq!(tokens.token, "t");
    }

    #[test]
    fn parse_tokens_keeps_previous_refresh_token() {
        let tokens = parse_tokens(&json!({ "token": "t" }), Some("old")).unwrap();
        assert_eq!(tokens.refresh_token.as_deref(), Some("old"));
    }

    #[test]
    fn parse_tokens_without_token_is_none() {
        assert!(parse_tokens(&json!({ "refreshToken": "r" }), None).is_none());
        assert!(parse_tokens(&json!({ "token": "" }), None).is_none());
    }

    #[test]
    fn connect_builds_https_base_url() {
        let t = transport(None);
        assert!(t.connect("10.0.0.1", 8443, Some("psk")));
        assert!(t.is_connected());
        assert_eq!(t.base_url().as_deref(), Some("https://10.0.0.1:8443/api/v1"));
        assert_eq!(t.auth_token().as_deref(), Some("psk"));
        assert!(t.device_uuid().is_some());
    }

    #[test]
    fn rejects_bad_configuration() {
        let bad_scheme = SdkConfig {
            api_scheme: "ftp".into(),
            ..SdkConfig::default()
        };
        assert!(matches!(
            HttpTransport::new(&bad_scheme),
            Err(SdkError::Config(_))
        ));

        let bad_url = SdkConfig {
            api_base_url: Some("not a url".into()),
            ..SdkConfig::default()
        };
        assert!(matches!(HttpTransport::new(&bad_url), Err(SdkError::Config(_))));
    }

    #[test]
    fn connect_without_endpoint_fails() {
        let t = transport(None);
        assert!(!t.connect("", 0, None));
        assert!(!t.is_connected());
        assert!(t.base_url().is_none());
    }

    #[test]
    fn dev_base_url_needs_a_token_to_connect() {
        let t = transport(Some("http://localhost:9000/api/v1"));
        assert!(t.connect("", 0, None));
        assert!(!t.is_connected());

        t.set_auth_token(Some("jwt".into()));
        assert!(t.is_connected());

        t.set_auth_token(None);
        assert!(!t.is_connected());
    }

    #[test]
    fn reconnect_reuses_last_endpoint() {
        let t = transport(None);
        t.connect("192.168.50.1", 8443, Some("tok"));
        assert!(t.reconnect());
        assert_eq!(t.auth_token().as_deref(), Some("tok"));
        assert_eq!(t.base_url().as_deref(), Some("https://192.168.50.1:8443/api/v1"));
    }

    #[tokio::test]
    async fn disconnect_clears_everything() {
        let t = transport(None);
        t.connect("10.0.0.1", 8443, Some("psk"));
        t.disconnect().await;
        assert!(!t.is_connected());
        assert!(t.auth_token().is_none());
        assert!(t.device_uuid().is_none());
    }

    #[tokio::test]
    async fn requests_without_endpoint_are_transport_errors() {
        let t = transport(None);
        let err = t.node_configuration().await.unwrap_err();
        assert!(matches!(err, SdkError::Transport(_)));
        let err = t.login(Some("psk")).await.unwrap_err();
        assert!(matches!(err, SdkError::Transport(_)));
    }
}
