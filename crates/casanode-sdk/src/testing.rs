//! In-memory [`NodeTransport`] double counting every call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use casanode_models::{
    AuthTokens, InstallationCheck, NetworkStatus, NodeBalance, NodeConfiguration,
    PassphraseStatus,
};

use crate::error::SdkError;
use crate::transport::NodeTransport;

/// Scripted answers of the mock.
#[derive(Debug, Clone)]
pub(crate) struct Script {
    pub login: Option<AuthTokens>,
    pub refresh: Result<Option<AuthTokens>, String>,
    pub configuration: Result<NodeConfiguration, String>,
    pub passphrase: PassphraseStatus,
    pub installation: InstallationCheck,
    pub node_address: Result<Option<String>, String>,
    pub wallet_address: Result<Option<String>, String>,
    pub balance: Result<Option<NodeBalance>, String>,
    /// Latency of every remote call.
    pub delay: Duration,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            login: None,
            refresh: Ok(None),
            configuration: Ok(NodeConfiguration {
                moniker: Some("casa-01".into()),
                node_ip: Some("203.0.113.7".into()),
                ..NodeConfiguration::default()
            }),
            passphrase: PassphraseStatus {
                required: false,
                available: true,
            },
            installation: InstallationCheck {
                image: true,
                wallet: true,
                ..InstallationCheck::default()
            },
            node_address: Ok(Some("sentnode1abc".into())),
            wallet_address: Ok(Some("sent1abc".into())),
            balance: Ok(Some(NodeBalance {
                amount: 10.0,
                denom: "udvpn".into(),
            })),
            delay: Duration::from_millis(20),
        }
    }
}

#[derive(Default)]
pub(crate) struct MockTransport {
    pub script: Mutex<Script>,
    connected: AtomicBool,
    token: Mutex<Option<String>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MockTransport {
    pub fn connected() -> Self {
        let mock = Self::default();
        mock.connected.store(true, Ordering::SeqCst);
        mock
    }

    pub fn with_script(self, script: Script) -> Self {
        *self.script.lock().unwrap() = script;
        self
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    async fn hit(&self, name: &'static str) -> Script {
        *self.calls.lock().unwrap().entry(name).or_default() += 1;
        let script = self.script.lock().unwrap().clone();
        tokio::time::sleep(script.delay).await;
        script
    }
}

fn remote<T>(result: Result<T, String>) -> Result<T, SdkError> {
    result.map_err(|message| SdkError::Server {
        status: 500,
        message,
    })
}

#[async_trait]
impl NodeTransport for MockTransport {
    fn connect(&self, host: &str, port: u16, token: Option<&str>) -> bool {
        let ok = !host.is_empty() && port > 0;
        self.connected.store(ok, Ordering::SeqCst);
        *self.token.lock().unwrap() = token.map(String::from);
        ok
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        *self.token.lock().unwrap() = None;
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn auth_token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn set_auth_token(&self, token: Option<String>) {
        *self.token.lock().unwrap() = token;
    }

    fn device_uuid(&self) -> Option<String> {
        self.is_connected().then(|| "mock-device".to_string())
    }

    async fn login(&self, _pre_shared_token: Option<&str>) -> Result<Option<AuthTokens>, SdkError> {
        Ok(self.hit("login").await.login)
    }

    async fn refresh_auth(
        &self,
        _refresh_token: Option<&str>,
    ) -> Result<Option<AuthTokens>, SdkError> {
        remote(self.hit("refresh").await.refresh)
    }

    async fn node_configuration(&self) -> Result<NodeConfiguration, SdkError> {
        remote(self.hit("configuration").await.configuration)
    }

    async fn node_status(&self) -> Result<Option<String>, SdkError> {
        self.hit("node_status").await;
        Ok(Some("running".into()))
    }

    async fn status(&self) -> Result<NetworkStatus, SdkError> {
        self.hit("status").await;
        Ok(NetworkStatus {
            version: Some("1.0.0".into()),
            ..NetworkStatus::default()
        })
    }

    async fn node_passphrase(&self) -> Result<PassphraseStatus, SdkError> {
        Ok(self.hit("passphrase").await.passphrase)
    }

    async fn check_installation(&self) -> Result<InstallationCheck, SdkError> {
        Ok(self.hit("installation").await.installation)
    }

    async fn node_address(&self) -> Result<Option<String>, SdkError> {
        remote(self.hit("node_address").await.node_address)
    }

    async fn wallet_address(&self) -> Result<Option<String>, SdkError> {
        remote(self.hit("wallet_address").await.wallet_address)
    }

    async fn node_balance(&self) -> Result<Option<NodeBalance>, SdkError> {
        remote(self.hit("balance").await.balance)
    }
}
