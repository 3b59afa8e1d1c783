//! Top-level session context.
//!
//! [`Session`] owns one instance of every store and wires the guard, the
//! hydrator and the gate to the same transport. Nothing here is global:
//! two sessions in one process are fully independent.

use std::sync::Arc;

use casanode_models::{ClaimPayload, DeviceEntry, Route};
use tracing::{info, warn};

use crate::config::SdkConfig;
use crate::connection::ConnectionStore;
use crate::credentials::CredentialStore;
use crate::devices::DeviceStore;
use crate::error::SdkError;
use crate::gate::{Navigation, NavigationGate};
use crate::guard::SessionGuard;
use crate::http::HttpTransport;
use crate::hydrator::{NodeHydrator, NodeStore};
use crate::transport::NodeTransport;

/// A client session against one Casanode device.
pub struct Session {
    config: SdkConfig,
    transport: Arc<dyn NodeTransport>,
    connection: ConnectionStore,
    devices: DeviceStore,
    guard: SessionGuard,
    hydrator: NodeHydrator,
    gate: NavigationGate,
}

impl Session {
    /// Build a session over the HTTP transport, with durable stores under
    /// the configured data directory.
    pub fn open(config: SdkConfig) -> Result<Self, SdkError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        let credentials = config
            .credentials_path()
            .map_or_else(CredentialStore::in_memory, CredentialStore::open);
        let devices = config
            .devices_path()
            .map_or_else(DeviceStore::in_memory, DeviceStore::open);
        Ok(Self::with_parts(config, transport, credentials, devices))
    }

    /// Build a session from explicit parts.
    pub fn with_parts(
        config: SdkConfig,
        transport: Arc<dyn NodeTransport>,
        credentials: CredentialStore,
        devices: DeviceStore,
    ) -> Self {
        let guard = SessionGuard::new(
            Arc::clone(&transport),
            Arc::new(credentials),
            config.refresh_margin_ms,
        );
        let hydrator = NodeHydrator::new(Arc::clone(&transport), Arc::new(NodeStore::new()));
        let gate = NavigationGate::new(guard.clone(), Arc::clone(&transport), hydrator.clone());

        Self {
            connection: ConnectionStore::from_config(&config),
            config,
            transport,
            devices,
            guard,
            hydrator,
            gate,
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Reconnect to the last paired endpoint (or the configured development
    /// URL) and check the stored credential.
    ///
    /// Returns whether the session is usable.
    pub async fn resume(&self) -> bool {
        let token = self.guard.usable_token();
        let (host, port) = self.guard.credentials().last_endpoint().unwrap_or_default();

        self.connection.set(Some(host.as_str()), Some(port), None);
        if !self.transport.connect(&host, port, token.as_deref()) {
            info!("no endpoint to resume");
            return false;
        }
        if token.is_some() && !self.transport.is_connected() {
            self.transport.set_auth_token(token);
        }

        let authenticated = self.guard.ensure_authenticated().await;
        info!(host = %host, port, authenticated, "session resumed");
        authenticated
    }

    /// Pair with the device described by `claim` and log in.
    ///
    /// The login token is the claim's development token, else its claim
    /// code, else the configured pre-shared token.
    pub async fn pair(&self, claim: &ClaimPayload) -> Result<DeviceEntry, SdkError> {
        let port = claim.dev_api_port.unwrap_or(self.config.api_port);
        let token = claim
            .dev_auth_token
            .clone()
            .or_else(|| Some(claim.claim_code.clone()).filter(|c| !c.is_empty()))
            .or_else(|| self.config.api_token.clone());

        self.hydrator.reset();
        self.connection
            .set(Some(claim.host.as_str()), Some(port), token.as_deref());

        if !self.transport.connect(&claim.host, port, token.as_deref()) {
            return Err(SdkError::Transport(format!(
                "cannot reach {}:{port}",
                claim.host
            )));
        }

        self.guard.login(token.as_deref()).await?;
        self.guard.record_endpoint(&claim.host, port);

        let name = if claim.device_id.is_empty() {
            claim.host.clone()
        } else {
            claim.device_id.clone()
        };
        let device = DeviceEntry {
            uuid: self
                .transport
                .device_uuid()
                .unwrap_or_else(|| name.clone()),
            name,
            host: claim.host.clone(),
            port,
        };
        self.devices.add(device.clone());

        info!(device = %device.name, host = %device.host, port, "device paired");
        Ok(device)
    }

    /// Parse a scanned deep link and pair with it.
    ///
    /// A malformed link fails before any connection attempt.
    pub async fn pair_from_url(&self, raw: &str) -> Result<DeviceEntry, SdkError> {
        let claim = ClaimPayload::parse(raw)?;
        self.pair(&claim).await
    }

    /// Pair from a development fixture (`qrcode.json`).
    pub async fn pair_from_fixture(
        &self,
        fixture: &serde_json::Value,
    ) -> Result<DeviceEntry, SdkError> {
        let claim = ClaimPayload::from_dev_fixture(fixture)?;
        self.pair(&claim).await
    }

    /// Log in again with `token`, or with the current pairing token.
    pub async fn login(&self, token: Option<&str>) -> Result<(), SdkError> {
        let pairing = self.connection.get().pairing_token;
        self.guard.login(token.or(pairing.as_deref())).await
    }

    /// Forget the credential, the connection and the node data.
    pub async fn logout(&self) {
        self.guard.logout();
        self.disconnect().await;
        info!("logged out");
    }

    /// Drop the connection and the node data, keeping the credential.
    pub async fn disconnect(&self) {
        self.transport.disconnect().await;
        self.connection.clear();
        self.hydrator.reset();
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Check a navigation to `route`.
    pub async fn navigate(&self, route: Route) -> Navigation {
        self.gate.check(route).await
    }

    /// Check a navigation to a route given by path or name.
    pub async fn navigate_to(&self, target: &str) -> Result<Navigation, SdkError> {
        let route: Route = target.parse()?;
        Ok(self.navigate(route).await)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The configuration the session was built with.
    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// The session guard.
    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    /// The node-data hydrator.
    pub fn hydrator(&self) -> &NodeHydrator {
        &self.hydrator
    }

    /// The credential store (read-only).
    pub fn credentials(&self) -> &CredentialStore {
        self.guard.credentials()
    }

    /// The ephemeral connection parameters.
    pub fn connection(&self) -> &ConnectionStore {
        &self.connection
    }

    /// The node snapshot store (read-only).
    pub fn node(&self) -> &NodeStore {
        self.hydrator.store()
    }

    /// The paired device registry.
    pub fn devices(&self) -> &DeviceStore {
        &self.devices
    }

    /// The transport shared by every component.
    pub fn transport(&self) -> &Arc<dyn NodeTransport> {
        &self.transport
    }

    /// Whether the transport holds an endpoint and a bearer.
    pub fn is_connected(&self) -> bool {
        let connected = self.transport.is_connected();
        if !connected && self.guard.state().has_credential() {
            warn!("credential held but transport disconnected");
        }
        connected
    }
}
