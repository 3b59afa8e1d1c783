//! Contract between the orchestration layer and the node API transport.
//!
//! [`HttpTransport`](crate::HttpTransport) is the production implementation.
//! The guard, hydrator and gate only ever talk to a `dyn NodeTransport`, so
//! tests substitute an in-memory double.

use async_trait::async_trait;
use casanode_models::{
    AuthTokens, InstallationCheck, NetworkStatus, NodeBalance, NodeConfiguration,
    PassphraseStatus,
};

use crate::error::SdkError;

/// Authenticated / unauthenticated calls against a single node API.
#[async_trait]
pub trait NodeTransport: Send + Sync {
    // ------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------

    /// Point the transport at `host:port`, presenting `token` as bearer.
    ///
    /// Returns `false` when no usable endpoint could be configured.
    fn connect(&self, host: &str, port: u16, token: Option<&str>) -> bool;

    /// Forget the endpoint and the bearer.
    async fn disconnect(&self);

    /// Whether an endpoint and a bearer are both configured.
    fn is_connected(&self) -> bool;

    /// Current bearer, if any.
    fn auth_token(&self) -> Option<String>;

    /// Replace (or clear) the bearer.
    fn set_auth_token(&self, token: Option<String>);

    /// Stable identifier of the current endpoint.
    fn device_uuid(&self) -> Option<String>;

    // ------------------------------------------------------------------
    // Authentication exchanges
    // ------------------------------------------------------------------

    /// `POST /auth/login` with a pre-shared token. `Ok(None)` means the node
    /// answered without a usable token.
    async fn login(&self, pre_shared_token: Option<&str>) -> Result<Option<AuthTokens>, SdkError>;

    /// `POST /auth/refresh`. Without a refresh token the current bearer is
    /// presented as proof of identity.
    ///
    /// `expires_at` in the answer is in milliseconds since the Unix epoch;
    /// implementations convert a node reporting seconds.
    async fn refresh_auth(&self, refresh_token: Option<&str>)
        -> Result<Option<AuthTokens>, SdkError>;

    // ------------------------------------------------------------------
    // Node data
    // ------------------------------------------------------------------

    /// `GET /node/configuration`.
    async fn node_configuration(&self) -> Result<NodeConfiguration, SdkError>;

    /// `GET /node/status`, the container run status.
    async fn node_status(&self) -> Result<Option<String>, SdkError>;

    /// `GET /status`.
    async fn status(&self) -> Result<NetworkStatus, SdkError>;

    /// `GET /node/passphrase`.
    async fn node_passphrase(&self) -> Result<PassphraseStatus, SdkError>;

    /// `GET /check/installation`.
    async fn check_installation(&self) -> Result<InstallationCheck, SdkError>;

    /// `GET /node/address`.
    async fn node_address(&self) -> Result<Option<String>, SdkError>;

    /// `GET /wallet/address`.
    async fn wallet_address(&self) -> Result<Option<String>, SdkError>;

    /// `GET /node/balance`, parsed from `"<amount> <denom>"`.
    async fn node_balance(&self) -> Result<Option<NodeBalance>, SdkError>;
}
