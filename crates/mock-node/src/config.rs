//! Mock node configuration.

/// Behaviour knobs of the mock node.
#[derive(Debug, Clone)]
pub struct MockNodeConfig {
    /// Port to listen on (default `8443`).
    pub listen_port: u16,
    /// Pre-shared token accepted by `POST /auth/login`.
    pub pre_shared_token: String,
    /// Lifetime of issued bearers, in seconds.
    pub token_ttl_secs: i64,
    /// Node set up: configuration written, docker image and wallet present.
    pub installed: bool,
    /// Keyring protected by a passphrase.
    pub passphrase_required: bool,
    /// Passphrase supplied to the node.
    pub passphrase_available: bool,
    /// `GET /node/balance` answers 503.
    pub balance_fails: bool,
}

impl Default for MockNodeConfig {
    fn default() -> Self {
        Self {
            listen_port: 8443,
            pre_shared_token: "casanode-dev".to_string(),
            token_ttl_secs: 3600,
            installed: true,
            passphrase_required: false,
            passphrase_available: true,
            balance_fails: false,
        }
    }
}

impl MockNodeConfig {
    /// Build the configuration from environment variables.
    ///
    /// | Variable                   | Default        | Description                 |
    /// |----------------------------|----------------|-----------------------------|
    /// | `MOCK_NODE_PORT`           | `8443`         | HTTP listen port            |
    /// | `MOCK_NODE_TOKEN`          | `casanode-dev` | Pre-shared login token      |
    /// | `MOCK_NODE_TOKEN_TTL_SECS` | `3600`         | Lifetime of issued bearers  |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let listen_port = std::env::var("MOCK_NODE_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.listen_port);
        let pre_shared_token =
            std::env::var("MOCK_NODE_TOKEN").unwrap_or(defaults.pre_shared_token);
        let token_ttl_secs = std::env::var("MOCK_NODE_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|ttl| *ttl > 0)
            .unwrap_or(defaults.token_ttl_secs);

        Self {
            listen_port,
            pre_shared_token,
            token_ttl_secs,
            ..defaults
        }
    }
}
