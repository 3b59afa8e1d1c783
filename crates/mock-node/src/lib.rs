//! # Mock Casanode node
//!
//! In-process mock of the Casanode node-management API (`/api/v1`) for
//! local development and the SDK integration tests.
//!
//! * `POST /auth/login` trades the pre-shared token for an HS256 bearer
//!   and a refresh token.
//! * `POST /auth/refresh` accepts a known refresh token in the body or a
//!   still-valid bearer.
//! * Every other route requires a valid bearer and answers from
//!   [`MockNodeConfig`].
//!
//! Call counters ([`MockNode::logins`], [`MockNode::refreshes`],
//! [`MockNode::configuration_reads`]) let tests assert de-duplication.

pub mod config;
pub mod error;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::routing::{get, post};
use axum::{Json, Router};
use casanode_models::{
    AuthTokens, Bandwidth, CertificateInfo, InstallationCheck, NetworkStatus, NodeConfiguration,
    NodeRunStatus, NodeStatus, PassphraseStatus,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

pub use config::MockNodeConfig;
pub use error::MockError;

/// Claims of the bearers issued by the mock.
#[derive(Debug, Serialize, Deserialize)]
struct BearerClaims {
    sub: String,
    iat: i64,
    exp: i64,
    jti: String,
}

/// Shared state of the mock node.
pub struct MockNode {
    config: MockNodeConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    refresh_tokens: Mutex<HashSet<String>>,
    logins: AtomicUsize,
    refreshes: AtomicUsize,
    configuration_reads: AtomicUsize,
}

impl MockNode {
    /// A node signing bearers with a per-process random secret.
    pub fn new(config: MockNodeConfig) -> Self {
        let secret = uuid::Uuid::new_v4().to_string();
        Self {
            config,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            refresh_tokens: Mutex::new(HashSet::new()),
            logins: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            configuration_reads: AtomicUsize::new(0),
        }
    }

    /// Accepted login exchanges.
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    /// Refresh exchanges received, accepted or not.
    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// `GET /node/configuration` requests served.
    pub fn configuration_reads(&self) -> usize {
        self.configuration_reads.load(Ordering::SeqCst)
    }

    /// The configuration the node answers from.
    pub fn config(&self) -> &MockNodeConfig {
        &self.config
    }

    /// Sign a bearer valid for the configured TTL.
    pub fn issue_bearer(&self) -> Result<String, MockError> {
        let now = Utc::now();
        let claims = BearerClaims {
            sub: "casanode-client".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.config.token_ttl_secs)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    fn issue_refresh_token(&self) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.refresh_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone());
        token
    }

    fn knows_refresh_token(&self, token: &str) -> bool {
        self.refresh_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(token)
    }

    fn verify_bearer(&self, token: &str) -> Result<(), MockError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<BearerClaims>(token, &self.decoding_key, &validation)
            .map(|_| ())
            .map_err(|e| MockError::Unauthorized(e.to_string()))
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), MockError> {
        let token = bearer(headers)
            .ok_or_else(|| MockError::Unauthorized("missing bearer".into()))?;
        self.verify_bearer(token)
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the `/api/v1` router over `node`.
pub fn router(node: Arc<MockNode>) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/node/configuration", get(node_configuration))
        .route("/node/status", get(node_status))
        .route("/status", get(status))
        .route("/node/passphrase", get(passphrase))
        .route("/check/installation", get(installation))
        .route("/node/address", get(node_address))
        .route("/wallet/address", get(wallet_address))
        .route("/node/balance", get(balance))
        .with_state(node);

    Router::new().nest("/api/v1", api)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Body of `POST /auth/login` and `POST /auth/refresh`.
#[derive(Debug, Default, Deserialize)]
struct TokenRequest {
    #[serde(default)]
    token: Option<String>,
}

async fn login(
    State(node): State<Arc<MockNode>>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<AuthTokens>, MockError> {
    if req.token.as_deref() != Some(node.config.pre_shared_token.as_str()) {
        return Err(MockError::Unauthorized("invalid pre-shared token".into()));
    }

    node.logins.fetch_add(1, Ordering::SeqCst);
    info!("login accepted");
    Ok(Json(AuthTokens {
        token: node.issue_bearer()?,
        refresh_token: Some(node.issue_refresh_token()),
        expires_at: None,
    }))
}

async fn refresh(
    State(node): State<Arc<MockNode>>,
    headers: HeaderMap,
    Json(req): Json<TokenRequest>,
) -> Result<Json<Value>, MockError> {
    node.refreshes.fetch_add(1, Ordering::SeqCst);

    match req.token.as_deref() {
        Some(rt) if node.knows_refresh_token(rt) => {}
        Some(_) => return Err(MockError::Unauthorized("unknown refresh token".into())),
        None => node.authorize(&headers)?,
    }

    info!("refresh accepted");
    Ok(Json(json!({ "token": node.issue_bearer()? })))
}

async fn node_configuration(
    State(node): State<Arc<MockNode>>,
    headers: HeaderMap,
) -> Result<Json<NodeConfiguration>, MockError> {
    node.authorize(&headers)?;
    node.configuration_reads.fetch_add(1, Ordering::SeqCst);

    // A node that was never set up has no configuration yet.
    if !node.config.installed {
        return Ok(Json(NodeConfiguration::default()));
    }

    Ok(Json(NodeConfiguration {
        moniker: Some("casanode-mock".into()),
        backend: Some("file".into()),
        node_type: Some("residential".into()),
        node_ip: Some("203.0.113.10".into()),
        node_port: Some(16567),
        vpn_type: Some("wireguard".into()),
        vpn_port: Some(51820),
        maximum_peers: Some(250),
        docker_image: Some("wajatmaka/sentinel-aarch64-alpine:v0.7.1".into()),
    }))
}

async fn node_status(
    State(node): State<Arc<MockNode>>,
    headers: HeaderMap,
) -> Result<Json<NodeRunStatus>, MockError> {
    node.authorize(&headers)?;
    Ok(Json(NodeRunStatus {
        status: Some("running".into()),
    }))
}

async fn status(
    State(node): State<Arc<MockNode>>,
    headers: HeaderMap,
) -> Result<Json<NetworkStatus>, MockError> {
    node.authorize(&headers)?;
    Ok(Json(NetworkStatus {
        version: Some("2.1.0".into()),
        uptime: Some(86_400),
        node_location: Some("Lisbon, Portugal".into()),
        system_arch: Some("aarch64".into()),
        system_kernel: Some("6.6.31".into()),
        system_os: Some("Alpine Linux".into()),
        status: Some(NodeStatus {
            version: Some("0.7.1".into()),
            bandwidth: Some(Bandwidth {
                download: Some("94.2 Mbps".into()),
                upload: Some("38.7 Mbps".into()),
            }),
            peers: Some(3),
            max_peers: Some(250),
            ..NodeStatus::default()
        }),
        certificate: Some(CertificateInfo {
            expiration_date: Some("2027-01-01T00:00:00Z".into()),
            ..CertificateInfo::default()
        }),
    }))
}

async fn passphrase(
    State(node): State<Arc<MockNode>>,
    headers: HeaderMap,
) -> Result<Json<PassphraseStatus>, MockError> {
    node.authorize(&headers)?;
    Ok(Json(PassphraseStatus {
        required: node.config.passphrase_required,
        available: node.config.passphrase_available,
    }))
}

async fn installation(
    State(node): State<Arc<MockNode>>,
    headers: HeaderMap,
) -> Result<Json<InstallationCheck>, MockError> {
    node.authorize(&headers)?;
    let installed = node.config.installed;
    Ok(Json(InstallationCheck {
        image: installed,
        container_exists: installed,
        node_config: installed,
        vpn_config: installed,
        certificate_key: installed,
        wallet: installed,
    }))
}

async fn node_address(
    State(node): State<Arc<MockNode>>,
    headers: HeaderMap,
) -> Result<Json<Value>, MockError> {
    node.authorize(&headers)?;
    Ok(Json(json!({ "address": "sentnode1mockaddress" })))
}

async fn wallet_address(
    State(node): State<Arc<MockNode>>,
    headers: HeaderMap,
) -> Result<Json<Value>, MockError> {
    node.authorize(&headers)?;
    Ok(Json(json!({ "address": "sent1mockaddress" })))
}

async fn balance(
    State(node): State<Arc<MockNode>>,
    headers: HeaderMap,
) -> Result<Json<Value>, MockError> {
    node.authorize(&headers)?;
    if node.config.balance_fails {
        return Err(MockError::Unavailable("chain RPC unreachable".into()));
    }
    Ok(Json(json!({ "balance": "1250.5 udvpn" })))
}
