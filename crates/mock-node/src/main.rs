//! Mock Casanode node: serves the node-management API over plain HTTP.
//!
//! Point the client at it with
//! `CASANODE_API_SCHEME=http CASANODE_API_TOKEN=casanode-dev`.

use std::sync::Arc;

use mock_node::{router, MockNode, MockNodeConfig};
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = MockNodeConfig::from_env();
    let addr = format!("0.0.0.0:{}", config.listen_port);
    info!(
        token_ttl_secs = config.token_ttl_secs,
        "pre-shared token configured (set MOCK_NODE_TOKEN to change it)"
    );

    let app = router(Arc::new(MockNode::new(config)));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");

    info!(address = %addr, "mock node listening");
    axum::serve(listener, app).await.expect("server error");
}
