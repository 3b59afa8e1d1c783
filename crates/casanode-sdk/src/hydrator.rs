//! Lazy loading of the node snapshot.
//!
//! [`NodeHydrator::ensure_loaded`] fetches configuration and status once,
//! then the wallet fields when the keyring passphrase is available.
//! Concurrent callers join the same load. Wallet sub-fetches are
//! best-effort: a failure is logged and the other fields still land.
//!
//! A reset (logout, disconnect, new pairing) starts a new store epoch. A load
//! begun in an earlier epoch runs to completion but its results are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use casanode_models::{NetworkStatus, NodeConfiguration, NodeSnapshot};
use tracing::{debug, info, warn};

use crate::error::SdkError;
use crate::single_flight::SingleFlight;
use crate::transport::NodeTransport;

/// Holder of the [`NodeSnapshot`]. Written only by the [`NodeHydrator`].
#[derive(Debug, Default)]
pub struct NodeStore {
    snapshot: RwLock<NodeSnapshot>,
    /// Bumped on every reset, only while the snapshot write lock is held.
    epoch: AtomicU64,
}

impl NodeStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> NodeSnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the node IP or moniker is known.
    pub fn is_hydrated(&self) -> bool {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_hydrated()
    }

    /// Wallet mnemonic, if one was recorded and not yet cleared.
    pub fn mnemonic(&self) -> Vec<String> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .mnemonic
            .clone()
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut NodeSnapshot)) {
        f(&mut self.snapshot.write().unwrap_or_else(PoisonError::into_inner));
    }

    /// Apply `f` only if no reset happened since `epoch` was read.
    pub(crate) fn update_in(&self, epoch: u64, f: impl FnOnce(&mut NodeSnapshot)) -> bool {
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        if self.epoch() != epoch {
            return false;
        }
        f(&mut snapshot);
        true
    }

    pub(crate) fn reset(&self) {
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *snapshot = NodeSnapshot::default();
    }
}

/// Why a node-scoped screen cannot be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReady {
    /// The keyring is protected and its passphrase has not been entered.
    PassphraseLocked,
    /// The docker image or the wallet is missing; onboarding must run.
    InstallationIncomplete,
    /// Anything else (unreachable node, failed load).
    Unavailable,
}

/// Loads the node snapshot on demand.
///
/// Cloning is cheap; clones share the store and the in-flight load.
#[derive(Clone)]
pub struct NodeHydrator {
    transport: Arc<dyn NodeTransport>,
    store: Arc<NodeStore>,
    load: Arc<SingleFlight<bool>>,
}

impl NodeHydrator {
    /// Build a hydrator writing into `store`.
    pub fn new(transport: Arc<dyn NodeTransport>, store: Arc<NodeStore>) -> Self {
        Self {
            transport,
            store,
            load: Arc::new(SingleFlight::new()),
        }
    }

    /// Read access to the snapshot store.
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Make sure the snapshot is populated.
    ///
    /// Returns `true` immediately when it already is and `false` without
    /// any fetch when the transport is not connected.
    pub async fn ensure_loaded(&self) -> bool {
        if self.store.is_hydrated() {
            return true;
        }
        if !self.transport.is_connected() {
            debug!("transport not connected, skipping node load");
            return false;
        }

        let transport = Arc::clone(&self.transport);
        let store = Arc::clone(&self.store);
        self.load
            .run(move || async move { load_node(&*transport, &store).await })
            .await
            .unwrap_or(false)
    }

    /// Re-fetch the wallet fields. Returns `false` when the passphrase is
    /// not available and nothing was fetched.
    pub async fn refresh_wallet(&self) -> bool {
        let epoch = self.store.epoch();
        match self.transport.node_passphrase().await {
            Ok(p) if p.available => {
                load_wallet(&*self.transport, &self.store, epoch).await;
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e.into_transport(), "passphrase check failed");
                false
            }
        }
    }

    /// Work out why the node is not ready, checking the passphrase first and
    /// the installation second.
    pub async fn diagnose(&self) -> NotReady {
        match self.transport.node_passphrase().await {
            Ok(p) if p.blocks_access() => return NotReady::PassphraseLocked,
            Ok(_) => {}
            Err(e) => debug!(error = %e.into_transport(), "passphrase check failed"),
        }

        match self.transport.check_installation().await {
            Ok(check) if !check.is_complete() => NotReady::InstallationIncomplete,
            Ok(_) => NotReady::Unavailable,
            Err(e) => {
                debug!(error = %e.into_transport(), "installation check failed");
                NotReady::Unavailable
            }
        }
    }

    /// Keep the freshly generated wallet mnemonic for a single display.
    pub fn set_mnemonic(&self, words: Vec<String>) {
        self.store.update(|s| s.mnemonic = words);
    }

    /// Drop the mnemonic, leaving the rest of the snapshot intact.
    pub fn clear_mnemonic(&self) {
        self.store.update(|s| s.mnemonic.clear());
    }

    /// Empty the snapshot and detach any running load from it.
    pub(crate) fn reset(&self) {
        self.load.forget();
        self.store.reset();
    }
}

async fn load_node(transport: &dyn NodeTransport, store: &NodeStore) -> bool {
    let epoch = store.epoch();
    if store.is_hydrated() {
        return true;
    }

    let applied = match fetch_core(transport).await {
        Ok((config, run_status, status)) => store.update_in(epoch, |s| {
            s.apply_configuration(&config);
            s.apply_status(run_status.as_deref(), &status);
        }),
        Err(e) => {
            warn!(error = %e, "node data load failed");
            return false;
        }
    };
    if !applied {
        debug!("store reset during load, dropping node data");
        return false;
    }

    match transport.node_passphrase().await {
        Ok(p) if p.available => load_wallet(transport, store, epoch).await,
        Ok(_) => debug!("passphrase not available, skipping wallet"),
        Err(e) => warn!(error = %e.into_transport(), "passphrase check failed"),
    }

    let hydrated = store.epoch() == epoch && store.is_hydrated();
    info!(hydrated, "node data loaded");
    hydrated
}

async fn fetch_core(
    transport: &dyn NodeTransport,
) -> Result<(NodeConfiguration, Option<String>, NetworkStatus), SdkError> {
    let config = transport
        .node_configuration()
        .await
        .map_err(SdkError::into_transport)?;
    let run_status = transport
        .node_status()
        .await
        .map_err(SdkError::into_transport)?;
    let status = transport.status().await.map_err(SdkError::into_transport)?;
    Ok((config, run_status, status))
}

async fn load_wallet(transport: &dyn NodeTransport, store: &NodeStore, epoch: u64) {
    let (node_address, wallet_address, balance) = tokio::join!(
        transport.node_address(),
        transport.wallet_address(),
        transport.node_balance(),
    );

    match node_address {
        Ok(Some(address)) => {
            store.update_in(epoch, |s| s.node_address = address);
        }
        Ok(None) => {}
        Err(e) => partial_failure("node address", &e),
    }
    match wallet_address {
        Ok(Some(address)) => {
            store.update_in(epoch, |s| s.public_address = address);
        }
        Ok(None) => {}
        Err(e) => partial_failure("wallet address", &e),
    }
    match balance {
        Ok(Some(balance)) => {
            store.update_in(epoch, |s| s.node_balance = balance);
        }
        Ok(None) => {}
        Err(e) => partial_failure("balance", &e),
    }
}

fn partial_failure(what: &str, cause: &SdkError) {
    let err = SdkError::HydrationPartialFailure(format!("{what}: {cause}"));
    warn!(error = %err, "wallet field not loaded");
}
