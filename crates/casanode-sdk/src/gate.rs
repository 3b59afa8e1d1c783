//! Navigation gate.
//!
//! Every navigation to a protected route runs, in order and stopping at the
//! first failure:
//!
//! 1. the session guard (`ensure_authenticated`),
//! 2. the transport connection check,
//! 3. for node-scoped routes, the hydrator (`ensure_loaded`), falling back
//!    to a diagnosis of why the node is not ready.
//!
//! Failures are silent redirects; the gate never surfaces an error.

use std::sync::Arc;

use casanode_models::Route;
use tracing::{debug, info};

use crate::guard::SessionGuard;
use crate::hydrator::{NodeHydrator, NotReady};
use crate::transport::NodeTransport;

/// Outcome of a navigation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Show the requested route.
    Allow,
    /// Show this route instead.
    Redirect(Route),
}

/// Decides whether a route may be shown.
#[derive(Clone)]
pub struct NavigationGate {
    guard: SessionGuard,
    transport: Arc<dyn NodeTransport>,
    hydrator: NodeHydrator,
}

impl NavigationGate {
    /// Build a gate over the shared guard, transport and hydrator.
    pub fn new(
        guard: SessionGuard,
        transport: Arc<dyn NodeTransport>,
        hydrator: NodeHydrator,
    ) -> Self {
        Self {
            guard,
            transport,
            hydrator,
        }
    }

    /// Check a navigation to `route`.
    pub async fn check(&self, route: Route) -> Navigation {
        if !route.is_protected() {
            return Navigation::Allow;
        }

        if !self.guard.ensure_authenticated().await {
            info!(%route, "no valid session, redirecting to landing");
            return Navigation::Redirect(Route::LANDING);
        }

        if !self.transport.is_connected() {
            info!(%route, "not connected, redirecting to landing");
            return Navigation::Redirect(Route::LANDING);
        }

        if route.is_node_scoped() && !self.hydrator.ensure_loaded().await {
            let target = match self.hydrator.diagnose().await {
                NotReady::InstallationIncomplete => Route::ONBOARDING_ENTRY,
                NotReady::PassphraseLocked | NotReady::Unavailable => Route::LANDING,
            };
            info!(%route, %target, "node not ready, redirecting");
            return Navigation::Redirect(target);
        }

        debug!(%route, "navigation allowed");
        Navigation::Allow
    }
}
