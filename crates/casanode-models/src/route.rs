//! Application route table.
//!
//! Routes are identified by name (e.g. `NodeDashboard`) and by path
//! (e.g. `/node/dashboard`). The navigation gate only needs to know which
//! routes are protected, which belong to the node subtree, and where to
//! redirect.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::error::ModelError;

/// A navigable screen of the client.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Route {
    /// Public landing page.
    Home,

    /// Node manager shell.
    Node,
    /// Node dashboard.
    NodeDashboard,
    /// Node settings.
    NodeSettings,
    /// Wallet overview.
    NodeWallet,
    /// Start / stop / update actions.
    NodeActions,
    /// System information.
    NodeAbout,

    /// Onboarding entry.
    Wizard1Welcome,
    /// Factory reset step.
    Wizard1Reset,
    /// Moniker step.
    Wizard2Moniker,
    /// Keyring protection choice.
    Wizard6Protection,
    /// Passphrase entry.
    Wizard6Passphrase,
    /// Wallet choice.
    Wizard7Wallet,
    /// Wallet restore.
    Wizard7Restore,
    /// Wallet creation.
    Wizard7Create,
    /// Wallet funding.
    Wizard8Fund,
    /// Port checks.
    Wizard9Ports,
    /// Onboarding done.
    Wizard10Congratulations,
}

impl Route {
    /// Where failed checks send the user.
    pub const LANDING: Route = Route::Home;

    /// First step of the onboarding wizard.
    pub const ONBOARDING_ENTRY: Route = Route::Wizard1Welcome;

    /// Canonical path of the route.
    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Node => "/node",
            Route::NodeDashboard => "/node/dashboard",
            Route::NodeSettings => "/node/settings",
            Route::NodeWallet => "/node/wallet",
            Route::NodeActions => "/node/actions",
            Route::NodeAbout => "/node/about",
            Route::Wizard1Welcome => "/wizard/welcome",
            Route::Wizard1Reset => "/wizard/reset",
            Route::Wizard2Moniker => "/wizard/moniker",
            Route::Wizard6Protection => "/wizard/protection",
            Route::Wizard6Passphrase => "/wizard/passphrase",
            Route::Wizard7Wallet => "/wizard/wallet",
            Route::Wizard7Restore => "/wizard/wallet/recover",
            Route::Wizard7Create => "/wizard/wallet/create",
            Route::Wizard8Fund => "/wizard/wallet/fund",
            Route::Wizard9Ports => "/wizard/ports",
            Route::Wizard10Congratulations => "/wizard/congratulations",
        }
    }

    /// Resolve a path. `/wizard` is an alias of the onboarding entry.
    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        if trimmed == "/wizard" {
            return Some(Self::ONBOARDING_ENTRY);
        }
        Route::iter().find(|r| r.path() == trimmed)
    }

    /// Routes that require an authenticated, connected session.
    pub fn is_protected(self) -> bool {
        self != Route::Home
    }

    /// Routes that render node data and therefore need hydration.
    pub fn is_node_scoped(self) -> bool {
        matches!(
            self,
            Route::Node
                | Route::NodeDashboard
                | Route::NodeSettings
                | Route::NodeWallet
                | Route::NodeActions
                | Route::NodeAbout
        )
    }
}

impl FromStr for Route {
    type Err = ModelError;

    /// Accepts either a path (`/node/wallet`) or a route name (`NodeWallet`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('/') {
            return Route::from_path(s).ok_or_else(|| ModelError::UnknownRoute(s.to_string()));
        }
        Route::iter()
            .find(|r| r.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::UnknownRoute(s.to_string()))
    }
}
