//! # Casanode SDK
//!
//! Session and connection orchestration for a **Casanode** device's
//! node-management API.
//!
//! The SDK provides:
//!
//! * [`Session`]: the top-level context that owns every store, pairs from a
//!   scanned claim link and answers navigation checks.
//! * [`SessionGuard`]: bearer lifecycle state machine with single-flight
//!   proactive refresh.
//! * [`NodeHydrator`]: lazy, de-duplicated loading of the [`NodeSnapshot`].
//! * [`NavigationGate`]: allow / redirect decision for every route.
//! * [`NodeTransport`] / [`HttpTransport`]: the transport contract and its
//!   reqwest implementation.
//! * [`SdkError`]: unified error type for all SDK operations.
//!
//! Types from [`casanode_models`] are re-exported for convenience.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use casanode_sdk::{Navigation, Route, SdkConfig, Session};
//!
//! # async fn run() -> Result<(), casanode_sdk::SdkError> {
//! let session = Session::open(SdkConfig::from_env())?;
//!
//! session
//!     .pair_from_url("https://casanode.io/claim?device=d1&code=c1&ap=Casa&pw=secret")
//!     .await?;
//!
//! match session.navigate(Route::NodeDashboard).await {
//!     Navigation::Allow => println!("{}", session.node().snapshot().moniker),
//!     Navigation::Redirect(route) => println!("redirected to {}", route.path()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod credentials;
pub mod devices;
pub mod error;
pub mod gate;
pub mod guard;
pub mod http;
pub mod hydrator;
pub mod jwt;
pub mod session;
pub mod single_flight;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::SdkConfig;
pub use connection::{ConnectionParameters, ConnectionStore};
pub use credentials::{Credential, CredentialStore};
pub use devices::DeviceStore;
pub use error::SdkError;
pub use gate::{Navigation, NavigationGate};
pub use guard::{SessionEvent, SessionGuard, SessionState};
pub use http::HttpTransport;
pub use hydrator::{NodeHydrator, NodeStore, NotReady};
pub use session::Session;
pub use single_flight::SingleFlight;
pub use transport::NodeTransport;

// Re-export model types used throughout the public API.
pub use casanode_models::{
    AuthTokens, ClaimPayload, DeviceEntry, ModelError, NodeBalance, NodeSnapshot, Route,
};
