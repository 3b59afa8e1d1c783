#![deny(missing_docs)]

//! # Casanode Models
//!
//! Core data types for the Casanode node-management client.
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`claim`] | Pairing payload scanned from a QR code / deep link |
//! | [`api`] | Response shapes of the node management API |
//! | [`node`] | Cached node snapshot and wallet balance |
//! | [`route`] | Application route table (protected / node-scoped sets) |
//! | [`device`] | Paired device registry entries |

pub mod api;
pub mod claim;
pub mod device;
pub mod error;
pub mod node;
pub mod route;

// Re-export all public types at crate root for convenience.
pub use api::*;
pub use claim::*;
pub use device::*;
pub use error::*;
pub use node::*;
pub use route::*;
