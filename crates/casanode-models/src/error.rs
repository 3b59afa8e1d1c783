//! Error types for the `casanode-models` crate.
//!
//! All fallible constructors and `FromStr` implementations in this crate
//! return variants of [`ModelError`].

/// Errors produced when parsing or validating model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A claim deep link could not be parsed as a URL.
    #[error("malformed claim URL \"{value}\": {reason}")]
    MalformedClaim {
        /// The value that failed to parse.
        value: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// A development claim fixture did not match any supported shape.
    #[error("unrecognized claim fixture: {0}")]
    UnrecognizedFixture(String),

    /// A balance string was not of the form `<amount> <denom>`.
    #[error("invalid balance \"{0}\"")]
    InvalidBalance(String),

    /// A path or name did not match any known route.
    #[error("unknown route: {0}")]
    UnknownRoute(String),
}
