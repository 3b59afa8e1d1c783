//! SDK error types.
//!
//! [`SdkError`] is the single error type returned by every fallible
//! operation in the SDK. The session guard and the hydrator convert raw
//! transport failures into the taxonomy below at their boundary, so callers
//! above them only ever see [`SdkError::MalformedClaim`],
//! [`SdkError::AuthenticationFailure`], [`SdkError::Transport`] or
//! [`SdkError::HydrationPartialFailure`].

use casanode_models::ModelError;

/// Error type for all SDK operations.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// Invalid or missing configuration (e.g. bad URL, unusable data dir).
    #[error("configuration error: {0}")]
    Config(String),

    /// The scanned claim link could not be parsed.
    #[error("malformed claim: {0}")]
    MalformedClaim(String),

    /// A login or refresh exchange returned no usable token.
    #[error("authentication failed: {0}")]
    AuthenticationFailure(String),

    /// Network or connection failure, already converted at a component boundary.
    #[error("transport error: {0}")]
    Transport(String),

    /// One best-effort wallet fetch failed during hydration.
    #[error("partial hydration failure: {0}")]
    HydrationPartialFailure(String),

    /// The node answered with a non-success status.
    #[error("node returned {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// HTTP request failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization / deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other model validation error.
    #[error(transparent)]
    Model(ModelError),
}

impl From<ModelError> for SdkError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::MalformedClaim { .. } | ModelError::UnrecognizedFixture(_) => {
                SdkError::MalformedClaim(e.to_string())
            }
            other => SdkError::Model(other),
        }
    }
}

impl SdkError {
    /// Collapse raw I/O-level failures into [`SdkError::Transport`].
    ///
    /// Taxonomy variants pass through untouched.
    pub fn into_transport(self) -> Self {
        match self {
            SdkError::Http(_)
            | SdkError::Server { .. }
            | SdkError::Io(_)
            | SdkError::Serialization(_) => SdkError::Transport(self.to_string()),
            other => other,
        }
    }
}
