//! Error types for the DDNS system
//!
//! The variants follow the failure classes of a reconcile pass: a bad
//! configuration stops the run before any network activity, IP detection
//! and provider transport failures abort the pass, a DNS lookup failure is
//! downgraded by the caller, and a structured provider rejection only
//! abandons the sub-action that triggered it.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration missing, unreadable or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The IP echo endpoint could not be reached or returned nothing usable
    #[error("Network error: {0}")]
    Network(String),

    /// Forward lookup of the managed name failed
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Structured rejection returned by the provider API
    #[error("Provider API error [{code}]: {message}")]
    ProviderApi {
        /// Provider error code (e.g. `InvalidParameter.DomainRecordExist`)
        code: String,
        /// Human readable message from the provider
        message: String,
    },

    /// Provider API unreachable or answered outside its own error taxonomy
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a network (IP detection) error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a provider API error
    pub fn provider_api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderApi {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Whether this is a structured rejection from the provider API.
    ///
    /// The reconciler logs these and moves on to the next sub-action;
    /// everything else aborts the pass.
    pub fn is_api_rejection(&self) -> bool {
        matches!(self, Self::ProviderApi { .. })
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
