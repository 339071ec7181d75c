//! Error types for the client crate.

use crate::aggregator::SubmitStatus;
use thiserror::Error;
use tokenchain_core::CoreError;

/// Errors that can occur while talking to the aggregator or driving a transfer.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Error raised by core verification or encoding.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error when the aggregator cannot be reached or answers garbage.
    #[error("Network error: {0}")]
    Network(String),

    /// Error returned by the aggregator in a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message
        message: String,
    },

    /// Error when the aggregator refuses a commitment.
    #[error("Commitment rejected: {0}")]
    SubmitRejected(SubmitStatus),

    /// Error when an inclusion proof is present but wrong.
    #[error("Invalid inclusion proof: {0}")]
    InvalidInclusionProof(String),

    /// Error when no inclusion proof arrived in time.
    #[error("Timed out waiting for inclusion proof")]
    Timeout,

    /// Error when the caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,

    /// Error when the caller asked for a transition the token does not allow.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Error when the configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether repeating the same request may succeed.
    ///
    /// Conflicts such as `REQUEST_ID_EXISTS` are final: the state is already spent.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        ClientError::Network(error.to_string())
    }
}
