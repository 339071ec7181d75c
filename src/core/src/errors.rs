//! Error types for the core crate.

use crate::proofs::InclusionProofVerificationStatus;
use thiserror::Error;

/// Errors that can occur in the core crate.
///
/// Format errors reject serialized input outright. Verification errors are
/// always terminal for the token being imported; nothing partial is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Error when serialized input is malformed.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Error when a serialized token carries an unknown version tag.
    #[error("Unsupported token version: expected {expected}, got {actual}")]
    UnsupportedVersion {
        /// The version this implementation understands
        expected: String,
        /// The version found in the input
        actual: String,
    },

    /// Error when a hex string cannot be decoded.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Error when a hash imprint is malformed or uses an unknown algorithm.
    #[error("Invalid imprint: {0}")]
    InvalidImprint(String),

    /// Error when an address string cannot be parsed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Error when an address checksum does not match its payload.
    #[error("Invalid address checksum: {0}")]
    InvalidChecksum(String),

    /// Error when a public key or signature is malformed.
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    /// Error when serialization or deserialization fails.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Error when a token has no genesis transaction.
    #[error("Token has no mint transaction")]
    MissingGenesis,

    /// Error when the mint transaction disagrees with the token it created.
    #[error("Token mismatch: {0}")]
    TokenMismatch(String),

    /// Error when the recorded recipient differs from the address of the next state.
    #[error("Address mismatch at transaction {index}: expected {expected}, got {actual}")]
    AddressMismatch {
        /// Position of the transaction in the history (mint is 0)
        index: usize,
        /// The address derived from the destination predicate
        expected: String,
        /// The address recorded in the transaction
        actual: String,
    },

    /// Error when the next state's data does not match the committed data hash.
    #[error("Data mismatch at transaction {index}")]
    DataMismatch {
        /// Position of the transaction in the history (mint is 0)
        index: usize,
    },

    /// Error when the genesis transaction fails verification.
    #[error("Mint verification failed: {0}")]
    MintVerificationFailed(String),

    /// Error when an inclusion proof does not verify as OK.
    #[error("Inclusion proof failed at transaction {index}: {status}")]
    InclusionProofFailed {
        /// Position of the transaction in the history (mint is 0)
        index: usize,
        /// The status returned by the proof verification
        status: InclusionProofVerificationStatus,
    },

    /// Error when a predicate refuses to unlock a state.
    #[error("Predicate verification failed at transaction {index}: {reason}")]
    PredicateVerificationFailed {
        /// Position of the transaction in the history (mint is 0)
        index: usize,
        /// What was rejected
        reason: String,
    },

    /// Error when a name-tag token referenced by an address is not available.
    #[error("Name tag token not found: {0}")]
    NametagNotFound(String),

    /// Error when name-tag resolution revisits a token.
    #[error("Name tag resolution cycle through {0}")]
    NametagCycle(String),

    /// Error when inserting a leaf that already exists in the tree.
    #[error("Leaf already exists: {0}")]
    LeafExists(String),
}

impl From<hex::FromHexError> for CoreError {
    fn from(error: hex::FromHexError) -> Self {
        CoreError::InvalidHex(error.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(error: serde_json::Error) -> Self {
        CoreError::InvalidFormat(error.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(error: bincode::Error) -> Self {
        CoreError::SerializationError(error.to_string())
    }
}
