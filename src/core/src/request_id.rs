//! Request identifiers: the keys under which commitments live in the aggregator tree.

use crate::errors::CoreError;
use crate::hash::{DataHash, DataHasher, HashAlgorithm};
use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// `SHA256(public_key || state_hash.imprint)`.
///
/// A state can be spent exactly once because the aggregator accepts a single
/// commitment per request id.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(DataHash);

impl RequestId {
    /// Derives the request id for a public key spending a state.
    pub fn create(public_key: &[u8], state_hash: &DataHash) -> Self {
        let hash = DataHasher::new(HashAlgorithm::Sha256)
            .update(public_key)
            .update(state_hash.imprint())
            .digest();
        RequestId(hash)
    }

    /// Wraps an existing hash as a request id.
    pub fn from_hash(hash: DataHash) -> Self {
        RequestId(hash)
    }

    /// Parses a hex-encoded imprint.
    pub fn from_hex(value: &str) -> Result<Self, CoreError> {
        Ok(RequestId(DataHash::from_hex(value)?))
    }

    /// The underlying hash.
    pub fn hash(&self) -> &DataHash {
        &self.0
    }

    /// Hex encoding of the imprint.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Position of this id in the sparse Merkle tree.
    ///
    /// The imprint is read as a big-endian integer with a leading `1` sentinel
    /// bit so that leading zero bits survive; the tree consumes bits starting
    /// from the least significant one.
    pub fn to_path(&self) -> BigUint {
        let mut bytes = Vec::with_capacity(35);
        bytes.push(1u8);
        bytes.extend_from_slice(&self.0.imprint());
        BigUint::from_bytes_be(&bytes)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.to_hex())
    }
}

impl Serialize for RequestId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(RequestId(DataHash::deserialize(deserializer)?))
    }
}
