//! Authenticators and inclusion proofs returned by the aggregator.

use crate::encoding::{self, hex_bytes};
use crate::errors::CoreError;
use crate::hash::{DataHash, DataHasher, HashAlgorithm};
use crate::request_id::RequestId;
use crate::signing::{Signature, SignatureAlgorithm, SigningService};
use crate::smt::MerkleTreePath;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Signature by the owner of a state over the hash of the transaction spending it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authenticator {
    /// Signature algorithm of the owner key
    pub algorithm: SignatureAlgorithm,
    /// Hash algorithm of the signed transaction hash
    pub hash_algorithm: HashAlgorithm,
    /// Owner public key
    #[serde(with = "hex_bytes")]
    pub public_key: Vec<u8>,
    /// Signature over the transaction hash imprint
    pub signature: Signature,
    /// Hash of the state being spent
    pub state_hash: DataHash,
}

impl Authenticator {
    /// Signs a transaction hash on behalf of the owner of `state_hash`.
    pub fn create(
        signing_service: &SigningService,
        transaction_hash: &DataHash,
        state_hash: &DataHash,
    ) -> Self {
        Self {
            algorithm: signing_service.algorithm(),
            hash_algorithm: transaction_hash.algorithm(),
            public_key: signing_service.public_key(),
            signature: signing_service.sign(transaction_hash),
            state_hash: state_hash.clone(),
        }
    }

    /// Checks the signature over a transaction hash.
    pub fn verify(&self, transaction_hash: &DataHash) -> bool {
        if transaction_hash.algorithm() != self.hash_algorithm {
            return false;
        }

        match self.algorithm {
            SignatureAlgorithm::Ed25519 => SigningService::verify_with_public_key(
                transaction_hash,
                &self.signature,
                &self.public_key,
            ),
        }
    }

    /// The request id this authenticator spends.
    pub fn request_id(&self) -> RequestId {
        RequestId::create(&self.public_key, &self.state_hash)
    }

    /// Canonical binary encoding.
    pub fn encode(&self) -> Result<Vec<u8>, CoreError> {
        encoding::encode(&(
            self.algorithm.as_str(),
            self.hash_algorithm.tag(),
            &self.public_key,
            &self.signature.0[..],
            self.state_hash.imprint(),
        ))
    }
}

/// The value stored in the aggregator tree for a commitment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafValue(Vec<u8>);

impl LeafValue {
    /// `SHA256(enc(authenticator) || transaction_hash.imprint)`, as imprint bytes.
    pub fn create(authenticator: &Authenticator, transaction_hash: &DataHash) -> Result<Self, CoreError> {
        let hash = DataHasher::new(HashAlgorithm::Sha256)
            .update(authenticator.encode()?)
            .update(transaction_hash.imprint())
            .digest();
        Ok(LeafValue(hash.imprint()))
    }

    /// The raw leaf bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the value, returning the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Outcome of verifying an inclusion proof against a request id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InclusionProofVerificationStatus {
    /// The commitment is included and authenticated
    Ok,
    /// The path does not lead to the stated root
    PathInvalid,
    /// The tree does not hold this commitment (yet)
    PathNotIncluded,
    /// The authenticator is missing, incomplete or forged
    NotAuthenticated,
}

impl fmt::Display for InclusionProofVerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InclusionProofVerificationStatus::Ok => "OK",
            InclusionProofVerificationStatus::PathInvalid => "PATH_INVALID",
            InclusionProofVerificationStatus::PathNotIncluded => "PATH_NOT_INCLUDED",
            InclusionProofVerificationStatus::NotAuthenticated => "NOT_AUTHENTICATED",
        };
        write!(f, "{}", name)
    }
}

/// Proof that a commitment is (or is not) in the aggregator tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProof {
    /// Path from the request id position to the root
    pub merkle_tree_path: MerkleTreePath,
    /// Authenticator of the included commitment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator: Option<Authenticator>,
    /// Transaction hash of the included commitment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<DataHash>,
}

impl InclusionProof {
    /// Creates a proof from its parts.
    pub fn new(
        merkle_tree_path: MerkleTreePath,
        authenticator: Option<Authenticator>,
        transaction_hash: Option<DataHash>,
    ) -> Self {
        Self {
            merkle_tree_path,
            authenticator,
            transaction_hash,
        }
    }

    /// Verifies the proof for a request id.
    ///
    /// Authentication is checked before the path, so a forged authenticator
    /// is reported as [`InclusionProofVerificationStatus::NotAuthenticated`]
    /// even on a valid path.
    pub fn verify(&self, request_id: &RequestId) -> InclusionProofVerificationStatus {
        match (&self.authenticator, &self.transaction_hash) {
            (Some(authenticator), Some(transaction_hash)) => {
                if !authenticator.verify(transaction_hash) {
                    debug!("Authenticator signature does not verify for {}", request_id);
                    return InclusionProofVerificationStatus::NotAuthenticated;
                }

                if authenticator.request_id() != *request_id {
                    debug!("Authenticator belongs to a different request than {}", request_id);
                    return InclusionProofVerificationStatus::NotAuthenticated;
                }

                let leaf = match LeafValue::create(authenticator, transaction_hash) {
                    Ok(leaf) => leaf,
                    Err(_) => return InclusionProofVerificationStatus::NotAuthenticated,
                };

                if self.merkle_tree_path.leaf_value() != Some(leaf.as_bytes()) {
                    return InclusionProofVerificationStatus::PathNotIncluded;
                }
            }
            (None, None) => {}
            _ => return InclusionProofVerificationStatus::NotAuthenticated,
        }

        let result = self.merkle_tree_path.verify(request_id);
        if !result.is_path_valid {
            return InclusionProofVerificationStatus::PathInvalid;
        }

        if !result.is_path_included {
            return InclusionProofVerificationStatus::PathNotIncluded;
        }

        // An included leaf must come with the commitment that produced it
        if self.authenticator.is_none() {
            return InclusionProofVerificationStatus::NotAuthenticated;
        }

        InclusionProofVerificationStatus::Ok
    }

    /// Whether the proof carries an authenticated commitment.
    pub fn is_authenticated(&self) -> bool {
        self.authenticator.is_some() && self.transaction_hash.is_some()
    }
}

impl fmt::Display for InclusionProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InclusionProof {{ root: {}, authenticated: {} }}",
            self.merkle_tree_path.root,
            self.is_authenticated()
        )
    }
}
