use super::{digest_parts, KeyParams};
use crate::encoding::hash_encoded;
use crate::errors::CoreError;
use crate::hash::{DataHash, HashAlgorithm};
use crate::signing::{Signature, SigningService};
use crate::transaction::{Transaction, TransactionData};
use crate::types::{TokenId, TokenType};

/// Predicate with a reusable reference: the owner key is visible in it.
///
/// The nonce is the owner's signature over `SHA256(salt)` of the transaction
/// that created the state, so each state still gets a fresh hash:
/// `hash = H(reference.imprint || nonce)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnmaskedPredicate {
    params: KeyParams,
    reference: DataHash,
    hash: DataHash,
}

impl UnmaskedPredicate {
    /// Creates an unmasked predicate for the state produced by a transaction with `salt`.
    pub fn create(
        token_id: &TokenId,
        token_type: &TokenType,
        signing_service: &SigningService,
        hash_algorithm: HashAlgorithm,
        salt: &[u8],
    ) -> Result<Self, CoreError> {
        let nonce = signing_service.sign(&DataHash::sha256(salt));
        let params = KeyParams {
            public_key: signing_service.public_key(),
            algorithm: signing_service.algorithm(),
            hash_algorithm,
            nonce: nonce.to_bytes().to_vec(),
        };
        Self::from_params(token_id, token_type, params)
    }

    pub(super) fn from_params(token_id: &TokenId, token_type: &TokenType, params: KeyParams) -> Result<Self, CoreError> {
        let reference = Self::calculate_reference(token_id, token_type, &params)?;
        let hash = digest_parts(params.hash_algorithm, &[&reference.imprint(), &params.nonce]);

        Ok(Self {
            params,
            reference,
            hash,
        })
    }

    /// The reference an unmasked predicate of this owner would have for a token.
    ///
    /// Independent of the salt, so a sender can build the address up front.
    pub fn calculate_reference(
        token_id: &TokenId,
        token_type: &TokenType,
        params: &KeyParams,
    ) -> Result<DataHash, CoreError> {
        hash_encoded(
            params.hash_algorithm,
            &(
                "UNMASKED",
                token_id.as_bytes(),
                token_type.as_bytes(),
                params.algorithm.as_str(),
                params.hash_algorithm.tag(),
                &params.public_key,
            ),
        )
    }

    /// Checks that the nonce is the owner's signature over `SHA256(salt)`.
    pub fn verify_nonce(&self, salt: &[u8]) -> bool {
        match Signature::from_slice(&self.params.nonce) {
            Ok(signature) => SigningService::verify_with_public_key(
                &DataHash::sha256(salt),
                &signature,
                &self.params.public_key,
            ),
            Err(_) => false,
        }
    }

    pub fn params(&self) -> &KeyParams {
        &self.params
    }

    pub fn reference(&self) -> &DataHash {
        &self.reference
    }

    pub fn hash(&self) -> &DataHash {
        &self.hash
    }

    pub(super) fn verify(&self, transaction: &Transaction<TransactionData>) -> bool {
        self.params.verify_transaction(transaction)
    }
}
