use super::KeyParams;
use crate::encoding::hash_encoded;
use crate::errors::CoreError;
use crate::hash::{DataHash, HashAlgorithm};
use crate::signing::SigningService;
use crate::transaction::{Transaction, TransactionData};
use crate::types::{TokenId, TokenType};

/// Predicate whose reference hides the owner key behind a nonce.
///
/// `reference = hash = H(enc("MASKED", tokenId, tokenType, algorithm, hashAlgorithm, publicKey, nonce))`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskedPredicate {
    params: KeyParams,
    reference: DataHash,
    hash: DataHash,
}

impl MaskedPredicate {
    /// Creates a masked predicate owned by `signing_service`.
    pub fn create(
        token_id: &TokenId,
        token_type: &TokenType,
        signing_service: &SigningService,
        hash_algorithm: HashAlgorithm,
        nonce: &[u8],
    ) -> Result<Self, CoreError> {
        let params = KeyParams {
            public_key: signing_service.public_key(),
            algorithm: signing_service.algorithm(),
            hash_algorithm,
            nonce: nonce.to_vec(),
        };
        Self::from_params(token_id, token_type, params)
    }

    pub(super) fn from_params(token_id: &TokenId, token_type: &TokenType, params: KeyParams) -> Result<Self, CoreError> {
        let reference = hash_encoded(
            params.hash_algorithm,
            &(
                "MASKED",
                token_id.as_bytes(),
                token_type.as_bytes(),
                params.algorithm.as_str(),
                params.hash_algorithm.tag(),
                &params.public_key,
                &params.nonce,
            ),
        )?;

        Ok(Self {
            hash: reference.clone(),
            reference,
            params,
        })
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
