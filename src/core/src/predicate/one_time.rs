use super::{digest_parts, KeyParams};
use crate::address::Address;
use crate::encoding::hash_encoded;
use crate::errors::CoreError;
use crate::hash::{DataHash, HashAlgorithm};
use crate::signing::SigningService;
use crate::transaction::{Transaction, TransactionData};
use crate::types::{TokenId, TokenType};

/// Predicate bound to a single-use address.
///
/// The hash commits to the one-time address string as well as the reference:
/// `hash = H(reference.imprint || OneTimeAddress(reference).to_string())`.
/// A state locked by it can only be created by a transaction recorded to that
/// exact address; import rejects any other recipient form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OneTimeAddressPredicate {
    params: KeyParams,
    reference: DataHash,
    hash: DataHash,
}

impl OneTimeAddressPredicate {
    /// Creates a one-time predicate; `nonce` makes the address unique.
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
                "ONE_TIME_ADDRESS",
                token_id.as_bytes(),
                token_type.as_bytes(),
                params.algorithm.as_str(),
                params.hash_algorithm.tag(),
                &params.public_key,
                &params.nonce,
            ),
        )?;
        let hash = Self::bind_address(params.hash_algorithm, &reference);

        Ok(Self {
            params,
            reference,
            hash,
        })
    }

    fn bind_address(algorithm: HashAlgorithm, reference: &DataHash) -> DataHash {
        let address = Address::OneTime(reference.clone()).to_string();
        digest_parts(algorithm, &[&reference.imprint(), address.as_bytes()])
    }

    /// The one-time address of this predicate.
    pub fn address(&self) -> Address {
        Address::OneTime(self.reference.clone())
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
