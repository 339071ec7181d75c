use super::{digest_parts, KeyParams};
use crate::address::Address;
use crate::encoding::hash_encoded;
use crate::errors::CoreError;
use crate::hash::{DataHash, HashAlgorithm};
use crate::signing::SigningService;
use crate::transaction::{Transaction, TransactionData};
use crate::types::{TokenId, TokenType};

/// Predicate addressed by a bare public key.
///
/// The reference covers only the token type and the key, so one `PK://`
/// address receives any number of tokens of that type. The hash mixes in the
/// token id and nonce: `hash = H(reference.imprint || tokenId || nonce)`.
///
/// The nonce is `SHA256(salt)` of the transaction that created the state. It
/// is fully determined by that transaction, so a received state has exactly
/// one hash and one request id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKeyPredicate {
    params: KeyParams,
    reference: DataHash,
    hash: DataHash,
}

impl PublicKeyPredicate {
    /// Creates a public-key predicate for the state produced by a transaction with `salt`.
    pub fn create(
        token_id: &TokenId,
        token_type: &TokenType,
        signing_service: &SigningService,
        hash_algorithm: HashAlgorithm,
        salt: &[u8],
    ) -> Result<Self, CoreError> {
        let params = KeyParams {
            public_key: signing_service.public_key(),
            algorithm: signing_service.algorithm(),
            hash_algorithm,
            nonce: Self::nonce_for(salt),
        };
        Self::from_params(token_id, token_type, params)
    }

    pub(super) fn from_params(token_id: &TokenId, token_type: &TokenType, params: KeyParams) -> Result<Self, CoreError> {
        let reference = hash_encoded(
            params.hash_algorithm,
            &(
                "PUBLIC_KEY",
                token_type.as_bytes(),
                params.algorithm.as_str(),
                params.hash_algorithm.tag(),
                &params.public_key,
            ),
        )?;
        let hash = digest_parts(
            params.hash_algorithm,
            &[&reference.imprint(), token_id.as_bytes(), &params.nonce],
        );

        Ok(Self {
            params,
            reference,
            hash,
        })
    }

    fn nonce_for(salt: &[u8]) -> Vec<u8> {
        DataHash::sha256(salt).data().to_vec()
    }

    /// Checks that the nonce is `SHA256(salt)` of the creating transaction.
    pub fn verify_nonce(&self, salt: &[u8]) -> bool {
        self.params.nonce == Self::nonce_for(salt)
    }

    /// The `PK://` address of the owner key.
    pub fn address(&self) -> Address {
        Address::PublicKey(self.params.public_key.clone())
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
