use crate::encoding::hash_encoded;
use crate::errors::CoreError;
use crate::hash::{DataHash, HashAlgorithm};
use crate::transaction::{Transaction, TransactionData};
use crate::types::{TokenId, TokenType};
use tracing::debug;

/// Terminal predicate: a burned state can never be spent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BurnPredicate {
    reference: DataHash,
}

impl BurnPredicate {
    /// `reference = hash = H(enc("BURN", tokenId, tokenType))`
    pub fn create(token_id: &TokenId, token_type: &TokenType) -> Result<Self, CoreError> {
        let reference = hash_encoded(
            HashAlgorithm::Sha256,
            &("BURN", token_id.as_bytes(), token_type.as_bytes()),
        )?;
        Ok(Self { reference })
    }

    pub fn reference(&self) -> &DataHash {
        &self.reference
    }

    pub fn hash(&self) -> &DataHash {
        &self.reference
    }

    pub(super) fn verify(&self, _transaction: &Transaction<TransactionData>) -> bool {
        debug!("Refusing to unlock burned state {}", self.reference);
        false
    }
}
