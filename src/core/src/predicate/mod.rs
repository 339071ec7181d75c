//! Unlock predicates: the ownership rules attached to token states.
//!
//! Every predicate has a `reference` built only from values the sender of a
//! transfer can know in advance (it is what addresses are derived from) and a
//! `hash` that commits the state to the predicate. For masked and burn
//! predicates the two coincide.

mod burn;
mod masked;
mod one_time;
mod public_key;
mod unmasked;

pub use burn::BurnPredicate;
pub use masked::MaskedPredicate;
pub use one_time::OneTimeAddressPredicate;
pub use public_key::PublicKeyPredicate;
pub use unmasked::UnmaskedPredicate;

use crate::address::{Address, AddressScheme};
use crate::encoding::hex_bytes_opt;
use crate::errors::CoreError;
use crate::hash::{DataHash, DataHasher, HashAlgorithm};
use crate::proofs::InclusionProofVerificationStatus;
use crate::request_id::RequestId;
use crate::signing::SignatureAlgorithm;
use crate::transaction::{Transaction, TransactionData, TransactionPayload};
use crate::types::{TokenId, TokenType};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Predicate discriminator, as written in the `type` field of the wire form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredicateType {
    /// Owner key hidden behind a nonce
    Masked,
    /// Owner key visible in the reference
    Unmasked,
    /// No owner; the state can never be spent
    Burn,
    /// Bound to a single-use address
    OneTimeAddress,
    /// Addressed by a bare public key
    PublicKey,
}

impl PredicateType {
    /// The wire name of this predicate type.
    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateType::Masked => "MASKED",
            PredicateType::Unmasked => "UNMASKED",
            PredicateType::Burn => "BURN",
            PredicateType::OneTimeAddress => "ONE_TIME_ADDRESS",
            PredicateType::PublicKey => "PUBLIC_KEY",
        }
    }
}

impl fmt::Display for PredicateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wire form of a predicate. Token id and type come from the enclosing token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredicateDto {
    /// Predicate kind
    #[serde(rename = "type")]
    pub predicate_type: PredicateType,
    /// Owner public key, absent for burn predicates
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_bytes_opt")]
    pub public_key: Option<Vec<u8>>,
    /// Signature algorithm of the owner key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<SignatureAlgorithm>,
    /// Hash algorithm of the predicate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_algorithm: Option<HashAlgorithm>,
    /// Predicate nonce
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_bytes_opt")]
    pub nonce: Option<Vec<u8>>,
}

/// Key material shared by every key-bearing predicate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyParams {
    /// Owner public key
    pub public_key: Vec<u8>,
    /// Signature algorithm of the owner key
    pub algorithm: SignatureAlgorithm,
    /// Hash algorithm used for references and transaction hashes
    pub hash_algorithm: HashAlgorithm,
    /// Predicate nonce (derived from the creating transaction's salt for
    /// unmasked and public-key predicates)
    pub nonce: Vec<u8>,
}

impl KeyParams {
    fn from_dto(dto: &PredicateDto) -> Result<Self, CoreError> {
        let missing = |field: &str| {
            CoreError::InvalidFormat(format!("{} predicate requires {}", dto.predicate_type, field))
        };

        Ok(Self {
            public_key: dto.public_key.clone().ok_or_else(|| missing("publicKey"))?,
            algorithm: dto.algorithm.ok_or_else(|| missing("algorithm"))?,
            hash_algorithm: dto.hash_algorithm.ok_or_else(|| missing("hashAlgorithm"))?,
            nonce: dto.nonce.clone().ok_or_else(|| missing("nonce"))?,
        })
    }

    fn to_dto(&self, predicate_type: PredicateType) -> PredicateDto {
        PredicateDto {
            predicate_type,
            public_key: Some(self.public_key.clone()),
            algorithm: Some(self.algorithm),
            hash_algorithm: Some(self.hash_algorithm),
            nonce: Some(self.nonce.clone()),
        }
    }

    /// Checks that a transfer was authorized by the owner of this key.
    ///
    /// Never errors; every failure is `false`.
    fn verify_transaction(&self, transaction: &Transaction<TransactionData>) -> bool {
        let proof = &transaction.inclusion_proof;
        let source_hash = transaction.data.source_state_hash();

        let authenticator = match &proof.authenticator {
            Some(authenticator) => authenticator,
            None => {
                debug!("Transaction has no authenticator");
                return false;
            }
        };

        if authenticator.public_key != self.public_key || authenticator.algorithm != self.algorithm {
            debug!("Authenticator key does not belong to the predicate owner");
            return false;
        }

        if authenticator.state_hash != source_hash {
            debug!("Authenticator signs a different source state");
            return false;
        }

        let transaction_hash = match &proof.transaction_hash {
            Some(hash) => hash,
            None => return false,
        };

        match transaction.data.calculate_hash(self.hash_algorithm) {
            Ok(expected) if expected == *transaction_hash => {}
            _ => {
                debug!("Recorded transaction hash does not match transaction data");
                return false;
            }
        }

        if !authenticator.verify(transaction_hash) {
            debug!("Authenticator signature does not verify");
            return false;
        }

        let request_id = RequestId::create(&self.public_key, &source_hash);
        let status = proof.verify(&request_id);
        if status != InclusionProofVerificationStatus::Ok {
            debug!("Inclusion proof for {} is {}", request_id, status);
            return false;
        }

        true
    }
}

/// Hashes the concatenation of byte strings.
fn digest_parts(algorithm: HashAlgorithm, parts: &[&[u8]]) -> DataHash {
    parts
        .iter()
        .fold(DataHasher::new(algorithm), |hasher, part| hasher.update(*part))
        .digest()
}

/// An unlock predicate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    Masked(MaskedPredicate),
    Unmasked(UnmaskedPredicate),
    Burn(BurnPredicate),
    OneTimeAddress(OneTimeAddressPredicate),
    PublicKey(PublicKeyPredicate),
}

impl Predicate {
    /// Rebuilds a predicate from its wire form for a given token.
    ///
    /// The reference and hash are recomputed, never read from the input.
    pub fn from_dto(token_id: &TokenId, token_type: &TokenType, dto: &PredicateDto) -> Result<Self, CoreError> {
        match dto.predicate_type {
            PredicateType::Burn => Ok(Predicate::Burn(BurnPredicate::create(token_id, token_type)?)),
            PredicateType::Masked => Ok(Predicate::Masked(MaskedPredicate::from_params(
                token_id,
                token_type,
                KeyParams::from_dto(dto)?,
            )?)),
            PredicateType::Unmasked => Ok(Predicate::Unmasked(UnmaskedPredicate::from_params(
                token_id,
                token_type,
                KeyParams::from_dto(dto)?,
            )?)),
            PredicateType::OneTimeAddress => Ok(Predicate::OneTimeAddress(
                OneTimeAddressPredicate::from_params(token_id, token_type, KeyParams::from_dto(dto)?)?,
            )),
            PredicateType::PublicKey => Ok(Predicate::PublicKey(PublicKeyPredicate::from_params(
                token_id,
                token_type,
                KeyParams::from_dto(dto)?,
            )?)),
        }
    }

    /// The wire form of this predicate.
    pub fn to_dto(&self) -> PredicateDto {
        match self.key_params() {
            Some(params) => params.to_dto(self.predicate_type()),
            None => PredicateDto {
                predicate_type: self.predicate_type(),
                public_key: None,
                algorithm: None,
                hash_algorithm: None,
                nonce: None,
            },
        }
    }

    pub fn predicate_type(&self) -> PredicateType {
        match self {
            Predicate::Masked(_) => PredicateType::Masked,
            Predicate::Unmasked(_) => PredicateType::Unmasked,
            Predicate::Burn(_) => PredicateType::Burn,
            Predicate::OneTimeAddress(_) => PredicateType::OneTimeAddress,
            Predicate::PublicKey(_) => PredicateType::PublicKey,
        }
    }

    /// Sender-computable reference; addresses are derived from it.
    pub fn reference(&self) -> &DataHash {
        match self {
            Predicate::Masked(p) => p.reference(),
            Predicate::Unmasked(p) => p.reference(),
            Predicate::Burn(p) => p.reference(),
            Predicate::OneTimeAddress(p) => p.reference(),
            Predicate::PublicKey(p) => p.reference(),
        }
    }

    /// Commitment of the state to this predicate.
    pub fn hash(&self) -> &DataHash {
        match self {
            Predicate::Masked(p) => p.hash(),
            Predicate::Unmasked(p) => p.hash(),
            Predicate::Burn(p) => p.hash(),
            Predicate::OneTimeAddress(p) => p.hash(),
            Predicate::PublicKey(p) => p.hash(),
        }
    }

    /// Key material, absent for burn predicates.
    pub fn key_params(&self) -> Option<&KeyParams> {
        match self {
            Predicate::Masked(p) => Some(p.params()),
            Predicate::Unmasked(p) => Some(p.params()),
            Predicate::Burn(_) => None,
            Predicate::OneTimeAddress(p) => Some(p.params()),
            Predicate::PublicKey(p) => Some(p.params()),
        }
    }

    /// Owner public key, absent for burn predicates.
    pub fn public_key(&self) -> Option<&[u8]> {
        self.key_params().map(|params| params.public_key.as_slice())
    }

    /// Whether `public_key` owns states locked by this predicate.
    pub fn is_owner(&self, public_key: &[u8]) -> bool {
        self.public_key() == Some(public_key)
    }

    /// Decides whether a transfer may spend the state this predicate locks.
    ///
    /// Deterministic and side-effect free.
    pub fn verify(&self, transaction: &Transaction<TransactionData>) -> bool {
        if transaction.data.source_state.unlock_predicate().hash() != self.hash() {
            debug!("Transaction spends a state locked by a different predicate");
            return false;
        }

        match self {
            Predicate::Masked(p) => p.verify(transaction),
            Predicate::Unmasked(p) => p.verify(transaction),
            Predicate::Burn(p) => p.verify(transaction),
            Predicate::OneTimeAddress(p) => p.verify(transaction),
            Predicate::PublicKey(p) => p.verify(transaction),
        }
    }

    /// Derives the address of this predicate in a given scheme.
    ///
    /// Direct and pointer addresses exist for every predicate. One-time and
    /// public-key addresses exist only for their own predicate kinds.
    pub fn address(&self, scheme: AddressScheme) -> Result<Address, CoreError> {
        match (scheme, self) {
            (AddressScheme::Direct, _) => Ok(Address::direct(self.reference())),
            (AddressScheme::Pointer, _) => Ok(Address::pointer(self.reference())),
            (AddressScheme::OneTime, Predicate::OneTimeAddress(p)) => Ok(p.address()),
            (AddressScheme::PublicKey, Predicate::PublicKey(p)) => Ok(p.address()),
            (scheme, predicate) => Err(CoreError::InvalidAddress(format!(
                "{} predicate has no {} address",
                predicate.predicate_type(),
                scheme
            ))),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Predicate({})", self.predicate_type(), self.reference())
    }
}
