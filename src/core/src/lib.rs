//! Core primitives for off-chain single-custody tokens.
//!
//! Tokens move between owners without a ledger: every transfer is committed
//! to an aggregator's sparse Merkle tree under a request id derived from the
//! spent state, and a token carries its own history with the inclusion proofs
//! needed to verify it. This crate holds the data model and all verification;
//! it performs no I/O.

pub mod address;
pub mod encoding;
pub mod errors;
pub mod factory;
pub mod hash;
pub mod nametag;
pub mod predicate;
pub mod proofs;
pub mod request_id;
pub mod signing;
pub mod smt;
pub mod token;
pub mod transaction;
pub mod types;

// Re-export commonly used types
pub use address::{Address, AddressScheme};
pub use errors::CoreError;
pub use factory::{RawDataDecoder, TokenDataDecoder, TokenFactory};
pub use hash::{DataHash, DataHasher, HashAlgorithm};
pub use nametag::resolve_address;
pub use predicate::{
    BurnPredicate, MaskedPredicate, OneTimeAddressPredicate, Predicate, PredicateDto, PredicateType,
    PublicKeyPredicate, UnmaskedPredicate,
};
pub use proofs::{Authenticator, InclusionProof, InclusionProofVerificationStatus, LeafValue};
pub use request_id::RequestId;
pub use signing::{deterministic_minter_key, Signature, SignatureAlgorithm, SigningService};
pub use smt::{MerkleTreePath, MerkleTreePathStep, SparseMerkleTree};
pub use token::{Token, TokenState, TOKEN_VERSION};
pub use transaction::{
    mint_source, Commitment, MintTransactionData, Transaction, TransactionData, TransactionPayload,
};
pub use types::{CoinId, TokenCoinData, TokenId, TokenType};
