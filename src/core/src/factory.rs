//! Token import: parses a serialized token and verifies its whole history.
//!
//! Verification is a single pass over `[mint, ...transfers]`. For every
//! transaction the state it produced (the source of the next transaction, or
//! the token's current state for the last one) is first linked to it through
//! the recorded recipient and data hash, then the transaction itself is
//! checked cryptographically. The first failure rejects the whole token.

use crate::address::{Address, AddressScheme};
use crate::errors::CoreError;
use crate::hash::DataHash;
use crate::nametag::resolve_address;
use crate::predicate::Predicate;
use crate::proofs::InclusionProofVerificationStatus;
use crate::request_id::RequestId;
use crate::signing::deterministic_minter_key;
use crate::token::{Token, TokenDto, TokenState, TOKEN_VERSION};
use crate::transaction::{
    mint_source, MintTransactionData, Transaction, TransactionData, TransactionDataDto, TransactionDto,
    TransactionPayload,
};
use tracing::{debug, info, warn};

/// Decodes the opaque `data` field of a token into an application type.
pub trait TokenDataDecoder {
    type Output;

    fn decode(&self, data: &[u8]) -> Result<Self::Output, CoreError>;
}

/// Decoder that hands back the raw bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawDataDecoder;

impl TokenDataDecoder for RawDataDecoder {
    type Output = Vec<u8>;

    fn decode(&self, data: &[u8]) -> Result<Self::Output, CoreError> {
        Ok(data.to_vec())
    }
}

/// Imports and verifies serialized tokens.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenFactory;

impl TokenFactory {
    pub fn new() -> Self {
        Self
    }

    /// Parses and verifies a token from JSON.
    pub fn create(&self, json: &str) -> Result<Token, CoreError> {
        let dto: TokenDto = serde_json::from_str(json)?;
        self.from_dto(&dto)
    }

    /// Parses and verifies a token, then decodes its data.
    pub fn create_with_decoder<D: TokenDataDecoder>(
        &self,
        json: &str,
        decoder: &D,
    ) -> Result<(Token, D::Output), CoreError> {
        let token = self.create(json)?;
        let data = decoder.decode(token.data())?;
        Ok((token, data))
    }

    /// Verifies a token already parsed into its wire form.
    pub fn from_dto(&self, dto: &TokenDto) -> Result<Token, CoreError> {
        match self.import(dto) {
            Ok(token) => {
                info!("Imported token {} with {} transfers", token.id(), token.transactions().len());
                Ok(token)
            }
            Err(e) => {
                warn!("Rejected token {}: {}", dto.id, e);
                Err(e)
            }
        }
    }

    fn import(&self, dto: &TokenDto) -> Result<Token, CoreError> {
        if dto.version != TOKEN_VERSION {
            return Err(CoreError::UnsupportedVersion {
                expected: TOKEN_VERSION.to_string(),
                actual: dto.version.clone(),
            });
        }

        let (genesis_json, transfers_json) = dto.transactions.split_first().ok_or(CoreError::MissingGenesis)?;

        let genesis_dto: TransactionDto<MintTransactionData> = serde_json::from_value(genesis_json.clone())?;
        let genesis = Transaction::<MintTransactionData>::from_dto(genesis_dto);
        self.check_mint_matches_token(dto, &genesis.data)?;

        let mut transfers = Vec::with_capacity(transfers_json.len());
        for value in transfers_json {
            let transfer_dto: TransactionDto<TransactionDataDto> = serde_json::from_value(value.clone())?;
            transfers.push(Transaction::<TransactionData>::from_dto(&dto.id, &dto.token_type, &transfer_dto)?);
        }

        let state = TokenState::from_dto(&dto.id, &dto.token_type, &dto.state)?;

        let nametag_tokens = dto
            .nametag_tokens
            .iter()
            .map(|nametag| self.import(nametag))
            .collect::<Result<Vec<_>, _>>()?;

        // Mint produces the first transfer's source state (or the current state)
        let destination = transfers.first().map(|t| &t.data.source_state).unwrap_or(&state);
        check_linkage(0, &genesis.data, destination, &nametag_tokens)?;
        self.verify_mint(&genesis)?;

        for (i, transfer) in transfers.iter().enumerate() {
            let index = i + 1;
            let destination = transfers.get(index).map(|t| &t.data.source_state).unwrap_or(&state);
            check_linkage(index, &transfer.data, destination, &nametag_tokens)?;
            self.verify_transfer(index, transfer)?;
        }

        Ok(Token::from_parts(
            dto.id,
            dto.token_type,
            dto.data.clone(),
            dto.coins.clone(),
            state,
            genesis,
            transfers,
            nametag_tokens,
        ))
    }

    fn check_mint_matches_token(&self, dto: &TokenDto, mint: &MintTransactionData) -> Result<(), CoreError> {
        if mint.token_id != dto.id {
            return Err(CoreError::TokenMismatch(format!(
                "mint is for token {}, not {}",
                mint.token_id, dto.id
            )));
        }
        if mint.token_type != dto.token_type {
            return Err(CoreError::TokenMismatch("token type differs from mint".to_string()));
        }
        if mint.token_data != dto.data {
            return Err(CoreError::TokenMismatch("token data differs from mint".to_string()));
        }
        if mint.coin_data != dto.coins {
            return Err(CoreError::TokenMismatch("coins differ from mint".to_string()));
        }
        Ok(())
    }

    fn verify_mint(&self, genesis: &Transaction<MintTransactionData>) -> Result<(), CoreError> {
        let data = &genesis.data;
        let proof = &genesis.inclusion_proof;
        let minter = deterministic_minter_key(&data.token_id);
        let minter_key = minter.public_key();

        let source = mint_source(&data.token_id);
        if data.source_state != source {
            return Err(CoreError::MintVerificationFailed(
                "source state is not the mint source of the token".to_string(),
            ));
        }

        let authenticator = proof
            .authenticator
            .as_ref()
            .ok_or_else(|| CoreError::MintVerificationFailed("missing authenticator".to_string()))?;
        if authenticator.public_key != minter_key {
            return Err(CoreError::MintVerificationFailed(
                "authenticator is not from the universal minter".to_string(),
            ));
        }
        if authenticator.state_hash != source {
            return Err(CoreError::MintVerificationFailed(
                "authenticator signs a different source state".to_string(),
            ));
        }

        let transaction_hash = proof
            .transaction_hash
            .as_ref()
            .ok_or_else(|| CoreError::MintVerificationFailed("missing transaction hash".to_string()))?;
        if *transaction_hash != data.hash()? {
            return Err(CoreError::MintVerificationFailed(
                "transaction hash does not match mint data".to_string(),
            ));
        }

        let request_id = RequestId::create(&minter_key, &source);
        let status = proof.verify(&request_id);
        if status != InclusionProofVerificationStatus::Ok {
            return Err(CoreError::MintVerificationFailed(format!("inclusion proof is {}", status)));
        }

        debug!("Mint of {} verified at {}", data.token_id, request_id);
        Ok(())
    }

    fn verify_transfer(&self, index: usize, transfer: &Transaction<TransactionData>) -> Result<(), CoreError> {
        let predicate = transfer.data.source_state.unlock_predicate();
        let public_key = predicate.public_key().ok_or_else(|| CoreError::PredicateVerificationFailed {
            index,
            reason: format!("{} predicate cannot be unlocked", predicate.predicate_type()),
        })?;

        let request_id = RequestId::create(public_key, transfer.data.source_state.hash());
        let status = transfer.inclusion_proof.verify(&request_id);
        if status != InclusionProofVerificationStatus::Ok {
            return Err(CoreError::InclusionProofFailed { index, status });
        }

        if !predicate.verify(transfer) {
            return Err(CoreError::PredicateVerificationFailed {
                index,
                reason: format!("{} rejected the transaction", predicate),
            });
        }

        Ok(())
    }
}

/// Checks that a recorded recipient names the predicate of the destination state.
///
/// Name-tag recipients are resolved first. The recorded string is compared in
/// the scheme it was written in, except that one-time predicates accept only
/// their one-time address.
pub fn check_recipient(
    index: usize,
    recorded: &str,
    predicate: &Predicate,
    nametag_tokens: &[Token],
) -> Result<(), CoreError> {
    let mismatch = |expected: String| CoreError::AddressMismatch {
        index,
        expected,
        actual: recorded.to_string(),
    };
    let direct = || {
        predicate
            .address(AddressScheme::Direct)
            .map(|address| address.to_string())
            .unwrap_or_default()
    };

    let address: Address = recorded.parse().map_err(|_| mismatch(direct()))?;
    let resolved = resolve_address(&address, nametag_tokens)?;

    // One-time states are bound to their one-time address
    if let Predicate::OneTimeAddress(one_time) = predicate {
        if resolved.scheme() != AddressScheme::OneTime {
            return Err(mismatch(one_time.address().to_string()));
        }
    }

    let expected = predicate
        .address(resolved.scheme())
        .map_err(|_| mismatch(direct()))?;

    if expected != resolved {
        return Err(mismatch(expected.to_string()));
    }

    Ok(())
}

/// Checks that `destination` is the state transaction `index` committed to.
///
/// Covers the recipient address, the committed data hash and, for unmasked
/// and public-key predicates, the nonce derived from the transaction salt.
pub fn check_linkage<T: TransactionPayload>(
    index: usize,
    transaction: &T,
    destination: &TokenState,
    nametag_tokens: &[Token],
) -> Result<(), CoreError> {
    check_recipient(index, transaction.recipient(), destination.unlock_predicate(), nametag_tokens)?;

    let data_matches = match transaction.data_hash() {
        Some(expected) => DataHash::of(expected.algorithm(), destination.data()) == *expected,
        None => destination.data().is_empty(),
    };
    if !data_matches {
        return Err(CoreError::DataMismatch { index });
    }

    let nonce_matches = match destination.unlock_predicate() {
        Predicate::Unmasked(predicate) => predicate.verify_nonce(transaction.salt()),
        Predicate::PublicKey(predicate) => predicate.verify_nonce(transaction.salt()),
        _ => true,
    };
    if !nonce_matches {
        return Err(CoreError::PredicateVerificationFailed {
            index,
            reason: format!(
                "{} nonce is not derived from the transaction salt",
                destination.unlock_predicate().predicate_type()
            ),
        });
    }

    Ok(())
}
