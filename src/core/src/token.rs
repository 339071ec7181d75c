//! Token states and tokens.

use crate::encoding::hex_bytes;
use crate::errors::CoreError;
use crate::hash::{DataHash, DataHasher, HashAlgorithm};
use crate::predicate::{Predicate, PredicateDto};
use crate::transaction::{MintTransactionData, Transaction, TransactionData};
use crate::types::{TokenCoinData, TokenId, TokenType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serialization format version of tokens.
pub const TOKEN_VERSION: &str = "2.0";

/// An owned state of a token: an unlock predicate plus opaque data.
///
/// Immutable; a transfer produces a new state rather than modifying one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenState {
    unlock_predicate: Predicate,
    data: Vec<u8>,
    hash: DataHash,
}

impl TokenState {
    /// Creates a state. `hash = SHA256(predicate.hash.imprint || data)`.
    pub fn create(unlock_predicate: Predicate, data: &[u8]) -> Self {
        let hash = DataHasher::new(HashAlgorithm::Sha256)
            .update(unlock_predicate.hash().imprint())
            .update(data)
            .digest();

        Self {
            unlock_predicate,
            data: data.to_vec(),
            hash,
        }
    }

    pub fn unlock_predicate(&self) -> &Predicate {
        &self.unlock_predicate
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn hash(&self) -> &DataHash {
        &self.hash
    }

    pub fn to_dto(&self) -> TokenStateDto {
        TokenStateDto {
            unlock_predicate: self.unlock_predicate.to_dto(),
            data: self.data.clone(),
        }
    }

    pub fn from_dto(token_id: &TokenId, token_type: &TokenType, dto: &TokenStateDto) -> Result<Self, CoreError> {
        let predicate = Predicate::from_dto(token_id, token_type, &dto.unlock_predicate)?;
        Ok(Self::create(predicate, &dto.data))
    }
}

/// Wire form of [`TokenState`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStateDto {
    pub unlock_predicate: PredicateDto,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

/// A token: its current state and the full history proving it.
///
/// The genesis transaction is held separately from the transfers, so a token
/// without a mint cannot be represented.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    id: TokenId,
    token_type: TokenType,
    data: Vec<u8>,
    coins: Option<TokenCoinData>,
    state: TokenState,
    genesis: Transaction<MintTransactionData>,
    transactions: Vec<Transaction<TransactionData>>,
    nametag_tokens: Vec<Token>,
}

impl Token {
    /// Creates a freshly minted token. Identity fields are taken from the mint.
    pub fn new(state: TokenState, genesis: Transaction<MintTransactionData>, nametag_tokens: Vec<Token>) -> Self {
        Self {
            id: genesis.data.token_id,
            token_type: genesis.data.token_type,
            data: genesis.data.token_data.clone(),
            coins: genesis.data.coin_data.clone(),
            state,
            genesis,
            transactions: Vec::new(),
            nametag_tokens,
        }
    }

    /// Assembles a token from already verified parts.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: TokenId,
        token_type: TokenType,
        data: Vec<u8>,
        coins: Option<TokenCoinData>,
        state: TokenState,
        genesis: Transaction<MintTransactionData>,
        transactions: Vec<Transaction<TransactionData>>,
        nametag_tokens: Vec<Token>,
    ) -> Self {
        Self {
            id,
            token_type,
            data,
            coins,
            state,
            genesis,
            transactions,
            nametag_tokens,
        }
    }

    pub fn version(&self) -> &'static str {
        TOKEN_VERSION
    }

    pub fn id(&self) -> &TokenId {
        &self.id
    }

    pub fn token_type(&self) -> &TokenType {
        &self.token_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn coins(&self) -> Option<&TokenCoinData> {
        self.coins.as_ref()
    }

    /// The current state.
    pub fn state(&self) -> &TokenState {
        &self.state
    }

    pub fn genesis(&self) -> &Transaction<MintTransactionData> {
        &self.genesis
    }

    /// Transfers after the mint, oldest first.
    pub fn transactions(&self) -> &[Transaction<TransactionData>] {
        &self.transactions
    }

    pub fn nametag_tokens(&self) -> &[Token] {
        &self.nametag_tokens
    }

    /// Returns a new token extended by one transfer. `self` is left untouched.
    ///
    /// Performs no verification; see `StateTransitionClient::finish_transaction`.
    pub fn with_transaction(
        &self,
        transaction: Transaction<TransactionData>,
        state: TokenState,
        nametag_tokens: Vec<Token>,
    ) -> Token {
        let mut token = self.clone();
        token.transactions.push(transaction);
        token.state = state;
        token.nametag_tokens = nametag_tokens;
        token
    }

    pub fn to_dto(&self) -> Result<TokenDto, CoreError> {
        let mut transactions = Vec::with_capacity(self.transactions.len() + 1);
        transactions.push(serde_json::to_value(self.genesis.to_dto())?);
        for transaction in &self.transactions {
            transactions.push(serde_json::to_value(transaction.to_dto())?);
        }

        let nametag_tokens = self
            .nametag_tokens
            .iter()
            .map(Token::to_dto)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TokenDto {
            version: TOKEN_VERSION.to_string(),
            id: self.id,
            token_type: self.token_type,
            data: self.data.clone(),
            coins: self.coins.clone(),
            state: self.state.to_dto(),
            transactions,
            nametag_tokens,
        })
    }

    /// Serializes the token to JSON.
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(&self.to_dto()?)?)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token {{ id: {}, type: {}, transfers: {}, state: {} }}",
            self.id,
            self.token_type,
            self.transactions.len(),
            self.state.hash()
        )
    }
}

/// Wire form of a token.
///
/// `transactions` holds the mint first and the transfers after it; the two
/// element shapes differ, so they are kept as raw JSON until the token factory
/// decodes them in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDto {
    pub version: String,
    pub id: TokenId,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins: Option<TokenCoinData>,
    pub state: TokenStateDto,
    pub transactions: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nametag_tokens: Vec<TokenDto>,
}
