//! Transactions, commitments and the genesis (mint) convention.

use crate::address::Address;
use crate::encoding::{hash_encoded, hex_bytes, hex_bytes_opt};
use crate::errors::CoreError;
use crate::hash::{DataHash, DataHasher, HashAlgorithm};
use crate::proofs::{Authenticator, InclusionProof};
use crate::request_id::RequestId;
use crate::signing::SigningService;
use crate::token::{TokenState, TokenStateDto};
use crate::types::{TokenCoinData, TokenId, TokenType};
use serde::{Deserialize, Serialize};

/// Public SHA-256 digest mixed into every mint source state.
pub const MINT_SUFFIX: [u8; 32] = [
    0x9e, 0x82, 0x00, 0x2c, 0x14, 0x4d, 0x7c, 0x57, 0x96, 0xc5, 0x0f, 0x6d, 0xb5, 0x0a, 0x0c, 0x7b,
    0xbd, 0x7f, 0x71, 0x7a, 0xe3, 0xaf, 0x6c, 0x6c, 0x71, 0xa3, 0xe9, 0xeb, 0xa3, 0x02, 0x27, 0x30,
];

/// [`MINT_SUFFIX`] as a hash.
pub fn mint_suffix() -> DataHash {
    DataHash::from_sha256_digest(MINT_SUFFIX)
}

/// The pseudo state a token is minted from: `SHA256(tokenId || MINT_SUFFIX.imprint)`.
pub fn mint_source(token_id: &TokenId) -> DataHash {
    DataHasher::new(HashAlgorithm::Sha256)
        .update(token_id.as_bytes())
        .update(mint_suffix().imprint())
        .digest()
}

/// Common view over mint and transfer transaction data.
pub trait TransactionPayload {
    /// Hash of the transaction data under a given algorithm.
    fn calculate_hash(&self, algorithm: HashAlgorithm) -> Result<DataHash, CoreError>;

    /// Algorithm the transaction hash is normally computed with.
    fn hash_algorithm(&self) -> HashAlgorithm;

    /// Hash of the state this transaction spends.
    fn source_state_hash(&self) -> DataHash;

    /// Recipient address exactly as recorded.
    fn recipient(&self) -> &str;

    fn salt(&self) -> &[u8];

    /// Hash of the data the next state must carry.
    fn data_hash(&self) -> Option<&DataHash>;

    /// The transaction hash that gets signed and committed.
    fn hash(&self) -> Result<DataHash, CoreError> {
        self.calculate_hash(self.hash_algorithm())
    }

    /// Parses the recorded recipient.
    fn recipient_address(&self) -> Result<Address, CoreError> {
        self.recipient().parse()
    }
}

/// Genesis transaction data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintTransactionData {
    /// Id of the minted token
    pub token_id: TokenId,
    /// Type of the minted token
    pub token_type: TokenType,
    /// Immutable token data
    #[serde(with = "hex_bytes")]
    pub token_data: Vec<u8>,
    /// Coin balances fixed at mint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin_data: Option<TokenCoinData>,
    /// Always [`mint_source`] of the token id
    pub source_state: DataHash,
    /// Address of the first owner, in string form
    pub recipient: String,
    /// Salt of the mint
    #[serde(with = "hex_bytes")]
    pub salt: Vec<u8>,
    /// Hash of the first state's data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_hash: Option<DataHash>,
    /// Free-form mint justification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl MintTransactionData {
    /// Creates mint data for a new token.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        token_id: TokenId,
        token_type: TokenType,
        token_data: &[u8],
        coin_data: Option<TokenCoinData>,
        recipient: &Address,
        salt: &[u8],
        data_hash: Option<DataHash>,
        reason: Option<String>,
    ) -> Self {
        Self {
            source_state: mint_source(&token_id),
            token_id,
            token_type,
            token_data: token_data.to_vec(),
            coin_data,
            recipient: recipient.to_string(),
            salt: salt.to_vec(),
            data_hash,
            reason,
        }
    }
}

impl TransactionPayload for MintTransactionData {
    fn calculate_hash(&self, algorithm: HashAlgorithm) -> Result<DataHash, CoreError> {
        let token_data_hash = DataHash::sha256(&self.token_data);
        hash_encoded(
            algorithm,
            &(
                self.token_id.as_bytes(),
                self.token_type.as_bytes(),
                token_data_hash.imprint(),
                self.coin_data.as_ref().map(|coins| coins.to_canonical()),
                self.data_hash.as_ref().map(|hash| hash.imprint()),
                &self.recipient,
                &self.salt,
                &self.reason,
            ),
        )
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }

    fn source_state_hash(&self) -> DataHash {
        self.source_state.clone()
    }

    fn recipient(&self) -> &str {
        &self.recipient
    }

    fn salt(&self) -> &[u8] {
        &self.salt
    }

    fn data_hash(&self) -> Option<&DataHash> {
        self.data_hash.as_ref()
    }
}

/// Transfer transaction data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionData {
    /// State being spent
    pub source_state: TokenState,
    /// Address of the new owner, in string form
    pub recipient: String,
    /// Salt of the transfer
    pub salt: Vec<u8>,
    /// Hash of the destination state's data
    pub data_hash: Option<DataHash>,
    /// Optional message to the recipient
    pub message: Option<Vec<u8>>,
}

impl TransactionData {
    /// Creates transfer data spending `source_state`.
    pub fn new(
        source_state: TokenState,
        recipient: &Address,
        salt: &[u8],
        data_hash: Option<DataHash>,
        message: Option<&[u8]>,
    ) -> Self {
        Self {
            source_state,
            recipient: recipient.to_string(),
            salt: salt.to_vec(),
            data_hash,
            message: message.map(|message| message.to_vec()),
        }
    }

    pub fn to_dto(&self) -> TransactionDataDto {
        TransactionDataDto {
            source_state: self.source_state.to_dto(),
            recipient: self.recipient.clone(),
            salt: self.salt.clone(),
            data_hash: self.data_hash.clone(),
            message: self.message.clone(),
        }
    }

    pub fn from_dto(token_id: &TokenId, token_type: &TokenType, dto: &TransactionDataDto) -> Result<Self, CoreError> {
        Ok(Self {
            source_state: TokenState::from_dto(token_id, token_type, &dto.source_state)?,
            recipient: dto.recipient.clone(),
            salt: dto.salt.clone(),
            data_hash: dto.data_hash.clone(),
            message: dto.message.clone(),
        })
    }
}

impl TransactionPayload for TransactionData {
    fn calculate_hash(&self, algorithm: HashAlgorithm) -> Result<DataHash, CoreError> {
        hash_encoded(
            algorithm,
            &(
                self.source_state.hash().imprint(),
                self.data_hash.as_ref().map(|hash| hash.imprint()),
                &self.recipient,
                &self.salt,
                &self.message,
            ),
        )
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        self.source_state
            .unlock_predicate()
            .key_params()
            .map(|params| params.hash_algorithm)
            .unwrap_or(HashAlgorithm::Sha256)
    }

    fn source_state_hash(&self) -> DataHash {
        self.source_state.hash().clone()
    }

    fn recipient(&self) -> &str {
        &self.recipient
    }

    fn salt(&self) -> &[u8] {
        &self.salt
    }

    fn data_hash(&self) -> Option<&DataHash> {
        self.data_hash.as_ref()
    }
}

/// Wire form of [`TransactionData`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDataDto {
    pub source_state: TokenStateDto,
    pub recipient: String,
    #[serde(with = "hex_bytes")]
    pub salt: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_hash: Option<DataHash>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_bytes_opt")]
    pub message: Option<Vec<u8>>,
}

/// Transaction data together with the proof that it was committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction<D> {
    pub data: D,
    pub inclusion_proof: InclusionProof,
}

impl<D: TransactionPayload> Transaction<D> {
    pub fn new(data: D, inclusion_proof: InclusionProof) -> Self {
        Self { data, inclusion_proof }
    }
}

impl Transaction<MintTransactionData> {
    pub fn to_dto(&self) -> TransactionDto<MintTransactionData> {
        TransactionDto {
            data: self.data.clone(),
            inclusion_proof: self.inclusion_proof.clone(),
        }
    }

    pub fn from_dto(dto: TransactionDto<MintTransactionData>) -> Self {
        Self::new(dto.data, dto.inclusion_proof)
    }
}

impl Transaction<TransactionData> {
    pub fn to_dto(&self) -> TransactionDto<TransactionDataDto> {
        TransactionDto {
            data: self.data.to_dto(),
            inclusion_proof: self.inclusion_proof.clone(),
        }
    }

    pub fn from_dto(
        token_id: &TokenId,
        token_type: &TokenType,
        dto: &TransactionDto<TransactionDataDto>,
    ) -> Result<Self, CoreError> {
        Ok(Self::new(
            TransactionData::from_dto(token_id, token_type, &dto.data)?,
            dto.inclusion_proof.clone(),
        ))
    }
}

/// Wire form of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto<D> {
    pub data: D,
    pub inclusion_proof: InclusionProof,
}

/// A signed request to record a transaction in the aggregator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitment<D> {
    pub request_id: RequestId,
    pub transaction_data: D,
    pub authenticator: Authenticator,
}

impl<D: TransactionPayload> Commitment<D> {
    /// Signs transaction data with the key owning its source state.
    pub fn create(transaction_data: D, signing_service: &SigningService) -> Result<Self, CoreError> {
        let transaction_hash = transaction_data.hash()?;
        let source_state_hash = transaction_data.source_state_hash();

        let authenticator = Authenticator::create(signing_service, &transaction_hash, &source_state_hash);
        let request_id = RequestId::create(&signing_service.public_key(), &source_state_hash);

        Ok(Self {
            request_id,
            transaction_data,
            authenticator,
        })
    }

    /// Hash of the committed transaction data.
    pub fn transaction_hash(&self) -> Result<DataHash, CoreError> {
        self.transaction_data.hash()
    }
}
