//! State-transition client: mints tokens and drives transfers through an aggregator.

use crate::aggregator::{AggregatorClient, SubmitStatus};
use crate::errors::ClientError;
use crate::retry::{wait_inclusion_proof, CancellationToken, RetryPolicy};
use futures::future::try_join_all;
use std::fmt;
use tokenchain_core::factory::check_linkage;
use tokenchain_core::{
    deterministic_minter_key, Address, Commitment, DataHash, HashAlgorithm, InclusionProofVerificationStatus,
    MaskedPredicate, MintTransactionData, Predicate, RequestId, SigningService, Token, TokenCoinData, TokenId,
    TokenState, TokenType, Transaction, TransactionData, TransactionPayload,
};
use tracing::{debug, info};

/// Everything needed to mint a new token.
#[derive(Clone, Debug)]
pub struct MintParams {
    /// Id of the new token
    pub token_id: TokenId,
    /// Type of the new token
    pub token_type: TokenType,
    /// Immutable token data
    pub token_data: Vec<u8>,
    /// Fungible coin balances, if any
    pub coin_data: Option<TokenCoinData>,
    /// Data of the first state
    pub state_data: Vec<u8>,
    /// Owner secret; the owner key is derived from `(secret, nonce)`
    pub secret: Vec<u8>,
    /// Nonce of the owner key and of its masked predicate
    pub nonce: Vec<u8>,
    /// Salt of the mint transaction
    pub salt: Vec<u8>,
}

/// Whether a token's current state has been spent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
    /// A transaction from the state is recorded by the aggregator
    Spent,
    /// The aggregator holds no transaction from the state
    Unspent,
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenStatus::Spent => write!(f, "SPENT"),
            TokenStatus::Unspent => write!(f, "UNSPENT"),
        }
    }
}

/// Client for minting and transferring tokens.
///
/// Holds no per-token state, so one client can drive many flows concurrently.
pub struct StateTransitionClient<A> {
    aggregator: A,
    retry_policy: RetryPolicy,
}

impl<A: AggregatorClient> StateTransitionClient<A> {
    pub fn new(aggregator: A) -> Self {
        Self {
            aggregator,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn aggregator(&self) -> &A {
        &self.aggregator
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Mints a token owned by the key derived from `(secret, nonce)`.
    ///
    /// The first state is locked by a masked predicate and the mint is signed
    /// with the token's universal minter key.
    pub async fn mint(&self, params: MintParams, cancel: &CancellationToken) -> Result<Token, ClientError> {
        let owner = SigningService::from_secret(&params.secret, Some(&params.nonce));
        let predicate = Predicate::Masked(MaskedPredicate::create(
            &params.token_id,
            &params.token_type,
            &owner,
            HashAlgorithm::Sha256,
            &params.nonce,
        )?);
        let recipient = Address::direct(predicate.reference());

        let mint_data = MintTransactionData::new(
            params.token_id,
            params.token_type,
            &params.token_data,
            params.coin_data,
            &recipient,
            &params.salt,
            Some(DataHash::sha256(&params.state_data)),
            None,
        );

        let minter = deterministic_minter_key(&params.token_id);
        let commitment = Commitment::create(mint_data, &minter)?;
        info!("Minting token {} to {}", params.token_id, recipient);

        self.submit_commitment(&commitment).await?;
        let genesis = self.create_transaction(&commitment, cancel).await?;

        let state = TokenState::create(predicate, &params.state_data);
        check_linkage(0, &genesis.data, &state, &[])?;

        info!("Minted token {}", params.token_id);
        Ok(Token::new(state, genesis, Vec::new()))
    }

    /// Signs and submits a transfer of the state `data` spends.
    pub async fn submit_transaction(
        &self,
        data: TransactionData,
        signing_service: &SigningService,
    ) -> Result<Commitment<TransactionData>, ClientError> {
        if !data
            .source_state
            .unlock_predicate()
            .is_owner(&signing_service.public_key())
        {
            return Err(ClientError::InvalidTransition(
                "signing key does not own the source state".to_string(),
            ));
        }

        let commitment = Commitment::create(data, signing_service)?;
        self.submit_commitment(&commitment).await?;
        Ok(commitment)
    }

    /// Submits an already signed commitment.
    pub async fn submit_commitment<D: TransactionPayload + Sync>(
        &self,
        commitment: &Commitment<D>,
    ) -> Result<(), ClientError> {
        let transaction_hash = commitment.transaction_hash()?;
        let response = self
            .aggregator
            .submit_transaction(&commitment.request_id, &transaction_hash, &commitment.authenticator)
            .await?;

        if response.status != SubmitStatus::Success {
            info!("Commitment {} rejected: {}", commitment.request_id, response.status);
            return Err(ClientError::SubmitRejected(response.status));
        }

        debug!("Commitment {} accepted", commitment.request_id);
        Ok(())
    }

    /// Waits for the commitment to be included and builds the transaction.
    pub async fn create_transaction<D: TransactionPayload + Clone + Sync>(
        &self,
        commitment: &Commitment<D>,
        cancel: &CancellationToken,
    ) -> Result<Transaction<D>, ClientError> {
        let proof = wait_inclusion_proof(&self.aggregator, &commitment.request_id, &self.retry_policy, cancel).await?;

        if proof.authenticator.as_ref() != Some(&commitment.authenticator) {
            return Err(ClientError::InvalidInclusionProof(
                "proof carries a different authenticator".to_string(),
            ));
        }

        let transaction_hash = commitment.transaction_hash()?;
        if proof.transaction_hash.as_ref() != Some(&transaction_hash) {
            return Err(ClientError::InvalidInclusionProof(
                "proof carries a different transaction hash".to_string(),
            ));
        }

        Ok(Transaction::new(commitment.transaction_data.clone(), proof))
    }

    /// Waits for several commitments concurrently. Fails on the first error.
    pub async fn create_transactions<D: TransactionPayload + Clone + Sync>(
        &self,
        commitments: &[Commitment<D>],
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction<D>>, ClientError> {
        try_join_all(
            commitments
                .iter()
                .map(|commitment| self.create_transaction(commitment, cancel)),
        )
        .await
    }

    /// Extends `token` with a verified transfer into `state`.
    ///
    /// The input token is left as it was; the extended token is returned.
    pub fn finish_transaction(
        &self,
        token: &Token,
        transaction: Transaction<TransactionData>,
        state: TokenState,
        nametag_tokens: Vec<Token>,
    ) -> Result<Token, ClientError> {
        if transaction.data.source_state.hash() != token.state().hash() {
            return Err(ClientError::InvalidTransition(
                "transaction does not spend the current token state".to_string(),
            ));
        }

        let predicate = token.state().unlock_predicate();
        if !predicate.verify(&transaction) {
            return Err(ClientError::InvalidTransition(format!(
                "{} rejected the transaction",
                predicate
            )));
        }

        let index = token.transactions().len() + 1;
        check_linkage(index, &transaction.data, &state, &nametag_tokens)?;

        info!("Token {} moved to state {}", token.id(), state.hash());
        Ok(token.with_transaction(transaction, state, nametag_tokens))
    }

    /// Asks the aggregator whether the token's current state has been spent by `public_key`.
    pub async fn get_token_status(&self, token: &Token, public_key: &[u8]) -> Result<TokenStatus, ClientError> {
        let request_id = RequestId::create(public_key, token.state().hash());
        let proof = self.aggregator.get_inclusion_proof(&request_id).await?;

        match proof.verify(&request_id) {
            InclusionProofVerificationStatus::Ok => Ok(TokenStatus::Spent),
            InclusionProofVerificationStatus::PathNotIncluded => Ok(TokenStatus::Unspent),
            status => Err(ClientError::InvalidInclusionProof(status.to_string())),
        }
    }
}
