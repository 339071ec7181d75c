//! Tests for aggregator semantics and the client flows that wait on it.

use crate::fixtures::{fast_policy, mint_params, minted_owner, transfer_to};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokenchain_client::{
    AggregatorClient, CancellationToken, ClientError, InMemoryAggregator, StateTransitionClient,
    SubmitCommitmentResponse, SubmitStatus,
};
use tokenchain_core::{Authenticator, DataHash, InclusionProof, RequestId, SigningService};

/// Accepts everything and serves proofs with a forged root.
struct LyingAggregator(InMemoryAggregator);

#[async_trait]
impl AggregatorClient for LyingAggregator {
    async fn submit_transaction(
        &self,
        request_id: &RequestId,
        transaction_hash: &DataHash,
        authenticator: &Authenticator,
    ) -> Result<SubmitCommitmentResponse, ClientError> {
        self.0
            .submit_transaction(request_id, transaction_hash, authenticator)
            .await
    }

    async fn get_inclusion_proof(&self, request_id: &RequestId) -> Result<InclusionProof, ClientError> {
        let mut proof = self.0.get_inclusion_proof(request_id).await?;
        proof.merkle_tree_path.root = DataHash::sha256(b"forged root");
        Ok(proof)
    }
}

fn commitment(secret: &[u8]) -> (RequestId, DataHash, Authenticator) {
    let signing_service = SigningService::from_secret(secret, None);
    let transaction_hash = DataHash::sha256(b"transaction");
    let authenticator = Authenticator::create(&signing_service, &transaction_hash, &DataHash::sha256(b"state"));
    (authenticator.request_id(), transaction_hash, authenticator)
}

#[tokio::test]
async fn test_second_submission_conflicts() {
    let aggregator = InMemoryAggregator::new();
    let (request_id, transaction_hash, authenticator) = commitment(b"alice");

    let first = aggregator
        .submit_transaction(&request_id, &transaction_hash, &authenticator)
        .await
        .unwrap();
    assert_eq!(first.status, SubmitStatus::Success);

    let second = aggregator
        .submit_transaction(&request_id, &transaction_hash, &authenticator)
        .await
        .unwrap();
    assert_eq!(second.status, SubmitStatus::RequestIdExists);

    // A different transaction from the same state conflicts too
    let other_hash = DataHash::sha256(b"other transaction");
    let signing_service = SigningService::from_secret(b"alice", None);
    let other = Authenticator::create(&signing_service, &other_hash, &DataHash::sha256(b"state"));
    let third = aggregator
        .submit_transaction(&request_id, &other_hash, &other)
        .await
        .unwrap();
    assert_eq!(third.status, SubmitStatus::RequestIdExists);
    assert_eq!(aggregator.len().unwrap(), 1);
}

#[tokio::test]
async fn test_many_commitments_all_provable() {
    let aggregator = InMemoryAggregator::new();
    let commitments: Vec<_> = (0..32u8).map(|i| commitment(&[i; 8])).collect();

    for (request_id, transaction_hash, authenticator) in &commitments {
        aggregator
            .submit_transaction(request_id, transaction_hash, authenticator)
            .await
            .unwrap();
    }

    let root = aggregator.root().unwrap();
    for (request_id, transaction_hash, _) in &commitments {
        let proof = aggregator.get_inclusion_proof(request_id).await.unwrap();
        assert_eq!(proof.merkle_tree_path.root, root);
        assert_eq!(proof.transaction_hash.as_ref(), Some(transaction_hash));
        assert!(proof.is_authenticated());
    }
}

#[tokio::test]
async fn test_mint_waits_for_block() {
    let aggregator = Arc::new(InMemoryAggregator::batched());
    let client = StateTransitionClient::new(aggregator.clone()).with_retry_policy(fast_policy());

    let producer = {
        let aggregator = aggregator.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(10)).await;
                if aggregator.pending().unwrap() > 0 {
                    return aggregator.create_block().unwrap();
                }
            }
        })
    };

    let token = client
        .mint(mint_params(b"alice", b""), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(producer.await.unwrap(), 1);
    assert_eq!(aggregator.block_number().unwrap(), 1);
    assert!(token.transactions().is_empty());
}

#[tokio::test]
async fn test_cancelled_wait_issues_no_more_requests() {
    let aggregator = Arc::new(InMemoryAggregator::batched());
    let client = StateTransitionClient::new(aggregator.clone()).with_retry_policy(fast_policy());
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel.cancel();
        })
    };

    let result = client.mint(mint_params(b"alice", b""), &cancel).await;
    canceller.await.unwrap();
    assert!(matches!(result, Err(ClientError::Cancelled)));

    // The commitment was accepted; only waiting stopped
    assert_eq!(aggregator.pending().unwrap(), 1);
}

#[tokio::test]
async fn test_already_cancelled() {
    let client = StateTransitionClient::new(InMemoryAggregator::new()).with_retry_policy(fast_policy());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = client.mint(mint_params(b"alice", b""), &cancel).await;
    assert!(matches!(result, Err(ClientError::Cancelled)));
}

#[tokio::test]
async fn test_forged_root_is_reported() {
    let client = StateTransitionClient::new(LyingAggregator(InMemoryAggregator::new())).with_retry_policy(fast_policy());

    let result = client.mint(mint_params(b"alice", b""), &CancellationToken::new()).await;
    match result {
        Err(ClientError::InvalidInclusionProof(status)) => assert_eq!(status, "PATH_INVALID"),
        other => panic!("expected invalid proof, got {:?}", other.map(|t| t.id().to_hex())),
    }
}

#[tokio::test]
async fn test_concurrent_double_spend_has_one_winner() {
    let aggregator = Arc::new(InMemoryAggregator::new());
    let client = Arc::new(StateTransitionClient::new(aggregator.clone()).with_retry_policy(fast_policy()));
    let params = mint_params(b"alice", b"");
    let token = client.mint(params.clone(), &CancellationToken::new()).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..4u8 {
        let client = client.clone();
        let sender = minted_owner(&params);
        let (data, _) = transfer_to(&token, &SigningService::from_secret(&[i; 4], None), b"").unwrap();
        tasks.push(tokio::spawn(async move { client.submit_transaction(data, &sender).await }));
    }

    let results = futures::future::join_all(tasks).await;
    let accepted = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(ClientError::SubmitRejected(SubmitStatus::RequestIdExists)))))
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(conflicts, 3);
}
