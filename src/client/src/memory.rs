//! A complete aggregator held in memory.
//!
//! Backed by the reference sparse Merkle tree. It enforces the same rules as
//! a remote aggregator: the authenticator must sign the transaction hash, the
//! request id must be derived from the authenticator, and each request id is
//! accepted at most once.

use crate::aggregator::{AggregatorClient, SubmitCommitmentResponse, SubmitStatus};
use crate::errors::ClientError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokenchain_core::{Authenticator, DataHash, InclusionProof, LeafValue, RequestId, SparseMerkleTree};
use tracing::{debug, info};

#[derive(Clone, Debug)]
struct Record {
    authenticator: Authenticator,
    transaction_hash: DataHash,
}

#[derive(Debug, Default)]
struct State {
    tree: SparseMerkleTree,
    records: HashMap<RequestId, Record>,
    pending: Vec<(RequestId, Record)>,
    block_number: u64,
}

/// In-memory aggregator.
///
/// In immediate mode every accepted commitment is provable right away. In
/// batched mode commitments stay pending until [`InMemoryAggregator::create_block`].
#[derive(Debug, Default)]
pub struct InMemoryAggregator {
    state: Mutex<State>,
    batched: bool,
}

impl InMemoryAggregator {
    /// Creates an aggregator that records commitments immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an aggregator that records commitments only when a block is created.
    pub fn batched() -> Self {
        Self {
            state: Mutex::new(State::default()),
            batched: true,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, ClientError> {
        self.state
            .lock()
            .map_err(|_| ClientError::Network("aggregator state lock poisoned".to_string()))
    }

    /// Records all pending commitments and returns the new block number.
    pub fn create_block(&self) -> Result<u64, ClientError> {
        let mut state = self.lock()?;
        let pending = std::mem::take(&mut state.pending);
        let count = pending.len();

        for (request_id, record) in pending {
            insert(&mut state, request_id, record)?;
        }

        state.block_number += 1;
        info!("Created block {} with {} commitments", state.block_number, count);
        Ok(state.block_number)
    }

    /// Number of the last created block.
    pub fn block_number(&self) -> Result<u64, ClientError> {
        Ok(self.lock()?.block_number)
    }

    /// Root hash of the tree.
    pub fn root(&self) -> Result<DataHash, ClientError> {
        Ok(self.lock()?.tree.root())
    }

    /// Number of recorded commitments.
    pub fn len(&self) -> Result<usize, ClientError> {
        Ok(self.lock()?.records.len())
    }

    /// Number of commitments waiting for the next block.
    pub fn pending(&self) -> Result<usize, ClientError> {
        Ok(self.lock()?.pending.len())
    }
}

fn insert(state: &mut State, request_id: RequestId, record: Record) -> Result<(), ClientError> {
    let leaf = LeafValue::create(&record.authenticator, &record.transaction_hash)?;
    state.tree.add_leaf(&request_id, leaf.into_bytes())?;
    state.records.insert(request_id, record);
    Ok(())
}

#[async_trait]
impl AggregatorClient for InMemoryAggregator {
    async fn submit_transaction(
        &self,
        request_id: &RequestId,
        transaction_hash: &DataHash,
        authenticator: &Authenticator,
    ) -> Result<SubmitCommitmentResponse, ClientError> {
        let respond = |status| SubmitCommitmentResponse {
            status,
            request_id: request_id.clone(),
        };

        if !authenticator.verify(transaction_hash) {
            return Ok(respond(SubmitStatus::AuthenticatorVerificationFailed));
        }

        if authenticator.request_id() != *request_id {
            return Ok(respond(SubmitStatus::RequestIdMismatch));
        }

        let mut state = self.lock()?;
        let exists = state.records.contains_key(request_id)
            || state.pending.iter().any(|(pending, _)| pending == request_id);
        if exists {
            debug!("Rejecting second commitment for {}", request_id);
            return Ok(respond(SubmitStatus::RequestIdExists));
        }

        let record = Record {
            authenticator: authenticator.clone(),
            transaction_hash: transaction_hash.clone(),
        };

        if self.batched {
            state.pending.push((request_id.clone(), record));
        } else {
            insert(&mut state, request_id.clone(), record)?;
        }

        debug!("Accepted commitment {}", request_id);
        Ok(respond(SubmitStatus::Success))
    }

    async fn get_inclusion_proof(&self, request_id: &RequestId) -> Result<InclusionProof, ClientError> {
        let state = self.lock()?;
        let path = state.tree.get_path(request_id);

        Ok(match state.records.get(request_id) {
            Some(record) => InclusionProof::new(
                path,
                Some(record.authenticator.clone()),
                Some(record.transaction_hash.clone()),
            ),
            None => InclusionProof::new(path, None, None),
        })
    }
}
