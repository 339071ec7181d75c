//! The aggregator service contract.

use crate::errors::ClientError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokenchain_core::{Authenticator, DataHash, InclusionProof, RequestId};

/// Outcome of submitting a commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmitStatus {
    /// Accepted; an inclusion proof will follow
    Success,
    /// The authenticator signature does not cover the transaction hash
    AuthenticatorVerificationFailed,
    /// The request id is not derived from the authenticator
    RequestIdMismatch,
    /// A commitment for this request id was already accepted
    RequestIdExists,
}

impl fmt::Display for SubmitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmitStatus::Success => "SUCCESS",
            SubmitStatus::AuthenticatorVerificationFailed => "AUTHENTICATOR_VERIFICATION_FAILED",
            SubmitStatus::RequestIdMismatch => "REQUEST_ID_MISMATCH",
            SubmitStatus::RequestIdExists => "REQUEST_ID_EXISTS",
        };
        write!(f, "{}", name)
    }
}

/// Aggregator answer to a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitCommitmentResponse {
    pub status: SubmitStatus,
    pub request_id: RequestId,
}

/// Records commitments and serves inclusion proofs.
///
/// Implementations are shared read-only between concurrent flows.
#[async_trait]
pub trait AggregatorClient: Send + Sync {
    /// Submits a commitment. A non-`SUCCESS` status is a normal response, not an error.
    async fn submit_transaction(
        &self,
        request_id: &RequestId,
        transaction_hash: &DataHash,
        authenticator: &Authenticator,
    ) -> Result<SubmitCommitmentResponse, ClientError>;

    /// Fetches the current proof for a request id.
    ///
    /// A proof that does not include the request id means "not yet recorded".
    async fn get_inclusion_proof(&self, request_id: &RequestId) -> Result<InclusionProof, ClientError>;
}

#[async_trait]
impl<T: AggregatorClient + ?Sized> AggregatorClient for Arc<T> {
    async fn submit_transaction(
        &self,
        request_id: &RequestId,
        transaction_hash: &DataHash,
        authenticator: &Authenticator,
    ) -> Result<SubmitCommitmentResponse, ClientError> {
        (**self)
            .submit_transaction(request_id, transaction_hash, authenticator)
            .await
    }

    async fn get_inclusion_proof(&self, request_id: &RequestId) -> Result<InclusionProof, ClientError> {
        (**self).get_inclusion_proof(request_id).await
    }
}
