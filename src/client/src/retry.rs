//! Polling for inclusion proofs with backoff, deadline and cancellation.

use crate::aggregator::AggregatorClient;
use crate::errors::ClientError;
use std::sync::Arc;
use std::time::Duration;
use tokenchain_core::{InclusionProof, InclusionProofVerificationStatus, RequestId};
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// How often and how long to poll the aggregator.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the second attempt
    pub interval: Duration,
    /// Upper bound for the delay between attempts
    pub max_interval: Duration,
    /// Factor applied to the delay after every attempt
    pub backoff_multiplier: f64,
    /// Give up after this many attempts
    pub max_attempts: Option<u32>,
    /// Give up after this much time
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            max_attempts: None,
            timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl RetryPolicy {
    /// Delay to use after waiting `current`. Never exceeds `max_interval`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        let secs = current.as_secs_f64() * self.backoff_multiplier.max(1.0);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }
}

/// Cooperative cancellation flag shared between a caller and running flows.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Signals every clone of this token.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Completes once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        while !*receiver.borrow_and_update() {
            // Sender lives in self, so the channel cannot close here
            if receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Polls the aggregator until the request id is provably included.
///
/// A proof that does not include the request id yet is treated as pending.
/// Any other non-`OK` status is final. Network errors are retried.
pub async fn wait_inclusion_proof<A: AggregatorClient + ?Sized>(
    aggregator: &A,
    request_id: &RequestId,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<InclusionProof, ClientError> {
    if cancel.is_cancelled() {
        return Err(ClientError::Cancelled);
    }

    let deadline = async {
        match policy.timeout {
            Some(timeout) => tokio::time::sleep_until(Instant::now() + timeout).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Stopped waiting for {}: cancelled", request_id);
            Err(ClientError::Cancelled)
        }
        _ = deadline => {
            warn!("Timed out waiting for inclusion proof of {}", request_id);
            Err(ClientError::Timeout)
        }
        result = poll(aggregator, request_id, policy) => result,
    }
}

async fn poll<A: AggregatorClient + ?Sized>(
    aggregator: &A,
    request_id: &RequestId,
    policy: &RetryPolicy,
) -> Result<InclusionProof, ClientError> {
    let mut interval = policy.interval;
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        match aggregator.get_inclusion_proof(request_id).await {
            Ok(proof) => match proof.verify(request_id) {
                InclusionProofVerificationStatus::Ok => {
                    debug!("Inclusion proof for {} after {} attempts", request_id, attempts);
                    return Ok(proof);
                }
                InclusionProofVerificationStatus::PathNotIncluded => {
                    debug!("{} not included yet (attempt {})", request_id, attempts);
                }
                status => return Err(ClientError::InvalidInclusionProof(status.to_string())),
            },
            Err(e) if e.is_retriable() => {
                warn!("Polling {} failed (attempt {}): {}", request_id, attempts, e);
            }
            Err(e) => return Err(e),
        }

        if policy.max_attempts.map_or(false, |max| attempts >= max) {
            return Err(ClientError::Timeout);
        }

        sleep(interval).await;
        interval = policy.next_interval(interval);
    }
}
