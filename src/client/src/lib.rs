//! Client side of the token protocol.
//!
//! Talks to an aggregator, mints tokens and drives transfers. All
//! verification is delegated to `tokenchain-core`.

pub mod aggregator;
pub mod client;
pub mod config;
pub mod errors;
pub mod logging;
pub mod memory;
pub mod retry;
pub mod rpc;

// Re-export commonly used types
pub use aggregator::{AggregatorClient, SubmitCommitmentResponse, SubmitStatus};
pub use client::{MintParams, StateTransitionClient, TokenStatus};
pub use config::{ClientConfig, RetryConfig};
pub use errors::ClientError;
pub use memory::InMemoryAggregator;
pub use retry::{wait_inclusion_proof, CancellationToken, RetryPolicy};
pub use rpc::JsonRpcAggregatorClient;
