//! JSON-RPC 2.0 aggregator client over HTTP.

use crate::aggregator::{AggregatorClient, SubmitCommitmentResponse, SubmitStatus};
use crate::errors::ClientError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokenchain_core::{Authenticator, CoreError, DataHash, InclusionProof, RequestId};
use tracing::{debug, info};

/// JSON-RPC request.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    /// JSON-RPC version
    jsonrpc: &'static str,
    /// Method to call
    method: &'a str,
    /// Parameters for the method
    params: serde_json::Value,
    /// Request ID
    id: u64,
}

/// JSON-RPC response.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    /// Result of the method call
    #[serde(default)]
    result: Option<serde_json::Value>,
    /// Error, if any
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    /// Error code
    code: i64,
    /// Error message
    message: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResult {
    status: SubmitStatus,
}

/// Aggregator client speaking JSON-RPC 2.0 over HTTP.
#[derive(Debug)]
pub struct JsonRpcAggregatorClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcAggregatorClient {
    /// Creates a client for the aggregator at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_http_client(url, reqwest::Client::new())
    }

    /// Creates a client reusing an existing HTTP client.
    pub fn with_http_client(url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            http,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches a proof as of a given block, or the latest when `block_number` is `None`.
    pub async fn get_inclusion_proof_at(
        &self,
        request_id: &RequestId,
        block_number: Option<u64>,
    ) -> Result<InclusionProof, ClientError> {
        let mut params = serde_json::json!({ "requestId": request_id });
        if let Some(block_number) = block_number {
            params["blockNum"] = serde_json::json!(block_number.to_string());
        }

        self.call("aggregator_get_path", params).await
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T, ClientError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        debug!("Calling {} on {} (id {})", method, self.url, request.id);

        let response = self.http.post(&self.url).json(&request).send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Network(format!(
                "{} returned HTTP {}: {}",
                method, status, response_text
            )));
        }

        if response_text.is_empty() {
            return Err(ClientError::Network("Empty response from aggregator".to_string()));
        }

        let response: JsonRpcResponse = serde_json::from_str(&response_text)
            .map_err(|e| ClientError::Network(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = response.error {
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = response
            .result
            .ok_or_else(|| ClientError::Network(format!("No result in response to {}", method)))?;

        Ok(serde_json::from_value(result).map_err(CoreError::from)?)
    }
}

#[async_trait]
impl AggregatorClient for JsonRpcAggregatorClient {
    async fn submit_transaction(
        &self,
        request_id: &RequestId,
        transaction_hash: &DataHash,
        authenticator: &Authenticator,
    ) -> Result<SubmitCommitmentResponse, ClientError> {
        let params = serde_json::json!({
            "requestId": request_id,
            "payload": transaction_hash,
            "authenticator": authenticator,
        });

        let result: SubmitResult = self.call("aggregator_submit", params).await?;
        info!("Submitted commitment {}: {}", request_id, result.status);

        Ok(SubmitCommitmentResponse {
            status: result.status,
            request_id: request_id.clone(),
        })
    }

    async fn get_inclusion_proof(&self, request_id: &RequestId) -> Result<InclusionProof, ClientError> {
        self.get_inclusion_proof_at(request_id, None).await
    }
}
