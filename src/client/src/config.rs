//! Configuration for the state-transition client.

use crate::errors::ClientError;
use crate::retry::RetryPolicy;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Largest accepted backoff multiplier.
pub const MAX_BACKOFF_MULTIPLIER: f64 = 100.0;

/// Configuration for the state-transition client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// JSON-RPC endpoint of the aggregator
    pub aggregator_url: String,
    /// Inclusion proof polling
    pub retry: RetryConfig,
}

/// Polling configuration, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the second attempt
    pub interval_ms: u64,
    /// Upper bound for the delay between attempts
    pub max_interval_ms: u64,
    /// Factor applied to the delay after every attempt
    pub backoff_multiplier: f64,
    /// Maximum number of attempts, unlimited if absent
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Overall deadline, none if absent
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            aggregator_url: "http://localhost:3000".to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            max_interval_ms: 10_000,
            backoff_multiplier: 2.0,
            max_attempts: None,
            timeout_ms: Some(60_000),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            interval: Duration::from_millis(config.interval_ms),
            max_interval: Duration::from_millis(config.max_interval_ms),
            backoff_multiplier: config.backoff_multiplier,
            max_attempts: config.max_attempts,
            timeout: config.timeout_ms.map(Duration::from_millis),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: ClientConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if !self.aggregator_url.starts_with("http://") && !self.aggregator_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "aggregator url must be http(s): {}",
                self.aggregator_url
            )));
        }
        if self.retry.interval_ms == 0 || self.retry.max_interval_ms < self.retry.interval_ms {
            return Err(ClientError::Config(
                "retry interval must be positive and not above max interval".to_string(),
            ));
        }
        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || !(1.0..=MAX_BACKOFF_MULTIPLIER).contains(&multiplier) {
            return Err(ClientError::Config(format!(
                "backoff multiplier must be between 1 and {}",
                MAX_BACKOFF_MULTIPLIER
            )));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(ClientError::Config("max attempts must be positive".to_string()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }
}
