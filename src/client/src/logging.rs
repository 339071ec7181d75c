//! Logging bootstrap for binaries and integration tests.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs a global `tracing` subscriber filtered by `RUST_LOG`.
///
/// Fails if a global subscriber is already set.
pub fn init() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
