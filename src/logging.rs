//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when it is set; otherwise the filter from the chain file
//! (or the built-in default) is used.

use crate::error::{ChainError, ChainResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Resolve the filter to install.
pub fn build_filter(default_directive: &str) -> ChainResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_directive).map_err(|e| {
            ChainError::Config(format!("Invalid log filter '{}': {}", default_directive, e))
        }),
    }
}

/// Install the global subscriber.
///
/// Fails if the filter does not parse or a subscriber is already installed.
pub fn init(default_directive: &str) -> ChainResult<()> {
    tracing_subscriber::registry()
        .with(build_filter(default_directive)?)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| ChainError::Config(format!("Failed to install logger: {}", e)))
}
