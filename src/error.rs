//! Error handling for pullchain
//!
//! This module defines the error type shared by the chain, its nodes, the
//! driver and the configuration loader, together with a Result alias.

use crate::pipeline::id::NodeId;
use thiserror::Error;

/// Main error type for chain operations
#[derive(Error, Debug)]
pub enum ChainError {
    /// An attribute write was rejected by the node's validation
    #[error("Invalid configuration for {node_type}.{attribute}: {reason}")]
    InvalidConfiguration {
        node_type: String,
        attribute: String,
        reason: String,
    },

    /// Ancestor traversal reached the chain head without finding the attribute
    #[error("None of the predecessors of a {node_type} node declares attribute '{attribute}'")]
    MissingUpstreamAttribute {
        node_type: String,
        attribute: String,
    },

    /// Write to an attribute the node never declared
    #[error("{node_type} has no attribute '{attribute}'")]
    UnknownAttribute {
        node_type: String,
        attribute: String,
    },

    /// Structural error while linking nodes
    #[error("Linkage error: {0}")]
    Linkage(String),

    /// Node id does not belong to the chain
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// A node hook reported a failure
    #[error("{node_type} failed: {message}")]
    Compute { node_type: String, message: String },

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ChainError>,
    },
}

impl ChainError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ChainError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a hook failure for the given node type
    pub fn compute(node_type: impl Into<String>, message: impl Into<String>) -> Self {
        ChainError::Compute {
            node_type: node_type.into(),
            message: message.into(),
        }
    }

    /// Whether this error indicates a structurally broken chain.
    ///
    /// Fatal errors should abort the driver rather than be retried next cycle.
    pub fn is_fatal(&self) -> bool {
        match self {
            ChainError::MissingUpstreamAttribute { .. } | ChainError::Linkage(_) => true,
            ChainError::WithContext { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

/// Result type alias for chain operations
pub type ChainResult<T> = std::result::Result<T, ChainError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> ChainResult<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> ChainResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for ChainResult<T> {
    fn context(self, context: impl Into<String>) -> ChainResult<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> ChainResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
