//! # pullchain: pull-driven processing chains
//!
//! Linear chains of signal-processing nodes driven one pull at a time. When a
//! node's configuration changes, its successors are told on their next pull
//! and either reset their transient state or reinitialize against the new
//! upstream configuration. The change travels exactly one hop per pull.
//!
//! ## Architecture
//!
//! - **Pipeline**: node contracts, the chain that links and pulls them, the
//!   built-in nodes and the driver loop
//! - **Config**: TOML chain files with driver and logging settings
//! - **Communication**: crossbeam channels between the driver thread and its
//!   controller
//!
//! ## Configuration
//!
//! The default chain file lives in the platform config directory under
//! `dev.hxyulin.pullchain`:
//!
//! - **Linux**: `~/.config/dev.hxyulin.pullchain/chain.toml`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.pullchain/chain.toml`
//! - **Windows**: `%APPDATA%\dev.hxyulin.pullchain\chain.toml`
//!
//! ## Example
//!
//! ```ignore
//! use pullchain::pipeline::{Chain, nodes::{Gain, SyntheticSource}};
//!
//! let mut chain = Chain::new();
//! let src = chain.add_source(SyntheticSource::new())?;
//! let gain = chain.add_processor(Gain::new(), src)?;
//!
//! chain.run_cycle()?;
//! chain.set_attribute(src, "frequency", 512.0)?;
//! // the source resets now, the gain learns of it on this pull
//! chain.run_cycle()?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;

// Re-export commonly used types
pub use config::{ChainConfig, NodeConfig};
pub use error::{ChainError, ChainResult, ResultExt};
pub use pipeline::{
    AttrValue, Chain, ChainBridge, Chunk, Driver, DriverConfig, DriverReport, NodeFactory, NodeId,
    NodeType,
};
