//! Configuration module for pullchain
//!
//! A chain file describes one linear chain plus the settings of the driver
//! that runs it and the default log filter.
//!
//! # Config Location
//!
//! Without an explicit path the file is looked up in the platform-appropriate
//! config directory:
//! - **Linux**: `~/.config/dev.hxyulin.pullchain/chain.toml`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.pullchain/chain.toml`
//! - **Windows**: `%APPDATA%\dev.hxyulin.pullchain\chain.toml`
//!
//! # Example
//!
//! ```toml
//! [driver]
//! cycle_rate_hz = 50
//! max_cycles = 500
//!
//! [[nodes]]
//! type = "synthetic_source"
//! lifetime_seconds = 10.0
//! attributes = { frequency = 512.0, channel_count = 2 }
//!
//! [[nodes]]
//! type = "moving_average"
//! attributes = { window = 8 }
//!
//! [[nodes]]
//! type = "channel_sink"
//! ```

use crate::error::{ChainError, ChainResult, ResultExt};
use crate::pipeline::chain::Chain;
use crate::pipeline::driver::DriverConfig;
use crate::pipeline::id::NodeId;
use crate::pipeline::lifetime::Clock;
use crate::pipeline::node::NodeKind;
use crate::pipeline::node_type::{NodeFactory, NodeType};
use crate::pipeline::value::AttrValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use crate::pipeline::driver::DEFAULT_CYCLE_RATE_HZ;

/// Application identifier for config directories
pub const APP_ID: &str = "dev.hxyulin.pullchain";

/// Chain config filename
pub const CONFIG_FILE: &str = "chain.toml";

/// Log filter used when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "info,pullchain=debug";

/// Get the application config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path of the default chain file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// One node of the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(rename = "type")]
    pub node_type: NodeType,

    /// Only valid on the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime_seconds: Option<f64>,

    /// Overrides applied on top of the node's declared defaults
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttrValue>,
}

impl NodeConfig {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            lifetime_seconds: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_lifetime(mut self, seconds: f64) -> Self {
        self.lifetime_seconds = Some(seconds);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Complete chain file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub driver: DriverConfig,
    pub logging: LoggingConfig,
    /// Head first; each node is linked after the previous one
    pub nodes: Vec<NodeConfig>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            driver: DriverConfig::default(),
            logging: LoggingConfig::default(),
            nodes: vec![
                NodeConfig::new(NodeType::SyntheticSource),
                NodeConfig::new(NodeType::MovingAverage),
                NodeConfig::new(NodeType::ChannelSink),
            ],
        }
    }
}

impl ChainConfig {
    /// Parse a chain file from TOML text
    pub fn parse(content: &str) -> ChainResult<Self> {
        toml::from_str(content)
            .map_err(|e| ChainError::Config(format!("Failed to parse chain file: {}", e)))
    }

    /// Load a chain file from disk
    pub fn load(path: impl AsRef<Path>) -> ChainResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChainError::Config(format!("Failed to read chain file {:?}: {}", path, e))
        })?;
        Self::parse(&content).context(format!("{:?}", path))
    }

    /// Load a chain file, returning defaults if it does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> ChainResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No chain file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save the chain file as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> ChainResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ChainError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ChainError::Serialization(format!("Failed to serialize chain: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            ChainError::Config(format!("Failed to write chain file {:?}: {}", path, e))
        })
    }

    /// Build the described chain.
    ///
    /// The first node must be a source. Attribute overrides go through the
    /// same validated write path as runtime writes, so a bad value aborts the
    /// build with the node's own error.
    pub fn build_chain(&self, factory: &NodeFactory, clock: Arc<dyn Clock>) -> ChainResult<Chain> {
        let mut chain = Chain::with_clock(clock);
        let mut previous: Option<NodeId> = None;

        for (index, node_config) in self.nodes.iter().enumerate() {
            let node_type = node_config.node_type;
            if index == 0 && node_type.kind() != NodeKind::Source {
                return Err(ChainError::Config(format!(
                    "Chain must start with a source, found {}",
                    node_type
                )));
            }

            let id = chain
                .insert(factory.create(node_type), previous, node_config.lifetime_seconds)
                .with_context(|| format!("node {} ({})", index, node_type))?;

            for (name, value) in &node_config.attributes {
                chain
                    .set_attribute(id, name, value.clone())
                    .with_context(|| format!("node {} ({})", index, node_type))?;
            }
            previous = Some(id);
        }

        if chain.is_empty() {
            return Err(ChainError::Config("Chain file lists no nodes".to_string()));
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::lifetime::SystemClock;
    use crossbeam_channel::bounded;

    const SAMPLE: &str = r#"
[driver]
cycle_rate_hz = 0
max_cycles = 10

[logging]
filter = "warn"

[[nodes]]
type = "synthetic_source"
lifetime_seconds = 2.0
attributes = { frequency = 512, channel_count = 2 }

[[nodes]]
type = "gain"
attributes = { gain = 0.5 }

[[nodes]]
type = "channel_sink"
"#;

    fn factory() -> NodeFactory {
        let (tx, _rx) = bounded(1);
        NodeFactory::new(tx)
    }

    #[test]
    fn test_parse_sample() {
        let config = ChainConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.driver.cycle_rate_hz, 0);
        assert_eq!(config.driver.max_cycles, Some(10));
        assert_eq!(config.logging.filter, "warn");
        assert_eq!(config.nodes.len(), 3);
        assert_eq!(config.nodes[0].node_type, NodeType::SyntheticSource);
        assert_eq!(config.nodes[0].lifetime_seconds, Some(2.0));
        assert_eq!(config.nodes[0].attributes["frequency"], AttrValue::Int(512));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = ChainConfig::parse("[[nodes]]\ntype = \"synthetic_source\"\n").unwrap();
        assert_eq!(config.driver, DriverConfig::default());
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_build_applies_overrides() {
        let config = ChainConfig::parse(SAMPLE).unwrap();
        let chain = config.build_chain(&factory(), Arc::new(SystemClock)).unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.attribute(NodeId(0), "frequency"), Some(&AttrValue::Float(512.0)));
        assert_eq!(chain.attribute(NodeId(1), "gain"), Some(&AttrValue::Float(0.5)));
        assert_eq!(chain.predecessor(NodeId(2)), Some(NodeId(1)));
    }

    #[test]
    fn test_build_rejects_invalid_override() {
        let config = ChainConfig {
            nodes: vec![NodeConfig::new(NodeType::SyntheticSource).with_attribute("channel_count", 0i64)],
            ..Default::default()
        };
        let err = config.build_chain(&factory(), Arc::new(SystemClock)).unwrap_err();
        match err {
            ChainError::WithContext { source, .. } => {
                assert!(matches!(*source, ChainError::InvalidConfiguration { .. }))
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_build_requires_source_head() {
        let config = ChainConfig {
            nodes: vec![NodeConfig::new(NodeType::Gain)],
            ..Default::default()
        };
        assert!(matches!(
            config.build_chain(&factory(), Arc::new(SystemClock)),
            Err(ChainError::Config(_))
        ));
    }

    #[test]
    fn test_lifetime_on_processor_is_rejected() {
        let config = ChainConfig {
            nodes: vec![
                NodeConfig::new(NodeType::SyntheticSource),
                NodeConfig::new(NodeType::Gain).with_lifetime(1.0),
            ],
            ..Default::default()
        };
        let err = config.build_chain(&factory(), Arc::new(SystemClock)).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = ChainConfig::parse(SAMPLE).unwrap();
        config.save(&path).unwrap();
        assert_eq!(ChainConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ChainConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ChainConfig::default());
    }
}
