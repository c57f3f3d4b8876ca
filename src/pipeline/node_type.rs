//! Node type enumeration for creating nodes from configuration.
//!
//! This module defines the node types a chain file can name and the factory
//! that turns them into live nodes.

use crate::pipeline::bridge::SinkMessage;
use crate::pipeline::node::{AnyNode, NodeKind};
use crate::pipeline::nodes::{ChannelSink, Gain, MovingAverage, SyntheticSource};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

/// Types of built-in nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Multi-channel sine generator.
    SyntheticSource,
    /// Constant gain.
    Gain,
    /// Per-channel moving average.
    MovingAverage,
    /// Forwards chunks to the controlling thread.
    ChannelSink,
}

impl NodeType {
    /// Get the display name for this node type.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeType::SyntheticSource => "Synthetic Source",
            NodeType::Gain => "Gain",
            NodeType::MovingAverage => "Moving Average",
            NodeType::ChannelSink => "Channel Sink",
        }
    }

    /// Get all available node types.
    pub fn all() -> &'static [NodeType] {
        &[
            NodeType::SyntheticSource,
            NodeType::Gain,
            NodeType::MovingAverage,
            NodeType::ChannelSink,
        ]
    }

    /// Role the node plays in a chain.
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeType::SyntheticSource => NodeKind::Source,
            NodeType::Gain | NodeType::MovingAverage => NodeKind::Processor,
            NodeType::ChannelSink => NodeKind::Output,
        }
    }

    /// Get a detailed description of what this node does.
    pub fn description(&self) -> &'static str {
        match self {
            NodeType::SyntheticSource =>
                "Generates one sine per channel.\n\
                 Channel k carries a (k+1) Hz tone.\n\
                 Any attribute change resets the phase.",

            NodeType::Gain =>
                "Multiplies every sample by `gain`.\n\
                 Stateless.",

            NodeType::MovingAverage =>
                "Boxcar average over `window` samples.\n\
                 Reinitializes when the upstream channel count changes.",

            NodeType::ChannelSink =>
                "Sends chunks to the controlling thread.\n\
                 Announces the upstream frequency on every initialization.",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Builds nodes by type.
///
/// Holds the sender that sink nodes forward to.
#[derive(Clone)]
pub struct NodeFactory {
    msg_tx: Sender<SinkMessage>,
}

impl NodeFactory {
    pub fn new(msg_tx: Sender<SinkMessage>) -> Self {
        Self { msg_tx }
    }

    pub fn create(&self, node_type: NodeType) -> AnyNode {
        match node_type {
            NodeType::SyntheticSource => AnyNode::source(SyntheticSource::new()),
            NodeType::Gain => AnyNode::processor(Gain::new()),
            NodeType::MovingAverage => AnyNode::processor(MovingAverage::new()),
            NodeType::ChannelSink => AnyNode::output(ChannelSink::new(self.msg_tx.clone())),
        }
    }
}
