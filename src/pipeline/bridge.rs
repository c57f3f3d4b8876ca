//! Thread boundary between a driver thread and whoever controls it.
//!
//! The driver owns the chain. Other threads reach it only through
//! `ChainCommand`s, which the driver applies between cycles, and observe it
//! through `SinkMessage`s sent by sink nodes and by the driver itself.

use crate::pipeline::attributes::ChangeFlags;
use crate::pipeline::id::NodeId;
use crate::pipeline::node::NodeKind;
use crate::pipeline::packet::Chunk;
use crate::pipeline::slot::NodeStats;
use crate::pipeline::value::AttrValue;
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Serialize;
use std::collections::BTreeMap;

/// Messages sent from sinks and the driver to the controlling thread.
#[derive(Debug, Clone)]
pub enum SinkMessage {
    /// A chunk that reached a sink.
    Chunk(Chunk),

    /// A sink (re)initialized against this upstream stream layout.
    Configured {
        frequency: f64,
        channel_labels: Vec<String>,
    },

    /// An attribute write requested via `ChainCommand::SetAttribute` was
    /// rejected.
    AttributeRejected {
        node_id: NodeId,
        attribute: String,
        error: String,
    },

    /// A cycle failed with a recoverable error and was skipped.
    CycleError { cycle: u64, message: String },

    /// Response to `ChainCommand::RequestSnapshot`.
    Snapshot(ChainSnapshot),

    /// The driver is shutting down.
    Shutdown,
}

/// Serializable view of one node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub type_name: String,
    pub kind: NodeKind,
    pub predecessor: Option<NodeId>,
    pub attributes: BTreeMap<String, AttrValue>,
    pub flags: ChangeFlags,
    pub upstream_snapshot: BTreeMap<String, AttrValue>,
    pub has_output: bool,
    pub alive: bool,
    pub stats: NodeStats,
}

/// Serializable view of a whole chain.
#[derive(Debug, Clone, Serialize)]
pub struct ChainSnapshot {
    pub cycle: u64,
    pub nodes: Vec<NodeSnapshot>,
}

impl ChainSnapshot {
    pub fn to_json(&self) -> crate::error::ChainResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::error::ChainError::Serialization(e.to_string()))
    }
}

/// Commands sent to the driver thread. Applied between cycles.
#[derive(Debug, Clone)]
pub enum ChainCommand {
    /// Validated attribute write on one node.
    SetAttribute {
        node_id: NodeId,
        name: String,
        value: AttrValue,
    },
    /// Ask for a `SinkMessage::Snapshot`.
    RequestSnapshot,
    /// Stop the driver after the current cycle.
    Shutdown,
}

/// Channel capacity for commands (controller → driver).
const CMD_CHANNEL_CAPACITY: usize = 256;
/// Channel capacity for messages (driver → controller).
const MSG_CHANNEL_CAPACITY: usize = 10_000;

/// Controller-side handle for a driver thread.
pub struct ChainBridge {
    pub cmd_tx: Sender<ChainCommand>,
    pub msg_rx: Receiver<SinkMessage>,
}

impl ChainBridge {
    /// Create a new bridge pair: `(bridge, cmd_rx, msg_tx)`.
    ///
    /// The driver thread owns `cmd_rx` and `msg_tx`.
    pub fn new() -> (Self, Receiver<ChainCommand>, Sender<SinkMessage>) {
        let (cmd_tx, cmd_rx) = bounded(CMD_CHANNEL_CAPACITY);
        let (msg_tx, msg_rx) = bounded(MSG_CHANNEL_CAPACITY);
        (Self { cmd_tx, msg_rx }, cmd_rx, msg_tx)
    }

    /// Drain all pending messages.
    pub fn drain(&self) -> Vec<SinkMessage> {
        let mut msgs = Vec::new();
        while let Ok(msg) = self.msg_rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }

    /// Try to receive a single message without blocking.
    pub fn try_recv(&self) -> Option<SinkMessage> {
        self.msg_rx.try_recv().ok()
    }

    pub fn send_command(&self, cmd: ChainCommand) -> bool {
        self.cmd_tx.send(cmd).is_ok()
    }

    pub fn set_attribute(&self, node_id: NodeId, name: impl Into<String>, value: impl Into<AttrValue>) {
        let _ = self.cmd_tx.send(ChainCommand::SetAttribute {
            node_id,
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn request_snapshot(&self) {
        let _ = self.cmd_tx.send(ChainCommand::RequestSnapshot);
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(ChainCommand::Shutdown);
    }
}
