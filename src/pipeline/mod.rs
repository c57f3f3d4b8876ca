//! Pull-based processing chains with change propagation.
//!
//! Nodes are linked into linear chains: a source at the head, processors in
//! the middle, an output at the tail. Each cycle the driver pulls every node
//! once, head to tail. Configuration changes travel down the chain one hop
//! per pull and make each successor either reset (drop transient state) or
//! reinitialize (rebuild against the new upstream configuration).
//!
//! # Architecture
//!
//! ```text
//! [SyntheticSource] ──► [Gain] ──► [MovingAverage] ──► [ChannelSink] ──► controller
//!        ▲                                                                  │
//!        └──────────────── ChainCommand::SetAttribute ◄─────────────────────┘
//! ```
//!
//! # Design
//!
//! - **Enum dispatch** — `AnyNode` wraps the three node contracts.
//! - **Flat storage** — `Vec<NodeSlot>` with `NodeId` as array index; a
//!   predecessor always has a lower index than its successor.
//! - **Single write path** — every attribute write goes through
//!   `Attributes::write`, which raises the change flags.
//! - **Injectable clock** — source lifetimes read time from a `Clock`.

pub mod attributes;
pub mod bridge;
pub mod chain;
pub mod driver;
pub mod id;
pub mod lifetime;
pub mod node;
pub mod node_type;
pub mod nodes;
pub mod packet;
pub mod slot;
pub mod value;

pub use attributes::{Attributes, ChangeFlags};
pub use bridge::{ChainBridge, ChainCommand, ChainSnapshot, NodeSnapshot, SinkMessage};
pub use chain::Chain;
pub use driver::{Driver, DriverConfig, DriverReport, StopReason};
pub use id::NodeId;
pub use lifetime::{Clock, Lifetime, ManualClock, SystemClock};
pub use node::{AnyNode, NodeBehavior, NodeContext, NodeKind, OutputNode, ProcessorNode, SourceNode};
pub use node_type::{NodeFactory, NodeType};
pub use packet::Chunk;
pub use slot::{NodeSlot, NodeStats, PullAction, Upstream};
pub use value::AttrValue;
