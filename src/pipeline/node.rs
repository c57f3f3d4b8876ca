//! Node contracts.
//!
//! Three contracts fix the capability set of a node:
//! - **`SourceNode`** — chain heads. No predecessor and nothing upstream to
//!   react to, so no reinit triggers.
//! - **`ProcessorNode`** — transforms its predecessor's output.
//! - **`OutputNode`** — chain terminus by convention.
//!
//! All three extend `NodeBehavior`. Every method is required: a type that
//! leaves one out does not compile, so there is no "not implemented" runtime
//! path.
//!
//! `AnyNode` wraps the three kinds so the chain can handle them uniformly.

use crate::error::ChainResult;
use crate::pipeline::attributes::{Attributes, ChangeFlags};
use crate::pipeline::packet::Chunk;
use crate::pipeline::slot::Upstream;
use crate::pipeline::value::AttrValue;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Context passed to node lifecycle hooks.
pub struct NodeContext<'a> {
    attributes: &'a mut Attributes,
    flags: &'a mut ChangeFlags,
    upstream: Upstream<'a>,
    /// Time of the current cycle, relative to chain start.
    pub timestamp: Duration,
    /// Monotonic cycle counter.
    pub cycle: u64,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(
        attributes: &'a mut Attributes,
        flags: &'a mut ChangeFlags,
        upstream: Upstream<'a>,
        timestamp: Duration,
        cycle: u64,
    ) -> Self {
        Self {
            attributes,
            flags,
            upstream,
            timestamp,
            cycle,
        }
    }

    /// Type name of the node being driven.
    pub fn type_name(&self) -> &'static str {
        self.attributes.owner()
    }

    /// Current value of one of this node's own attributes.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(AttrValue::as_float)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(AttrValue::as_int)
    }

    /// Write one of this node's own attributes.
    ///
    /// The node is trusted with its own values, so no validation runs, but a
    /// write to a reset trigger still raises `changed` for the successor.
    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) -> ChainResult<()> {
        self.attributes.write(self.flags, name, value.into())
    }

    /// Value of `name` on the nearest ancestor that declares it.
    pub fn find_upstream(&self, name: &str) -> ChainResult<&AttrValue> {
        self.upstream.find(name)
    }

    /// Output of the immediate predecessor for this cycle.
    pub fn input(&self) -> Option<&Chunk> {
        self.upstream.input()
    }
}

/// Capabilities every node supplies.
pub trait NodeBehavior: Send {
    /// Type name used in logs and error messages.
    fn type_name(&self) -> &'static str;

    /// Attributes this node exposes, with their initial values.
    fn declared_attributes(&self) -> Vec<(&'static str, AttrValue)>;

    /// Own attributes whose mutation schedules a reset.
    fn reset_triggers(&self) -> &'static [&'static str];

    /// Validate a value before it is committed to attribute `name`.
    fn check_value(&self, name: &str, value: &AttrValue) -> Result<(), String>;

    /// Heavy setup. Runs after the upstream snapshot has been taken and may
    /// run several cycles in a row without an intervening change.
    fn initialize(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<()>;

    /// Drop transient state only; configuration stays as initialized.
    fn reset(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<()>;

    /// Per-cycle computation. `None` means "no new data this cycle".
    fn compute(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<Option<Chunk>>;
}

/// Head of a chain.
pub trait SourceNode: NodeBehavior {}

/// Transforms its predecessor's output.
pub trait ProcessorNode: NodeBehavior {
    /// Ancestor attributes whose change requires reinitialization.
    fn reinit_triggers(&self) -> &'static [&'static str];
}

/// Consumes its predecessor's output at the end of a chain.
pub trait OutputNode: NodeBehavior {
    /// Ancestor attributes whose change requires reinitialization.
    fn reinit_triggers(&self) -> &'static [&'static str];
}

/// Role of a node in its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Source,
    Processor,
    Output,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Source => write!(f, "source"),
            NodeKind::Processor => write!(f, "processor"),
            NodeKind::Output => write!(f, "output"),
        }
    }
}

/// A node of any kind.
pub enum AnyNode {
    Source(Box<dyn SourceNode>),
    Processor(Box<dyn ProcessorNode>),
    Output(Box<dyn OutputNode>),
}

impl AnyNode {
    pub fn source(node: impl SourceNode + 'static) -> Self {
        AnyNode::Source(Box::new(node))
    }

    pub fn processor(node: impl ProcessorNode + 'static) -> Self {
        AnyNode::Processor(Box::new(node))
    }

    pub fn output(node: impl OutputNode + 'static) -> Self {
        AnyNode::Output(Box::new(node))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            AnyNode::Source(_) => NodeKind::Source,
            AnyNode::Processor(_) => NodeKind::Processor,
            AnyNode::Output(_) => NodeKind::Output,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AnyNode::Source(n) => n.type_name(),
            AnyNode::Processor(n) => n.type_name(),
            AnyNode::Output(n) => n.type_name(),
        }
    }

    pub fn declared_attributes(&self) -> Vec<(&'static str, AttrValue)> {
        match self {
            AnyNode::Source(n) => n.declared_attributes(),
            AnyNode::Processor(n) => n.declared_attributes(),
            AnyNode::Output(n) => n.declared_attributes(),
        }
    }

    pub fn reset_triggers(&self) -> &'static [&'static str] {
        match self {
            AnyNode::Source(n) => n.reset_triggers(),
            AnyNode::Processor(n) => n.reset_triggers(),
            AnyNode::Output(n) => n.reset_triggers(),
        }
    }

    /// Always empty for sources.
    pub fn reinit_triggers(&self) -> &'static [&'static str] {
        match self {
            AnyNode::Source(_) => &[],
            AnyNode::Processor(n) => n.reinit_triggers(),
            AnyNode::Output(n) => n.reinit_triggers(),
        }
    }

    pub fn check_value(&self, name: &str, value: &AttrValue) -> Result<(), String> {
        match self {
            AnyNode::Source(n) => n.check_value(name, value),
            AnyNode::Processor(n) => n.check_value(name, value),
            AnyNode::Output(n) => n.check_value(name, value),
        }
    }

    pub fn initialize(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<()> {
        match self {
            AnyNode::Source(n) => n.initialize(ctx),
            AnyNode::Processor(n) => n.initialize(ctx),
            AnyNode::Output(n) => n.initialize(ctx),
        }
    }

    pub fn reset(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<()> {
        match self {
            AnyNode::Source(n) => n.reset(ctx),
            AnyNode::Processor(n) => n.reset(ctx),
            AnyNode::Output(n) => n.reset(ctx),
        }
    }

    pub fn compute(&mut self, ctx: &mut NodeContext<'_>) -> ChainResult<Option<Chunk>> {
        match self {
            AnyNode::Source(n) => n.compute(ctx),
            AnyNode::Processor(n) => n.compute(ctx),
            AnyNode::Output(n) => n.compute(ctx),
        }
    }
}

impl std::fmt::Debug for AnyNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyNode")
            .field("kind", &self.kind())
            .field("type_name", &self.type_name())
            .finish()
    }
}
