//! Per-node protocol state and the pull operation.
//!
//! A `NodeSlot` pairs a node with the state the invalidation protocol keeps
//! for it: change flags, the snapshot of upstream attributes taken at the
//! last initialization, the node's output and its counters.
//!
//! # Pull
//!
//! ```text
//! clear output
//!   │
//!   ├─ predecessor changed? ── yes ─► consume its flag
//!   │                                 snapshot stale? ─► pending_initialize
//!   │                                 otherwise       ─► pending_reset
//!   │                                 raise own flag
//!   ▼
//! pending_initialize ─► initialize   (reset dropped)
//! pending_reset      ─► reset
//!   │
//!   ▼
//! compute ─► output
//! ```

use crate::error::{ChainError, ChainResult};
use crate::pipeline::attributes::{Attributes, ChangeFlags};
use crate::pipeline::id::NodeId;
use crate::pipeline::lifetime::{Clock, Lifetime};
use crate::pipeline::node::{AnyNode, NodeContext, NodeKind};
use crate::pipeline::packet::Chunk;
use crate::pipeline::value::AttrValue;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// What a pull did before computing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PullAction {
    Initialized,
    Reset,
    /// Neither initialize nor reset was pending.
    Computed,
}

/// Counters kept per node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    pub pulls: u64,
    pub initializations: u64,
    pub resets: u64,
    /// Pulls whose compute step ran.
    pub computations: u64,
    /// Pulls that left output populated.
    pub outputs: u64,
    /// Pulls of an expired source, where compute was skipped.
    pub expired_pulls: u64,
    pub last_action: Option<PullAction>,
}

/// Read-only view of the ancestors of one node.
#[derive(Clone, Copy)]
pub struct Upstream<'a> {
    slots: &'a [NodeSlot],
    start: Option<NodeId>,
    requester: &'static str,
}

impl<'a> Upstream<'a> {
    /// `slots` must contain every ancestor reachable from `start`.
    pub(crate) fn new(slots: &'a [NodeSlot], start: Option<NodeId>, requester: &'static str) -> Self {
        Self {
            slots,
            start,
            requester,
        }
    }

    /// Walk from the immediate predecessor towards the head and return the
    /// first declared value of `name`.
    pub fn find(&self, name: &str) -> ChainResult<&'a AttrValue> {
        let mut cursor = self.start;
        while let Some(id) = cursor {
            let slot = self
                .slots
                .get(id.index())
                .ok_or(ChainError::UnknownNode(id))?;
            if let Some(value) = slot.attributes.get(name) {
                return Ok(value);
            }
            cursor = slot.predecessor;
        }
        Err(ChainError::MissingUpstreamAttribute {
            node_type: self.requester.to_string(),
            attribute: name.to_string(),
        })
    }

    /// The immediate predecessor's output.
    pub fn input(&self) -> Option<&'a Chunk> {
        let id = self.start?;
        self.slots.get(id.index())?.output.as_ref()
    }
}

/// A node plus its protocol state.
pub struct NodeSlot {
    pub(crate) node: AnyNode,
    pub(crate) predecessor: Option<NodeId>,
    pub(crate) attributes: Attributes,
    pub(crate) flags: ChangeFlags,
    pub(crate) upstream_snapshot: BTreeMap<String, AttrValue>,
    pub(crate) initialized: bool,
    pub(crate) output: Option<Chunk>,
    pub(crate) lifetime: Option<Lifetime>,
    pub(crate) stats: NodeStats,
}

impl NodeSlot {
    pub(crate) fn new(node: AnyNode, predecessor: Option<NodeId>, lifetime: Option<Lifetime>) -> Self {
        let attributes = Attributes::new(
            node.type_name(),
            node.declared_attributes(),
            node.reset_triggers(),
        );
        Self {
            node,
            predecessor,
            attributes,
            flags: ChangeFlags::default(),
            upstream_snapshot: BTreeMap::new(),
            initialized: false,
            output: None,
            lifetime,
            stats: NodeStats::default(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.node.type_name()
    }

    pub fn kind(&self) -> NodeKind {
        self.node.kind()
    }

    pub fn predecessor(&self) -> Option<NodeId> {
        self.predecessor
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn flags(&self) -> ChangeFlags {
        self.flags
    }

    pub fn output(&self) -> Option<&Chunk> {
        self.output.as_ref()
    }

    pub fn upstream_snapshot(&self) -> &BTreeMap<String, AttrValue> {
        &self.upstream_snapshot
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn lifetime(&self) -> Option<&Lifetime> {
        self.lifetime.as_ref()
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    pub fn reinit_triggers(&self) -> &'static [&'static str] {
        self.node.reinit_triggers()
    }

    /// Sources without a lifetime never expire.
    pub fn is_alive(&self, clock: &dyn Clock) -> bool {
        self.lifetime
            .as_ref()
            .map_or(true, |lifetime| lifetime.is_alive_at(clock.now()))
    }

    /// Validated external write.
    ///
    /// A rejected value leaves the attribute and all flags untouched.
    pub(crate) fn set_attribute(&mut self, name: &str, value: AttrValue) -> ChainResult<()> {
        let value = self.attributes.prepare(name, value)?;
        self.node
            .check_value(name, &value)
            .map_err(|reason| ChainError::InvalidConfiguration {
                node_type: self.node.type_name().to_string(),
                attribute: name.to_string(),
                reason,
            })?;
        self.attributes.write(&mut self.flags, name, value)
    }

    /// Pull this node once.
    ///
    /// `ancestors` holds every slot with a smaller id than this one; the
    /// predecessor's change flag is the only state of theirs that is written.
    pub(crate) fn pull(
        &mut self,
        ancestors: &mut [NodeSlot],
        clock: &dyn Clock,
        timestamp: Duration,
        cycle: u64,
    ) -> ChainResult<PullAction> {
        self.output = None;
        self.stats.pulls += 1;

        if let Some(pred) = self.predecessor {
            let pred_slot = ancestors
                .get_mut(pred.index())
                .ok_or(ChainError::UnknownNode(pred))?;
            if pred_slot.flags.changed {
                pred_slot.flags.changed = false;
                let upstream = Upstream::new(ancestors, Some(pred), self.type_name());
                if self.requires_reinitialization(&upstream)? {
                    self.flags.pending_initialize = true;
                } else {
                    self.flags.pending_reset = true;
                }
                self.flags.changed = true;
            }
        }

        let upstream = Upstream::new(ancestors, self.predecessor, self.type_name());
        let action = self.resolve_pending(upstream, clock, timestamp, cycle)?;
        self.stats.last_action = Some(action);

        if !self.is_alive(clock) {
            self.stats.expired_pulls += 1;
            tracing::trace!("{} expired, skipping compute", self.type_name());
            return Ok(action);
        }

        let mut ctx = NodeContext::new(
            &mut self.attributes,
            &mut self.flags,
            upstream,
            timestamp,
            cycle,
        );
        let output = self.node.compute(&mut ctx)?;
        self.stats.computations += 1;
        if output.is_some() {
            self.stats.outputs += 1;
        }
        self.output = output;
        Ok(action)
    }

    /// A node that was never initialized always needs it; otherwise only a
    /// changed value of one of its reinit triggers does.
    fn requires_reinitialization(&self, upstream: &Upstream<'_>) -> ChainResult<bool> {
        if !self.initialized {
            return Ok(true);
        }
        for (name, saved) in &self.upstream_snapshot {
            let current = upstream.find(name)?;
            if current != saved {
                tracing::debug!(
                    "{}: upstream {} changed {} -> {}",
                    self.type_name(),
                    name,
                    saved,
                    current
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Run initialize or reset if scheduled, then clear both flags.
    ///
    /// On failure the flags stay set so the next pull retries.
    fn resolve_pending(
        &mut self,
        upstream: Upstream<'_>,
        clock: &dyn Clock,
        timestamp: Duration,
        cycle: u64,
    ) -> ChainResult<PullAction> {
        let action = if self.flags.pending_initialize {
            self.initialize(upstream, clock, timestamp, cycle)?;
            PullAction::Initialized
        } else if self.flags.pending_reset {
            let mut ctx = NodeContext::new(
                &mut self.attributes,
                &mut self.flags,
                upstream,
                timestamp,
                cycle,
            );
            self.node.reset(&mut ctx)?;
            self.stats.resets += 1;
            tracing::debug!("{} reset", self.node.type_name());
            PullAction::Reset
        } else {
            PullAction::Computed
        };
        self.flags.pending_initialize = false;
        self.flags.pending_reset = false;
        Ok(action)
    }

    /// Snapshot the reinit triggers, then run the node's setup.
    ///
    /// The snapshot is only committed once setup succeeded.
    fn initialize(
        &mut self,
        upstream: Upstream<'_>,
        clock: &dyn Clock,
        timestamp: Duration,
        cycle: u64,
    ) -> ChainResult<()> {
        let snapshot = self
            .node
            .reinit_triggers()
            .iter()
            .map(|name| {
                upstream
                    .find(name)
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect::<ChainResult<BTreeMap<_, _>>>()?;

        let mut ctx = NodeContext::new(
            &mut self.attributes,
            &mut self.flags,
            upstream,
            timestamp,
            cycle,
        );
        self.node.initialize(&mut ctx)?;

        self.upstream_snapshot = snapshot;
        self.initialized = true;
        if let Some(lifetime) = self.lifetime.as_mut() {
            lifetime.mark_birth(clock.now());
        }
        self.stats.initializations += 1;
        tracing::debug!(
            "{} initialized (snapshot: {:?})",
            self.node.type_name(),
            self.upstream_snapshot
        );
        Ok(())
    }
}

impl std::fmt::Debug for NodeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSlot")
            .field("node", &self.node)
            .field("predecessor", &self.predecessor)
            .field("flags", &self.flags)
            .field("initialized", &self.initialized)
            .finish()
    }
}
