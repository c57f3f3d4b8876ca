//! Chain — owns the nodes, links them and pulls them.
//!
//! Nodes live in a flat `Vec<NodeSlot>` indexed by `NodeId`. A node can only
//! be linked to a predecessor that already exists, so insertion order is a
//! valid pull order and a predecessor always sits at a lower index than its
//! successor. Pulling node `i` splits the vector at `i`: the node gets
//! `&mut` access to itself and to the ancestors' slice, of which it writes
//! only the predecessor's change flag.

use crate::error::{ChainError, ChainResult};
use crate::pipeline::attributes::ChangeFlags;
use crate::pipeline::bridge::{ChainSnapshot, NodeSnapshot};
use crate::pipeline::id::NodeId;
use crate::pipeline::lifetime::{Clock, Lifetime, SystemClock};
use crate::pipeline::node::{AnyNode, NodeKind, OutputNode, ProcessorNode, SourceNode};
use crate::pipeline::packet::Chunk;
use crate::pipeline::slot::{NodeSlot, NodeStats, PullAction, Upstream};
use crate::pipeline::value::AttrValue;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// One or more linear chains of nodes.
pub struct Chain {
    slots: Vec<NodeSlot>,
    clock: Arc<dyn Clock>,
    cycle: u64,
    start_time: Option<DateTime<Utc>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Use `clock` for source lifetimes and cycle timestamps.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Vec::new(),
            clock,
            cycle: 0,
            start_time: None,
        }
    }

    // ── Linkage ──

    /// Add a chain head.
    pub fn add_source(&mut self, node: impl SourceNode + 'static) -> ChainResult<NodeId> {
        self.insert(AnyNode::source(node), None, None)
    }

    /// Add a chain head that stops producing output `seconds` after it was
    /// initialized.
    pub fn add_source_with_lifetime(
        &mut self,
        node: impl SourceNode + 'static,
        seconds: f64,
    ) -> ChainResult<NodeId> {
        self.insert(AnyNode::source(node), None, Some(seconds))
    }

    pub fn add_processor(
        &mut self,
        node: impl ProcessorNode + 'static,
        predecessor: NodeId,
    ) -> ChainResult<NodeId> {
        self.insert(AnyNode::processor(node), Some(predecessor), None)
    }

    pub fn add_output(
        &mut self,
        node: impl OutputNode + 'static,
        predecessor: NodeId,
    ) -> ChainResult<NodeId> {
        self.insert(AnyNode::output(node), Some(predecessor), None)
    }

    /// Add a node of any kind. Sources take no predecessor, everything else
    /// takes exactly one; only sources may have a lifetime.
    pub fn insert(
        &mut self,
        node: AnyNode,
        predecessor: Option<NodeId>,
        lifetime_seconds: Option<f64>,
    ) -> ChainResult<NodeId> {
        let type_name = node.type_name();
        let kind = node.kind();

        match (kind, predecessor) {
            (NodeKind::Source, Some(_)) => {
                return Err(ChainError::Linkage(format!(
                    "{} is a source and cannot have a predecessor",
                    type_name
                )));
            }
            (NodeKind::Processor | NodeKind::Output, None) => {
                return Err(ChainError::Linkage(format!(
                    "{} ({}) requires a predecessor",
                    type_name, kind
                )));
            }
            _ => {}
        }

        let lifetime = match lifetime_seconds {
            None => None,
            Some(_) if kind != NodeKind::Source => {
                return Err(ChainError::Linkage(format!(
                    "{} ({}) cannot have a lifetime",
                    type_name, kind
                )));
            }
            Some(seconds) => Some(Lifetime::new(seconds).ok_or_else(|| {
                ChainError::InvalidConfiguration {
                    node_type: type_name.to_string(),
                    attribute: "lifetime_seconds".to_string(),
                    reason: format!("must be positive and finite, got {}", seconds),
                }
            })?),
        };

        let declared = node.declared_attributes();
        for trigger in node.reset_triggers() {
            if !declared.iter().any(|(name, _)| name == trigger) {
                return Err(ChainError::Linkage(format!(
                    "{} declares reset trigger '{}' but no such attribute",
                    type_name, trigger
                )));
            }
        }

        if let Some(pred) = predecessor {
            if pred.index() >= self.slots.len() {
                return Err(ChainError::UnknownNode(pred));
            }
            if let Some(existing) = self.successor_of(pred) {
                return Err(ChainError::Linkage(format!(
                    "{} {} already feeds {} {}; a node has at most one successor",
                    self.slots[pred.index()].type_name(),
                    pred,
                    self.slots[existing.index()].type_name(),
                    existing
                )));
            }
            let upstream = Upstream::new(&self.slots, Some(pred), type_name);
            for trigger in node.reinit_triggers() {
                upstream.find(trigger)?;
            }
        }

        let id = NodeId::try_from(self.slots.len()).map_err(|_| {
            ChainError::Linkage(format!(
                "cannot add {}: chain already holds {} nodes",
                type_name,
                self.slots.len()
            ))
        })?;
        self.slots.push(NodeSlot::new(node, predecessor, lifetime));
        match predecessor {
            Some(pred) => tracing::info!("Linked {} {:?} after {:?}", type_name, id, pred),
            None => tracing::info!("Added {} {:?} as chain head", type_name, id),
        }
        Ok(id)
    }

    fn successor_of(&self, id: NodeId) -> Option<NodeId> {
        self.ids()
            .zip(&self.slots)
            .find(|(_, slot)| slot.predecessor == Some(id))
            .map(|(successor, _)| successor)
    }

    // ── Attributes ──

    /// Validate and commit an attribute value.
    ///
    /// Rejected values leave the node exactly as it was. Writing one of the
    /// node's reset triggers schedules a reset and raises its change flag
    /// immediately.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<AttrValue>,
    ) -> ChainResult<()> {
        let slot = self.slot_mut(id)?;
        let value = value.into();
        match slot.set_attribute(name, value.clone()) {
            Ok(()) => {
                tracing::debug!("{} {:?}: {} = {}", slot.type_name(), id, name, value);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Rejected {} = {} on {:?}: {}", name, value, id, e);
                Err(e)
            }
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&AttrValue> {
        self.slots.get(id.index())?.attributes.get(name)
    }

    /// Value of `name` on the nearest ancestor of `id` that declares it.
    pub fn find_upstream(&self, id: NodeId, name: &str) -> ChainResult<&AttrValue> {
        let slot = self.slot(id)?;
        Upstream::new(&self.slots, slot.predecessor, slot.type_name()).find(name)
    }

    // ── Pulling ──

    /// Pull one node.
    pub fn pull(&mut self, id: NodeId) -> ChainResult<PullAction> {
        let idx = id.index();
        if idx >= self.slots.len() {
            return Err(ChainError::UnknownNode(id));
        }
        let timestamp = self.timestamp();
        let (ancestors, rest) = self.slots.split_at_mut(idx);
        let slot = &mut rest[0];
        slot.pull(ancestors, self.clock.as_ref(), timestamp, self.cycle)
    }

    /// Pull every node once, head to tail.
    ///
    /// Stops at the first failing node. Nodes after it are not pulled and
    /// their outputs are cleared, so nothing from a previous cycle lingers.
    pub fn run_cycle(&mut self) -> ChainResult<()> {
        let ids = (0..=u32::MAX).map(NodeId).take(self.slots.len());
        for (idx, id) in ids.enumerate() {
            if let Err(e) = self.pull(id) {
                for slot in &mut self.slots[idx + 1..] {
                    slot.output = None;
                }
                tracing::warn!(
                    "Cycle {} aborted at {} {:?}: {}",
                    self.cycle,
                    self.slots[idx].type_name(),
                    id,
                    e
                );
                self.cycle += 1;
                return Err(e);
            }
        }
        self.cycle += 1;
        Ok(())
    }

    fn timestamp(&mut self) -> Duration {
        let now = self.clock.now();
        let start = *self.start_time.get_or_insert(now);
        (now - start).to_std().unwrap_or(Duration::ZERO)
    }

    // ── Sources ──

    /// Whether a source is still producing. Non-source nodes are always alive.
    pub fn is_alive(&self, id: NodeId) -> ChainResult<bool> {
        Ok(self.slot(id)?.is_alive(self.clock.as_ref()))
    }

    /// True if at least one source has not expired.
    pub fn any_source_alive(&self) -> bool {
        self.slots
            .iter()
            .filter(|slot| slot.kind() == NodeKind::Source)
            .any(|slot| slot.is_alive(self.clock.as_ref()))
    }

    // ── Accessors ──

    pub fn slot(&self, id: NodeId) -> ChainResult<&NodeSlot> {
        self.slots.get(id.index()).ok_or(ChainError::UnknownNode(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> ChainResult<&mut NodeSlot> {
        self.slots
            .get_mut(id.index())
            .ok_or(ChainError::UnknownNode(id))
    }

    pub fn output(&self, id: NodeId) -> Option<&Chunk> {
        self.slots.get(id.index())?.output()
    }

    pub fn flags(&self, id: NodeId) -> Option<ChangeFlags> {
        self.slots.get(id.index()).map(NodeSlot::flags)
    }

    pub fn is_changed(&self, id: NodeId) -> bool {
        self.flags(id).is_some_and(|f| f.changed)
    }

    pub fn pending_initialize(&self, id: NodeId) -> bool {
        self.flags(id).is_some_and(|f| f.pending_initialize)
    }

    pub fn pending_reset(&self, id: NodeId) -> bool {
        self.flags(id).is_some_and(|f| f.pending_reset)
    }

    pub fn upstream_snapshot(&self, id: NodeId) -> Option<&BTreeMap<String, AttrValue>> {
        self.slots.get(id.index()).map(NodeSlot::upstream_snapshot)
    }

    pub fn stats(&self, id: NodeId) -> Option<&NodeStats> {
        self.slots.get(id.index()).map(NodeSlot::stats)
    }

    pub fn type_name(&self, id: NodeId) -> Option<&'static str> {
        self.slots.get(id.index()).map(NodeSlot::type_name)
    }

    pub fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(id.index())?.predecessor()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..=u32::MAX).take(self.slots.len()).map(NodeId)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Cycles completed by `run_cycle`.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Serializable view of every node, for diagnostics.
    pub fn snapshot(&self) -> ChainSnapshot {
        let nodes = self
            .ids()
            .zip(&self.slots)
            .map(|(id, slot)| NodeSnapshot {
                id,
                type_name: slot.type_name().to_string(),
                kind: slot.kind(),
                predecessor: slot.predecessor(),
                attributes: slot.attributes().to_map(),
                flags: slot.flags(),
                upstream_snapshot: slot.upstream_snapshot().clone(),
                has_output: slot.output().is_some(),
                alive: slot.is_alive(self.clock.as_ref()),
                stats: slot.stats().clone(),
            })
            .collect();
        ChainSnapshot {
            cycle: self.cycle,
            nodes,
        }
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("slots", &self.slots)
            .field("cycle", &self.cycle)
            .finish()
    }
}
