//! Declared node attributes and the observed write path.
//!
//! Every attribute a node exposes is declared up front with an initial value.
//! All writes go through [`Attributes::write`], which is where reset-trigger
//! membership is checked and the node's change flags are raised.

use crate::error::{ChainError, ChainResult};
use crate::pipeline::value::AttrValue;
use serde::Serialize;
use std::collections::BTreeMap;

/// Protocol flags of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangeFlags {
    /// One-shot message to the successor: this node or something upstream of
    /// it changed since the successor last looked.
    pub changed: bool,
    pub pending_initialize: bool,
    pub pending_reset: bool,
}

impl Default for ChangeFlags {
    fn default() -> Self {
        Self {
            changed: false,
            pending_initialize: true,
            pending_reset: false,
        }
    }
}

/// Attribute table of one node.
#[derive(Debug, Clone)]
pub struct Attributes {
    owner: &'static str,
    values: BTreeMap<&'static str, AttrValue>,
    reset_triggers: &'static [&'static str],
}

impl Attributes {
    pub fn new(
        owner: &'static str,
        declared: Vec<(&'static str, AttrValue)>,
        reset_triggers: &'static [&'static str],
    ) -> Self {
        Self {
            owner,
            values: declared.into_iter().collect(),
            reset_triggers,
        }
    }

    /// Type name of the owning node.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &AttrValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn reset_triggers(&self) -> &'static [&'static str] {
        self.reset_triggers
    }

    pub fn is_reset_trigger(&self, name: &str) -> bool {
        self.reset_triggers.contains(&name)
    }

    /// Resolve a write target and coerce the value to its representation.
    ///
    /// Fails with `UnknownAttribute` for undeclared names.
    pub fn prepare(&self, name: &str, value: AttrValue) -> ChainResult<AttrValue> {
        let current = self
            .values
            .get(name)
            .ok_or_else(|| ChainError::UnknownAttribute {
                node_type: self.owner.to_string(),
                attribute: name.to_string(),
            })?;
        Ok(value.coerced_like(current))
    }

    /// Commit a value.
    ///
    /// Writing a reset trigger schedules a reset and raises `changed`, even
    /// when the new value equals the old one.
    pub fn write(
        &mut self,
        flags: &mut ChangeFlags,
        name: &str,
        value: AttrValue,
    ) -> ChainResult<()> {
        let value = self.prepare(name, value)?;
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
        }
        if self.is_reset_trigger(name) {
            flags.pending_reset = true;
            flags.changed = true;
        }
        Ok(())
    }

    /// Owned copy of all values, for snapshots.
    pub fn to_map(&self) -> BTreeMap<String, AttrValue> {
        self.values
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}
